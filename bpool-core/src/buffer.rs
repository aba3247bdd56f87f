//! Managed Pooled Buffers
//!
//! [`ByteBuffer`] is a growable byte container whose storage always comes
//! from, and goes back to, a [`BytePool`].  When an append outgrows the
//! current storage the buffer acquires a larger one from the pool, copies,
//! and releases the old storage, so the pool sees every capacity change.
//!
//! # Ownership
//! A `ByteBuffer<'p>` borrows its pool for `'p` and owns its storage
//! exclusively.  Releasing consumes the handle, and dropping releases, so a
//! buffer cannot be used after its storage has been returned.  Views such as
//! [`as_str`](ByteBuffer::as_str) borrow the buffer and are invalidated by
//! the borrow checker before any mutation or release.

use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::ops::Deref;
use std::{fmt, mem, str};

use tracing::trace;

use crate::error::{Error, Result};
use crate::pool::BytePool;

/// Minimum free space offered to each `read` call by [`ByteBuffer::read_from`].
pub const MIN_READ: usize = 512;

/// `len + additional`, panicking like `Vec::reserve` on overflow.
#[inline]
fn required_capacity(len: usize, additional: usize) -> usize {
    match len.checked_add(additional) {
        Some(size) => size,
        None => panic!("capacity overflow"),
    }
}

/// A growable byte buffer backed by pooled storage.
pub struct ByteBuffer<'p> {
    buf: Vec<u8>,
    pool: &'p BytePool,
}

impl<'p> ByteBuffer<'p> {
    /// Wrap `buf` as a managed buffer that will be released into `pool`.
    ///
    /// `buf` need not have come from `pool`; on release it is re-classified
    /// by its capacity like any other buffer.
    pub fn from_vec(pool: &'p BytePool, buf: Vec<u8>) -> Self {
        Self { buf, pool }
    }

    /// The pool this buffer releases into.
    pub fn pool(&self) -> &'p BytePool {
        self.pool
    }

    /// Number of bytes in use.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` when no bytes are in use.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes of storage available, used or not.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Bytes that can be appended without reallocating.
    #[inline]
    pub fn available(&self) -> usize {
        self.buf.capacity() - self.buf.len()
    }

    /// The bytes in use.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// The bytes in use, mutably.  Length cannot be changed through this view.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Borrow the contents as text without copying.
    ///
    /// The view lives only as long as the shared borrow of `self`, so the
    /// buffer cannot be written to or released while it is held.
    pub fn as_str(&self) -> std::result::Result<&str, str::Utf8Error> {
        str::from_utf8(&self.buf)
    }

    /// The contents as text, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }

    /// Drop the contents, keeping the storage.
    #[inline]
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Shorten the contents to `len` bytes; no-op if already shorter.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Replace the storage with `new`, returning the previous storage.
    ///
    /// The returned `Vec` is no longer managed; hand it to
    /// [`BytePool::put`] to recycle it.
    pub fn swap(&mut self, new: Vec<u8>) -> Vec<u8> {
        mem::replace(&mut self.buf, new)
    }

    /// Ensure at least `n` more bytes can be appended without reallocating.
    ///
    /// Does nothing when `available() >= n` already holds.
    ///
    /// # Panics
    /// If the required capacity overflows `usize`.
    pub fn grow(&mut self, n: usize) {
        if self.available() >= n {
            return;
        }
        self.reallocate(required_capacity(self.buf.len(), n));
    }

    /// Move the contents into pooled storage of at least `size` bytes and
    /// release the old storage.
    fn reallocate(&mut self, size: usize) {
        let mut next = self.pool.get(size);
        trace!(from = self.buf.capacity(), to = next.capacity(), "Growing ByteBuffer");
        next.extend_from_slice(&self.buf);
        let old = mem::replace(&mut self.buf, next);
        self.pool.put(old);
    }

    /// Reallocate with 50% headroom over the incoming `additional` bytes.
    #[cold]
    fn grow_for_append(&mut self, additional: usize) {
        let headroom = additional.saturating_add(additional / 2);
        self.reallocate(required_capacity(self.buf.len(), headroom));
    }

    /// Append `data`.
    #[inline]
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        if self.available() < data.len() {
            self.grow_for_append(data.len());
        }
        self.buf.extend_from_slice(data);
    }

    /// Append the UTF-8 bytes of `s`.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.extend_from_slice(s.as_bytes());
    }

    /// Append a single byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.grow(1);
        self.buf.push(byte);
    }

    /// Append the UTF-8 encoding of `ch`, returning the number of bytes written.
    pub fn push_char(&mut self, ch: char) -> usize {
        if ch.is_ascii() {
            self.push(ch as u8);
            return 1;
        }
        let mut utf8 = [0u8; 4];
        let encoded = ch.encode_utf8(&mut utf8);
        self.grow(encoded.len());
        self.buf.extend_from_slice(encoded.as_bytes());
        encoded.len()
    }

    /// Replace the contents with `data`.
    pub fn set(&mut self, data: &[u8]) {
        self.buf.clear();
        self.extend_from_slice(data);
    }

    /// Replace the contents with `s`.
    pub fn set_str(&mut self, s: &str) {
        self.set(s.as_bytes());
    }

    /// Resize the contents to exactly `len` zeroed bytes, growing through the pool.
    ///
    /// Used for scratch space that is handed to readers.
    pub(crate) fn zeroed(&mut self, len: usize) -> &mut [u8] {
        self.buf.clear();
        self.grow(len);
        self.buf.resize(len, 0);
        &mut self.buf
    }

    /// Append everything `reader` yields until end-of-input.
    ///
    /// Each `read` call is offered at least [`MIN_READ`] bytes of space,
    /// growing through the pool as needed.  Returns the number of bytes
    /// appended.  On a read error the bytes appended so far are kept and the
    /// error is returned.
    ///
    /// # Panics
    /// If `reader` reports reading more bytes than the slice it was given.
    pub fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<u64> {
        let start = self.buf.len();
        let mut filled = start;
        // `filled..len` is already-initialized spare space kept between reads,
        // so each allocation is zero-filled at most once.
        let outcome = loop {
            if self.buf.capacity() - filled < MIN_READ {
                self.buf.truncate(filled);
                self.grow(MIN_READ);
            }
            if self.buf.len() < self.buf.capacity() {
                self.buf.resize(self.buf.capacity(), 0);
            }
            let space = self.buf.len() - filled;
            match reader.read(&mut self.buf[filled..]) {
                Ok(0) => break Ok(()),
                Ok(n) if n > space => {
                    self.buf.truncate(filled);
                    panic!("bpool: reader returned count {n} larger than buffer of {space}");
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(Error::Io(e)),
            }
        };
        self.buf.truncate(filled);
        outcome.map(|()| (filled - start) as u64)
    }

    /// Write the contents to `writer` in a single `write` call.
    ///
    /// Returns the number of bytes written.  A writer that accepts fewer
    /// bytes than offered without an error yields [`Error::ShortWrite`].
    ///
    /// # Panics
    /// If `writer` reports writing more bytes than it was given.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64> {
        let len = self.buf.len();
        if len == 0 {
            return Ok(0);
        }
        let written = loop {
            match writer.write(&self.buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => break result?,
            }
        };
        if written > len {
            panic!("bpool: writer returned count {written} larger than buffer of {len}");
        }
        if written < len {
            return Err(Error::ShortWrite {
                written: written as u64,
            });
        }
        Ok(len as u64)
    }

    /// Return the storage to the pool.
    pub fn release(self) {
        drop(self);
    }

    /// Detach the storage; it will not be returned to the pool.
    pub fn into_vec(mut self) -> Vec<u8> {
        mem::take(&mut self.buf)
    }
}

impl Drop for ByteBuffer<'_> {
    fn drop(&mut self) {
        self.pool.put(mem::take(&mut self.buf));
    }
}

impl Deref for ByteBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl AsRef<[u8]> for ByteBuffer<'_> {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl fmt::Debug for ByteBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl Write for ByteBuffer<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(data);
        Ok(data.len())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for ByteBuffer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.push_char(c);
        Ok(())
    }
}
