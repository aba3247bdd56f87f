//! Buffered Readers and Writers Over Pooled Storage
//!
//! [`PooledBufReader`] and [`PooledBufWriter`] behave like their `std::io`
//! namesakes, but their buffers are drawn from a [`BytePool`] and go back
//! to it when the wrapper is dropped or unwrapped.
//!
//! Requested sizes are rounded up to a power of two between 256 bytes and
//! 8 MiB, so wrappers of similar size share a size class.  Sizes outside
//! that range are used exactly; zero selects [`DEFAULT_BUFIO_SIZE`].

use std::fmt;
use std::io::{self, BufRead, Read, Write};

use crate::buffer::ByteBuffer;
use crate::error::{Error, Result};
use crate::pool::BytePool;
use crate::size_class::ceil_log2;

/// Smallest power of two used for buffered wrappers.
pub const MIN_BUFIO_SIZE_POWER: u32 = 8;
/// Largest power of two used for buffered wrappers.
pub const MAX_BUFIO_SIZE_POWER: u32 = 23;
/// Buffer size used when zero is requested.
pub const DEFAULT_BUFIO_SIZE: usize = 4096;

/// The buffer size a wrapper requested with `size` will use.
pub fn bufio_size(size: usize) -> usize {
    if size == 0 {
        return DEFAULT_BUFIO_SIZE;
    }
    let bit = ceil_log2(size);
    if (MIN_BUFIO_SIZE_POWER..=MAX_BUFIO_SIZE_POWER).contains(&bit) {
        1 << bit
    } else {
        size
    }
}

/// A buffered reader whose buffer lives in a [`BytePool`].
pub struct PooledBufReader<'p, R> {
    inner: R,
    buf: ByteBuffer<'p>,
    pos: usize,
    filled: usize,
}

impl<'p, R: Read> PooledBufReader<'p, R> {
    /// Wrap `inner` with a buffer of [`bufio_size(size)`](bufio_size) bytes from `pool`.
    pub fn new(pool: &'p BytePool, size: usize, inner: R) -> Self {
        let size = bufio_size(size);
        let mut buf = pool.acquire(size);
        buf.zeroed(size);
        Self {
            inner,
            buf,
            pos: 0,
            filled: 0,
        }
    }

    /// Size of the internal buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read from `inner` but not yet consumed.
    pub fn buffer(&self) -> &[u8] {
        &self.buf[self.pos..self.filled]
    }

    /// Reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutable reference to the wrapped reader.  Reading from it directly
    /// skips any buffered bytes.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the reader, returning the buffer to the pool.  Buffered but
    /// unconsumed bytes are lost.
    pub fn into_inner(self) -> R {
        let Self { inner, .. } = self;
        inner
    }
}

impl<R: Read> Read for PooledBufReader<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        // Large reads with nothing buffered bypass the buffer.
        if self.pos == self.filled && out.len() >= self.capacity() {
            return self.inner.read(out);
        }
        let mut available = self.fill_buf()?;
        let n = available.read(out)?;
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for PooledBufReader<'_, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.filled {
            let space = self.buf.len();
            let n = self.inner.read(self.buf.as_mut_slice())?;
            assert!(
                n <= space,
                "bpool: reader returned count {n} larger than buffer of {space}"
            );
            self.pos = 0;
            self.filled = n;
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.filled);
    }
}

/// A buffered writer whose buffer lives in a [`BytePool`].
///
/// Each flush hands the buffered bytes to the wrapped writer in one
/// `write` call; a writer that accepts only part of them yields a short
/// write error and keeps the remainder buffered.  Dropping the wrapper
/// flushes on a best-effort basis and ignores errors.
pub struct PooledBufWriter<'p, W: Write> {
    inner: Option<W>,
    buf: ByteBuffer<'p>,
    size: usize,
}

impl<'p, W: Write> PooledBufWriter<'p, W> {
    /// Wrap `inner` with a buffer of [`bufio_size(size)`](bufio_size) bytes from `pool`.
    pub fn new(pool: &'p BytePool, size: usize, inner: W) -> Self {
        let size = bufio_size(size);
        Self {
            inner: Some(inner),
            buf: pool.acquire(size),
            size,
        }
    }

    /// Size of the internal buffer.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Bytes written but not yet flushed.
    pub fn buffer(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Free space left in the buffer.
    pub fn available(&self) -> usize {
        self.size - self.buf.len()
    }

    fn flush_buf(&mut self) -> Result<()> {
        let len = self.buf.len();
        if len == 0 {
            return Ok(());
        }
        let Some(inner) = self.inner.as_mut() else {
            return Ok(());
        };
        let accepted = loop {
            match inner.write(self.buf.as_slice()) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => break result?,
            }
        };
        if accepted > len {
            return Err(Error::InvalidWrite);
        }
        if accepted < len {
            self.buf.as_mut_slice().copy_within(accepted.., 0);
            self.buf.truncate(len - accepted);
            return Err(Error::ShortWrite {
                written: accepted as u64,
            });
        }
        self.buf.reset();
        Ok(())
    }

    /// Flush buffered bytes and unwrap the writer, returning the buffer to the pool.
    ///
    /// If the flush fails the wrapper comes back inside the error, with the
    /// unflushed bytes still buffered.
    pub fn into_inner(mut self) -> std::result::Result<W, IntoInnerError<'p, W>> {
        if let Err(error) = self.flush_buf() {
            return Err(IntoInnerError {
                writer: self,
                error,
            });
        }
        match self.inner.take() {
            Some(inner) => Ok(inner),
            None => Err(IntoInnerError {
                writer: self,
                error: Error::Io(io::Error::new(io::ErrorKind::Other, "writer already taken")),
            }),
        }
    }
}

impl<W: Write> Write for PooledBufWriter<'_, W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.buf.len() + data.len() > self.size {
            self.flush_buf()?;
        }
        if data.len() >= self.size {
            return match self.inner.as_mut() {
                Some(inner) => inner.write(data),
                None => Ok(0),
            };
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buf()?;
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for PooledBufWriter<'_, W> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let _ = self.flush_buf();
        }
    }
}

/// A failed [`PooledBufWriter::into_inner`]: the flush error and the
/// still-intact writer.
pub struct IntoInnerError<'p, W: Write> {
    writer: PooledBufWriter<'p, W>,
    error: Error,
}

impl<'p, W: Write> IntoInnerError<'p, W> {
    /// The error that stopped the flush.
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Recover the writer, with its unflushed bytes still buffered.
    pub fn into_writer(self) -> PooledBufWriter<'p, W> {
        self.writer
    }

    /// Split into the error and the writer.
    pub fn into_parts(self) -> (Error, PooledBufWriter<'p, W>) {
        (self.error, self.writer)
    }
}

impl<W: Write> From<IntoInnerError<'_, W>> for Error {
    fn from(err: IntoInnerError<'_, W>) -> Self {
        err.error
    }
}

impl<W: Write> fmt::Debug for IntoInnerError<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoInnerError")
            .field("error", &self.error)
            .field("buffered", &self.writer.buffer().len())
            .finish()
    }
}

impl<W: Write> fmt::Display for IntoInnerError<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<W: Write> std::error::Error for IntoInnerError<'_, W> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl BytePool {
    /// A [`PooledBufReader`] over `inner` with its buffer from this pool.
    pub fn buf_reader<R: Read>(&self, size: usize, inner: R) -> PooledBufReader<'_, R> {
        PooledBufReader::new(self, size, inner)
    }

    /// A [`PooledBufWriter`] over `inner` with its buffer from this pool.
    pub fn buf_writer<W: Write>(&self, size: usize, inner: W) -> PooledBufWriter<'_, W> {
        PooledBufWriter::new(self, size, inner)
    }
}
