//! Stream Copy Through Pooled Scratch Space
//!
//! [`copy_with`] moves everything from a reader to a writer through a
//! single 4 KiB buffer borrowed from a [`BytePool`].  The scratch buffer is
//! an owned [`ByteBuffer`](crate::ByteBuffer), so it goes back to the pool on
//! every exit path, including errors and unwinding.

use std::io::{self, Read, Write};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::pool::BytePool;

/// 1 KiB block.
pub const BLOCK_1K: usize = 1 << 10;
/// 2 KiB block.
pub const BLOCK_2K: usize = 1 << 11;
/// 4 KiB block; the scratch size used by the copy helpers.
pub const BLOCK_4K: usize = 1 << 12;
/// 8 KiB block.
pub const BLOCK_8K: usize = 1 << 13;

/// Account for one write of `offered` bytes that reported `accepted`.
fn settle_write(written: &mut u64, offered: usize, accepted: usize) -> Result<()> {
    if accepted > offered {
        return Err(Error::InvalidWrite);
    }
    *written += accepted as u64;
    if accepted < offered {
        return Err(Error::ShortWrite { written: *written });
    }
    Ok(())
}

/// Copy `src` into `dst` until end-of-input, using scratch space from `pool`.
///
/// Returns the number of bytes written.  Reader and writer errors come back
/// as [`Error::Transfer`], carrying the original error and the bytes written
/// before it; a writer that accepts fewer bytes than offered yields
/// [`Error::ShortWrite`], and one that claims more yields
/// [`Error::InvalidWrite`].
pub fn copy_with<W, R>(pool: &BytePool, dst: &mut W, src: &mut R) -> Result<u64>
where
    W: Write + ?Sized,
    R: Read + ?Sized,
{
    let mut scratch = pool.acquire(BLOCK_4K);
    let buf = scratch.zeroed(BLOCK_4K);
    let mut written = 0u64;
    loop {
        let nr = match src.read(buf) {
            Ok(0) => return Ok(written),
            Ok(n) => {
                assert!(
                    n <= buf.len(),
                    "bpool: reader returned count {n} larger than buffer of {}",
                    buf.len()
                );
                n
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(Error::Transfer { written, source }),
        };
        let nw = loop {
            match dst.write(&buf[..nr]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(Error::Transfer { written, source }),
            }
        };
        settle_write(&mut written, nr, nw)?;
    }
}

/// Async counterpart of [`copy_with`] for tokio readers and writers.
pub async fn copy_async<W, R>(pool: &BytePool, dst: &mut W, src: &mut R) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncRead + Unpin + ?Sized,
{
    let mut scratch = pool.acquire(BLOCK_4K);
    let buf = scratch.zeroed(BLOCK_4K);
    let mut written = 0u64;
    loop {
        let nr = match src.read(buf).await {
            Ok(0) => return Ok(written),
            Ok(n) => {
                assert!(
                    n <= buf.len(),
                    "bpool: reader returned count {n} larger than buffer of {}",
                    buf.len()
                );
                n
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(Error::Transfer { written, source }),
        };
        let nw = loop {
            match dst.write(&buf[..nr]).await {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(Error::Transfer { written, source }),
            }
        };
        settle_write(&mut written, nr, nw)?;
    }
}
