//! Bpool Core - Size-Classed Byte Buffer Pooling
//!
//! This crate hands out byte buffers from a fixed set of capacity classes
//! instead of allocating fresh memory for every request, cutting allocator
//! pressure on hot I/O, serialization and string-building paths.
//!
//! # Performance-First Design Patterns:
//! - O(1) size classification through compile-time lookup tables
//! - Per-class LIFO retained sets that never block acquire or release
//! - Managed buffers that grow through the pool, so every capacity stays classable
//! - Ownership-enforced release: a buffer cannot be touched after it goes back
//!
//! # Example
//! ```rust
//! use bpool_core::BytePool;
//!
//! let pool = BytePool::new();
//! let mut buf = pool.acquire(64);
//! buf.push_str("hello, ");
//! buf.push_str("pool");
//! assert_eq!(buf.as_str().unwrap(), "hello, pool");
//! ```

pub mod bufio;
pub mod buffer;
pub mod config;
pub mod error;
pub mod pool;
pub mod size_class;
pub mod stats;
pub mod stream;

pub use bufio::{IntoInnerError, PooledBufReader, PooledBufWriter};
pub use buffer::{ByteBuffer, MIN_READ};
pub use config::{PoolConfig, PrewarmSpec};
pub use error::{Error, Result};
pub use pool::BytePool;
pub use size_class::{SizeClass, MAX_POOLABLE_SIZE};
pub use stats::PoolStats;
pub use stream::{copy_async, copy_with, BLOCK_1K, BLOCK_2K, BLOCK_4K, BLOCK_8K};

use std::io::{Read, Write};
use std::sync::OnceLock;

use tracing::info;
use tracing_subscriber::EnvFilter;

static DEFAULT_POOL: OnceLock<BytePool> = OnceLock::new();

/// The process-wide pool, created on first use with default configuration.
pub fn default_pool() -> &'static BytePool {
    DEFAULT_POOL.get_or_init(BytePool::new)
}

/// Acquire a managed buffer of at least `size` bytes from the default pool.
pub fn get(size: usize) -> ByteBuffer<'static> {
    default_pool().acquire(size)
}

/// Return raw storage to the default pool.
pub fn put(buf: Vec<u8>) {
    default_pool().put(buf)
}

/// Copy `src` into `dst` using scratch space from the default pool.
pub fn copy<W, R>(dst: &mut W, src: &mut R) -> Result<u64>
where
    W: Write + ?Sized,
    R: Read + ?Sized,
{
    copy_with(default_pool(), dst, src)
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        info!("Initialized bpool-core v{}", env!("CARGO_PKG_VERSION"));
    }
}
