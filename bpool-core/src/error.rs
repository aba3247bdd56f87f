//! Error types for buffer I/O and pool configuration.
//!
//! Pool bookkeeping itself never fails: an acquire that cannot reuse a
//! buffer allocates, and a release that cannot retain one drops it.  The
//! errors here come from the collaborators a buffer talks to (readers,
//! sinks) and from loading a [`PoolConfig`](crate::PoolConfig).

use std::io;

/// Errors surfaced by buffer transfers and configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The sink accepted fewer bytes than it was given without reporting an error.
    #[error("short write: sink stopped after {written} bytes")]
    ShortWrite {
        /// Total bytes the sink accepted before stopping.
        written: u64,
    },

    /// The sink reported consuming more bytes than it was given.
    #[error("invalid write result")]
    InvalidWrite,

    /// An error reported by the underlying reader or writer.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A reader or writer failed partway through a stream copy.
    #[error("copy failed after {written} bytes: {source}")]
    Transfer {
        /// Bytes written to the sink before the failure.
        written: u64,
        /// The reader or writer error, unchanged.
        #[source]
        source: io::Error,
    },

    /// The configuration document could not be parsed.
    #[error("malformed pool config: {0}")]
    Config(#[from] serde_json::Error),

    /// The configuration parsed but describes an unusable pool.
    #[error("invalid pool config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns `true` for a short write, the one recoverable sink failure.
    pub fn is_short_write(&self) -> bool {
        matches!(self, Self::ShortWrite { .. })
    }

    /// Bytes the sink accepted before the failure, when known.
    pub fn written(&self) -> Option<u64> {
        match self {
            Self::ShortWrite { written } | Self::Transfer { written, .. } => Some(*written),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) | Error::Transfer { source: e, .. } => e,
            Error::ShortWrite { .. } => io::Error::new(io::ErrorKind::WriteZero, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Result alias for buffer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_write_maps_to_write_zero() {
        let err: io::Error = Error::ShortWrite { written: 3 }.into();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert!(err.to_string().contains("3 bytes"));
    }

    #[test]
    fn test_io_error_round_trips() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_transfer_keeps_source_and_count() {
        let err = Error::Transfer {
            written: 4096,
            source: io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        };
        assert_eq!(err.written(), Some(4096));
        assert!(err.to_string().contains("4096"));
        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(Error::InvalidWrite.written(), None);
    }

    #[test]
    fn test_is_short_write() {
        assert!(Error::ShortWrite { written: 0 }.is_short_write());
        assert!(!Error::InvalidWrite.is_short_write());
    }
}
