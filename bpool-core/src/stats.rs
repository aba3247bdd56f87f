//! Pool Statistics
//!
//! Lock-free counters describing how a [`BytePool`](crate::BytePool) is
//! being used, so operators can tell whether retention limits are sized
//! sensibly for the workload.
//!
//! # Design Goals:
//! - One relaxed atomic increment per recorded event
//! - Snapshots never block acquire or release

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a pool.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    unpooled: AtomicU64,
    retained: AtomicU64,
    discarded: AtomicU64,
    shed: AtomicU64,
}

impl PoolMetrics {
    /// Create a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// An acquire was served from a retained buffer.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// An acquire had to allocate a fresh canonical-capacity buffer.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// An acquire exceeded the poolable range and was allocated exactly.
    #[inline]
    pub fn record_unpooled(&self) {
        self.unpooled.fetch_add(1, Ordering::Relaxed);
    }

    /// A released buffer was kept for reuse.
    #[inline]
    pub fn record_retained(&self) {
        self.retained.fetch_add(1, Ordering::Relaxed);
    }

    /// A released buffer was dropped instead of kept.
    #[inline]
    pub fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// `count` retained buffers were dropped by a shed.
    pub fn record_shed(&self, count: usize) {
        self.shed.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            unpooled: self.unpooled.load(Ordering::Relaxed),
            retained: self.retained.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            shed: self.shed.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.unpooled,
            &self.retained,
            &self.discarded,
            &self.shed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Acquires served from a retained buffer.
    pub hits: u64,
    /// Acquires that allocated a fresh pooled-class buffer.
    pub misses: u64,
    /// Acquires above the poolable range.
    pub unpooled: u64,
    /// Releases that kept the buffer.
    pub retained: u64,
    /// Releases that dropped the buffer.
    pub discarded: u64,
    /// Retained buffers dropped by [`BytePool::shed`](crate::BytePool::shed).
    pub shed: u64,
}

impl PoolStats {
    /// Percentage of pooled-range acquires served by reuse.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        (self.hits as f64) / (total as f64) * 100.0
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} (hit rate {:.1}%) unpooled={} retained={} discarded={} shed={}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.unpooled,
            self.retained,
            self.discarded,
            self.shed
        )
    }
}
