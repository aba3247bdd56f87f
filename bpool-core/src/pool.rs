//! Size-Classed Buffer Pool
//!
//! A [`BytePool`] keeps one retained set of byte vectors per size class.
//! Requests are rounded up to a canonical class capacity, so a buffer
//! released by one part of the program can be handed to any later request
//! that maps to the same class.
//!
//! # Performance-First Design:
//! - O(1) classification via [`SizeClass::of`]
//! - Per-class LIFO stacks, so recently released (cache-warm) buffers go out first
//! - Locks are only ever *tried*: contention falls back to allocating on
//!   acquire and to dropping on release, so no caller ever waits
//!
//! # Retention
//! Releases re-classify a buffer by its *current* capacity, which may differ
//! from what was acquired after growth or when the caller supplies its own
//! `Vec`.  A buffer is only kept when its capacity covers everything its
//! class promises to hand out.  Retention is best-effort: a full class, a
//! contended lock, or [`shed`](BytePool::shed) all drop buffers, and no
//! caller may rely on getting a released buffer back.

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::buffer::ByteBuffer;
use crate::config::PoolConfig;
use crate::size_class::{SizeClass, MAX_POOLABLE_SIZE, MAX_SMALL_SIZE, MIN_POOLABLE_SIZE, NUM_SIZE_CLASSES};
use crate::stats::{PoolMetrics, PoolStats};

/// Retained buffers for one size class.
struct ClassSlot {
    free: Mutex<Vec<Vec<u8>>>,
}

/// A pool of reusable byte buffers, bucketed by size class.
///
/// # Example
/// ```rust
/// # use bpool_core::BytePool;
/// let pool = BytePool::new();
/// let mut buf = pool.acquire(100);
/// assert!(buf.capacity() >= 100);
/// buf.push_str("hello");
/// buf.release(); // storage goes back to `pool`
/// ```
pub struct BytePool {
    classes: Box<[ClassSlot]>,
    max_retained_per_class: usize,
    metrics: PoolMetrics,
}

impl BytePool {
    /// Create an empty pool with default configuration.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool from `config`, allocating any requested prewarm buffers.
    pub fn with_config(config: PoolConfig) -> Self {
        info!(
            max_retained_per_class = config.max_retained_per_class,
            prewarm_entries = config.prewarm.len(),
            "Creating BytePool"
        );
        let classes = (0..NUM_SIZE_CLASSES)
            .map(|_| ClassSlot {
                free: Mutex::new(Vec::new()),
            })
            .collect();
        let pool = Self {
            classes,
            max_retained_per_class: config.max_retained_per_class,
            metrics: PoolMetrics::new(),
        };
        for spec in &config.prewarm {
            pool.prewarm(spec.size, spec.count);
        }
        pool
    }

    /// Fill the class serving `size` with up to `count` fresh buffers.
    ///
    /// Sizes outside the poolable range are ignored.  Returns the number of
    /// buffers actually added.
    pub fn prewarm(&self, size: usize, count: usize) -> usize {
        let class = match SizeClass::of(size) {
            Some(class) if class.capacity() > 0 => class,
            _ => return 0,
        };
        let mut free = self.classes[class.index()].free.lock();
        let room = self.max_retained_per_class.saturating_sub(free.len());
        let added = count.min(room);
        free.extend((0..added).map(|_| Vec::with_capacity(class.capacity())));
        debug!(%class, added, "Prewarmed size class");
        added
    }

    /// Obtain an empty `Vec` with capacity of at least `size`.
    ///
    /// - `size == 0` returns a zero-capacity vector without touching the pool.
    /// - `size > MAX_POOLABLE_SIZE` returns an exactly sized, unpooled vector.
    /// - Otherwise a retained buffer of the serving class is reused, or a
    ///   fresh one is allocated at the class's canonical capacity.
    pub fn get(&self, size: usize) -> Vec<u8> {
        if size == 0 {
            return Vec::new();
        }
        let Some(class) = SizeClass::of(size) else {
            trace!(size, "Request above poolable range, allocating exact size");
            self.metrics.record_unpooled();
            return Vec::with_capacity(size);
        };
        let reused = self.classes[class.index()]
            .free
            .try_lock()
            .and_then(|mut free| free.pop());
        match reused {
            Some(mut buf) => {
                buf.clear();
                self.metrics.record_hit();
                buf
            }
            None => {
                self.metrics.record_miss();
                Vec::with_capacity(class.capacity())
            }
        }
    }

    /// Return a `Vec` to the pool.
    ///
    /// The vector is re-classified by its current capacity.  It is dropped
    /// when that capacity is outside the poolable range, when it falls short
    /// of its class above [`MAX_SMALL_SIZE`], or when the class is full.
    pub fn put(&self, mut buf: Vec<u8>) {
        let cap = buf.capacity();
        if cap == 0 {
            return;
        }
        let Some(class) = self.retention_class(cap) else {
            trace!(capacity = cap, "Discarding buffer outside poolable classes");
            self.metrics.record_discard();
            return;
        };
        buf.clear();
        let retained = match self.classes[class.index()].free.try_lock() {
            Some(mut free) if free.len() < self.max_retained_per_class => {
                free.push(buf);
                true
            }
            _ => false,
        };
        if retained {
            self.metrics.record_retained();
        } else {
            trace!(%class, "Size class full or contended, dropping buffer");
            self.metrics.record_discard();
        }
    }

    /// The class a buffer of capacity `cap` may be retained in.
    ///
    /// A capacity below its class's canonical size steps down one class in
    /// the linear regimes; above them the buffer is not retained.
    fn retention_class(&self, cap: usize) -> Option<SizeClass> {
        if !(MIN_POOLABLE_SIZE..=MAX_POOLABLE_SIZE).contains(&cap) {
            return None;
        }
        let class = SizeClass::of(cap)?;
        if cap >= class.capacity() {
            return Some(class);
        }
        if cap <= MAX_SMALL_SIZE {
            class.prev()
        } else {
            None
        }
    }

    /// Acquire a managed buffer with capacity of at least `size`.
    pub fn acquire(&self, size: usize) -> ByteBuffer<'_> {
        ByteBuffer::from_vec(self, self.get(size))
    }

    /// Return a managed buffer's storage to its pool.
    ///
    /// Equivalent to dropping it; provided so release points read explicitly.
    pub fn release(&self, buf: ByteBuffer<'_>) {
        drop(buf);
    }

    /// Drop every retained buffer.  Returns how many were dropped.
    pub fn shed(&self) -> usize {
        let mut dropped = 0;
        for slot in self.classes.iter() {
            let mut free = slot.free.lock();
            dropped += free.len();
            free.clear();
            free.shrink_to_fit();
        }
        self.metrics.record_shed(dropped);
        debug!(dropped, "Shed retained buffers");
        dropped
    }

    /// Number of buffers currently retained across all classes.
    pub fn retained(&self) -> usize {
        self.classes.iter().map(|slot| slot.free.lock().len()).sum()
    }

    /// Number of buffers currently retained in `class`.
    pub fn retained_in(&self, class: SizeClass) -> usize {
        self.classes[class.index()].free.lock().len()
    }

    /// Snapshot the pool's counters.
    pub fn stats(&self) -> PoolStats {
        self.metrics.snapshot()
    }

    /// Zero the pool's counters.
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }
}

impl Default for BytePool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BytePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BytePool")
            .field("max_retained_per_class", &self.max_retained_per_class)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
