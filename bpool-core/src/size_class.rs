//! Size Classes - Constant-Time Request Classification
//!
//! Every pooled buffer belongs to exactly one size class, identified by a
//! small index into [`CLASS_CAPACITIES`].  A request for `n` bytes is served
//! by the smallest class whose canonical capacity is at least `n`.
//!
//! # Lookup Regimes:
//! - Small (`n <= 1016`): one table slot per 8 bytes
//! - Medium (`1016 < n <= 32 KiB`): one table slot per 128 bytes above 1 KiB
//! - Large (`32 KiB < n <= 8 MiB`): one slot per power of two
//!
//! The slot tables are generated by `const fn` evaluation, so classification
//! is a single arithmetic transform plus one array load.

use std::fmt;

/// Power of two of the largest poolable capacity.
pub const MAX_POOLABLE_SIZE_POWER: u32 = 23;

/// Power of two where the linear regimes end and the power-of-two regime begins.
pub const MAX_SMALL_SIZE_POWER: u32 = 15;

/// Largest capacity served by a pool; larger requests bypass pooling.
pub const MAX_POOLABLE_SIZE: usize = 1 << MAX_POOLABLE_SIZE_POWER;

/// Largest capacity in the linear (small and medium) regimes.
pub const MAX_SMALL_SIZE: usize = 1 << MAX_SMALL_SIZE_POWER;

/// Buffers with less capacity than this are never retained.
pub const MIN_POOLABLE_SIZE: usize = 32;

const SMALL_SIZE_DIV: usize = 8;
const SMALL_SIZE_MAX: usize = 1024;
const LARGE_SIZE_DIV: usize = 128;

/// Number of size classes, including the zero-capacity class 0.
pub const NUM_SIZE_CLASSES: usize = 52;

/// Canonical capacity of every size class, strictly increasing.
pub const CLASS_CAPACITIES: [u32; NUM_SIZE_CLASSES] = [
    0, 32, 64, 96, 128, 160, 224, 256, 320, 384, 448, 512, 640, 768, 1024, 1280, 1536, 1792, 2048,
    2304, 2688, 3072, 3456, 4096, 4864, 5376, 6144, 6784, 8192, 9472, 10240, 10880, 12288, 13568,
    14336, 16384, 18432, 19072, 20480, 21760, 24576, 27264, 28672, 32768,
    1 << 16, 1 << 17, 1 << 18, 1 << 19, 1 << 20, 1 << 21, 1 << 22, 1 << 23,
];

const SMALL_TABLE_LEN: usize = (SMALL_SIZE_MAX - SMALL_SIZE_DIV) / SMALL_SIZE_DIV + 1;
const MEDIUM_TABLE_LEN: usize = (MAX_SMALL_SIZE - SMALL_SIZE_MAX) / LARGE_SIZE_DIV + 1;
const LARGE_TABLE_LEN: usize = (MAX_POOLABLE_SIZE_POWER - MAX_SMALL_SIZE_POWER) as usize;

static SIZE_TO_CLASS_8: [u8; SMALL_TABLE_LEN] = build_small_table();
static SIZE_TO_CLASS_128: [u8; MEDIUM_TABLE_LEN] = build_medium_table();
static SIZE_TO_CLASS_LARGE: [u8; LARGE_TABLE_LEN] = build_large_table();

/// First class whose capacity covers `size`, by linear scan.
///
/// Only used while building the tables; every slot is filled from the
/// largest size that maps to it.
const fn first_class_covering(size: usize) -> u8 {
    let mut class = 0;
    while class < NUM_SIZE_CLASSES {
        if CLASS_CAPACITIES[class] as usize >= size {
            return class as u8;
        }
        class += 1;
    }
    (NUM_SIZE_CLASSES - 1) as u8
}

const fn build_small_table() -> [u8; SMALL_TABLE_LEN] {
    let mut table = [0u8; SMALL_TABLE_LEN];
    let mut slot = 0;
    while slot < SMALL_TABLE_LEN {
        table[slot] = first_class_covering(slot * SMALL_SIZE_DIV);
        slot += 1;
    }
    table
}

const fn build_medium_table() -> [u8; MEDIUM_TABLE_LEN] {
    let mut table = [0u8; MEDIUM_TABLE_LEN];
    let mut slot = 0;
    while slot < MEDIUM_TABLE_LEN {
        table[slot] = first_class_covering(SMALL_SIZE_MAX + slot * LARGE_SIZE_DIV);
        slot += 1;
    }
    table
}

const fn build_large_table() -> [u8; LARGE_TABLE_LEN] {
    let mut table = [0u8; LARGE_TABLE_LEN];
    let mut slot = 0;
    while slot < LARGE_TABLE_LEN {
        table[slot] = first_class_covering(1 << (MAX_SMALL_SIZE_POWER as usize + 1 + slot));
        slot += 1;
    }
    table
}

/// Returns `ceil(n / d)`.
#[inline]
const fn div_round_up(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

/// Bit length of `x`, minus one when `x` is an exact power of two.
///
/// For `x >= 1` this is `ceil(log2(x))`; `ceil_log2(0)` is 0.
#[inline]
pub const fn ceil_log2(x: usize) -> u32 {
    if x <= 1 {
        return 0;
    }
    usize::BITS - (x - 1).leading_zeros()
}

/// Index of the class serving `size`.  Caller guarantees `size <= MAX_POOLABLE_SIZE`.
#[inline]
fn class_index(size: usize) -> usize {
    let class = if size <= SMALL_SIZE_MAX - SMALL_SIZE_DIV {
        SIZE_TO_CLASS_8[div_round_up(size, SMALL_SIZE_DIV)]
    } else if size <= MAX_SMALL_SIZE {
        SIZE_TO_CLASS_128[div_round_up(size.saturating_sub(SMALL_SIZE_MAX), LARGE_SIZE_DIV)]
    } else {
        SIZE_TO_CLASS_LARGE[(ceil_log2(size) - MAX_SMALL_SIZE_POWER - 1) as usize]
    };
    class as usize
}

/// A size class: one bucket of fixed canonical capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeClass(u8);

impl SizeClass {
    /// The smallest class whose capacity is at least `size`.
    ///
    /// Returns `None` when `size` exceeds [`MAX_POOLABLE_SIZE`].
    #[inline]
    pub fn of(size: usize) -> Option<Self> {
        if size > MAX_POOLABLE_SIZE {
            return None;
        }
        Some(Self(class_index(size) as u8))
    }

    /// The class at `index`, if it exists.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < NUM_SIZE_CLASSES).then_some(Self(index as u8))
    }

    /// Position of this class in [`CLASS_CAPACITIES`].
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Canonical capacity of this class.
    #[inline]
    pub fn capacity(self) -> usize {
        CLASS_CAPACITIES[self.index()] as usize
    }

    /// The next smaller class, or `None` for class 0.
    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    /// Iterate over every class in increasing capacity order.
    pub fn all() -> impl Iterator<Item = SizeClass> {
        (0..NUM_SIZE_CLASSES).map(|i| Self(i as u8))
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {} ({} bytes)", self.0, self.capacity())
    }
}
