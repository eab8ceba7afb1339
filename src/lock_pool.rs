//! A fixed-size pool of reader/writer locks, striped across a larger number
//! of logical buckets.
//!
//! [`HashIndex`](crate::hash_index::HashIndex) needs one critical section per
//! bucket chain, but allocating one real lock per bucket wastes memory once
//! the bucket count grows past a few thousand and most locks sit idle. The
//! pool decouples the two: `2^k` locks cover `2^h` buckets (`k <= h`) by
//! mapping bucket index `b` to lock `b & lock_mask`. This is the same
//! bucket-to-shard hashing idiom the teacher's `ConcurrentSlruCache` uses for
//! its per-segment sharding, applied one level deeper (buckets within a
//! single structure rather than whole cache segments).

use alloc::boxed::Box;
use alloc::vec::Vec;
use parking_lot::RwLock;

/// A striped pool of reader/writer locks.
pub struct LockPool {
    locks: Box<[RwLock<()>]>,
    mask: usize,
}

impl LockPool {
    /// Creates a pool of `2^locks_power` locks.
    pub fn new(locks_power: u32) -> Self {
        let count = 1usize << locks_power;
        let locks = (0..count).map(|_| RwLock::new(())).collect::<Vec<_>>();
        LockPool {
            locks: locks.into_boxed_slice(),
            mask: count - 1,
        }
    }

    /// Number of locks in the pool.
    #[inline]
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Returns the lock that guards the bucket identified by `hash`.
    #[inline]
    pub fn lock_for(&self, hash: u64) -> &RwLock<()> {
        &self.locks[(hash as usize) & self.mask]
    }
}

impl core::fmt::Debug for LockPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockPool")
            .field("lock_count", &self.lock_count())
            .finish()
    }
}
