//! A concurrent, chained hash index over [`Obj`] nodes.
//!
//! Each bucket is a singly-linked chain threaded through `Obj::hash_next`.
//! Synchronization is entirely delegated to a [`LockPool`]: bucket `b` is
//! guarded by lock `b & lock_mask`, so a pool with fewer locks than buckets
//! still gives every bucket *some* independent lock, at the cost of sharing
//! that lock with its sibling buckets. The index never holds more than one
//! pool lock at a time and never owns the nodes it indexes — it only ever
//! reads and rewrites `hash_next` pointers into nodes owned by the
//! surrounding [`LruTier`](crate::tier::LruTier).
//!
//! This has no single analog in the teacher crate (whose `SlruSegment` backs
//! its segments with a plain `HashMap`), so the bucket-chain/cursor-walk
//! shape is grounded in the teacher's `list::List<T>` (Box-owned nodes
//! walked via raw pointers, unsafe `_detach`) and the pack's bucket-locking
//! examples (`chashmap`, `concurrent_map.rs`), generalized from open
//! addressing / whole-map sharding to chained buckets striped over a
//! decoupled lock pool.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::lock_pool::LockPool;
use crate::obj::Obj;

/// Maximum number of buckets a bounded `random_obj` probe will visit before
/// giving up and returning `None`.
const MAX_RANDOM_PROBES: usize = 64;

/// splitmix64 finalizer, used to scramble `obj_id` before it is masked into
/// a bucket index so sequential ids don't all land in the same bucket.
#[inline]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    x
}

/// A concurrent chained hash index over `Obj<P>` nodes.
pub struct HashIndex<P> {
    hashpower: u32,
    buckets: Box<[UnsafeCell<*mut Obj<P>>]>,
    lock_pool: LockPool,
    n_obj: AtomicUsize,
}

// SAFETY: all mutable access to `buckets` entries is gated by the
// corresponding `LockPool` lock; `Obj<P>` pointers are never aliased outside
// that lock's critical section within this type's own methods.
unsafe impl<P: Send> Send for HashIndex<P> {}
// SAFETY: see above; reads through `find_with` also take the bucket's lock.
unsafe impl<P: Send> Sync for HashIndex<P> {}

impl<P> HashIndex<P> {
    /// Creates an index with `2^hashpower` buckets and
    /// `2^max(0, hashpower - 10)` locks.
    pub fn new(hashpower: u32) -> Self {
        let n_buckets = 1usize << hashpower;
        let buckets = (0..n_buckets)
            .map(|_| UnsafeCell::new(ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let locks_power = hashpower.saturating_sub(10);
        HashIndex {
            hashpower,
            buckets,
            lock_pool: LockPool::new(locks_power),
            n_obj: AtomicUsize::new(0),
        }
    }

    /// Number of buckets in the table.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of objects currently indexed.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_obj.load(Ordering::Acquire)
    }

    /// True if the index holds no objects.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn bucket_index(&self, obj_id: u64) -> usize {
        (mix64(obj_id) as usize) & (self.buckets.len() - 1)
    }

    /// Looks up `obj_id` and invokes `f` with the result while holding the
    /// bucket's read lock. The reference handed to `f` is valid only for the
    /// duration of the closure.
    pub fn find_with<R>(&self, obj_id: u64, f: impl FnOnce(Option<&Obj<P>>) -> R) -> R {
        let idx = self.bucket_index(obj_id);
        let lock = self.lock_pool.lock_for(idx as u64);
        let _guard = lock.read();
        // SAFETY: the bucket's read lock is held for the duration of the walk.
        let mut cur = unsafe { *self.buckets[idx].get() };
        while !cur.is_null() {
            // SAFETY: `cur` was read from a live chain under the bucket lock.
            let node = unsafe { &*cur };
            if node.obj_id == obj_id {
                return f(Some(node));
            }
            cur = node.hash_next;
        }
        f(None)
    }

    /// True if `obj_id` is present in the index.
    pub fn contains(&self, obj_id: u64) -> bool {
        self.find_with(obj_id, |found| found.is_some())
    }

    /// Returns the raw pointer to the node for `obj_id`, if present.
    ///
    /// Intended for callers (the owning tier) that already serialize access
    /// to this index via an outer lock and need the pointer to splice the
    /// node out of their own recency list.
    pub(crate) fn find_ptr(&self, obj_id: u64) -> Option<*mut Obj<P>> {
        let idx = self.bucket_index(obj_id);
        let lock = self.lock_pool.lock_for(idx as u64);
        let _guard = lock.read();
        // SAFETY: bucket read lock held for the walk.
        let mut cur = unsafe { *self.buckets[idx].get() };
        while !cur.is_null() {
            // SAFETY: `cur` is live under the bucket lock.
            let node = unsafe { &*cur };
            if node.obj_id == obj_id {
                return Some(cur);
            }
            cur = node.hash_next;
        }
        None
    }

    /// Inserts `node` into the index. If a node with the same `obj_id`
    /// already exists, it is unlinked from the chain and its pointer is
    /// returned to the caller (the index never frees nodes); otherwise
    /// `node` is prepended to its bucket and `None` is returned.
    ///
    /// # Safety
    ///
    /// `node` must point to a live, uniquely-owned `Obj<P>` not already
    /// linked into this or any other hash index.
    pub unsafe fn insert(&self, node: *mut Obj<P>) -> Option<*mut Obj<P>> {
        // SAFETY: caller guarantees `node` is valid.
        let obj_id = unsafe { (*node).obj_id };
        let idx = self.bucket_index(obj_id);
        let lock = self.lock_pool.lock_for(idx as u64);
        let _guard = lock.write();

        // Double-pointer walk: `link` always points at the slot (bucket cell
        // or a node's `hash_next`) that holds the pointer to `cur`.
        let link: *mut *mut Obj<P> = self.buckets[idx].get();
        // SAFETY: bucket write lock held.
        let mut cur = unsafe { *link };
        let mut link = link;
        while !cur.is_null() {
            // SAFETY: `cur` is live under the bucket lock.
            let cur_ref = unsafe { &mut *cur };
            if cur_ref.obj_id == obj_id {
                // Splice `node` in at `cur`'s position.
                // SAFETY: `node` valid per caller guarantee.
                unsafe {
                    (*node).hash_next = cur_ref.hash_next;
                    *link = node;
                }
                cur_ref.hash_next = ptr::null_mut();
                cur_ref.in_cache = false;
                return Some(cur);
            }
            link = &mut cur_ref.hash_next;
            cur = cur_ref.hash_next;
        }

        // SAFETY: `node` valid per caller guarantee; `link` points at either
        // the bucket cell or the last node's `hash_next`, both write-locked.
        unsafe {
            *link = node;
            (*node).hash_next = ptr::null_mut();
        }
        self.n_obj.fetch_add(1, Ordering::AcqRel);
        None
    }

    /// Removes `obj_id` from the index and returns its node pointer, if
    /// present. The index never frees the node; ownership passes back to
    /// the caller.
    pub fn delete(&self, obj_id: u64) -> Option<*mut Obj<P>> {
        let idx = self.bucket_index(obj_id);
        let lock = self.lock_pool.lock_for(idx as u64);
        let _guard = lock.write();

        let link: *mut *mut Obj<P> = self.buckets[idx].get();
        // SAFETY: bucket write lock held.
        let mut cur = unsafe { *link };
        let mut link = link;
        while !cur.is_null() {
            // SAFETY: `cur` is live under the bucket lock.
            let cur_ref = unsafe { &mut *cur };
            if cur_ref.obj_id == obj_id {
                // SAFETY: `link` points at either the bucket cell or a
                // node's `hash_next`, write-locked.
                unsafe {
                    *link = cur_ref.hash_next;
                }
                cur_ref.hash_next = ptr::null_mut();
                cur_ref.in_cache = false;
                self.n_obj.fetch_sub(1, Ordering::AcqRel);
                return Some(cur);
            }
            link = &mut cur_ref.hash_next;
            cur = cur_ref.hash_next;
        }
        None
    }

    /// Samples a pseudo-random resident object, probing up to
    /// `min(bucket_count, 64)` buckets (as chosen by `next_hash`, an
    /// externally supplied source of successive probe hashes) before giving
    /// up and returning `None`. Used by policies that need an eviction
    /// candidate independent of recency ordering.
    pub fn random_obj_with<R>(
        &self,
        mut next_hash: impl FnMut() -> u64,
        f: impl FnOnce(Option<&Obj<P>>) -> R,
    ) -> R {
        let max_probes = self.buckets.len().min(MAX_RANDOM_PROBES);
        for _ in 0..max_probes {
            let idx = (next_hash() as usize) & (self.buckets.len() - 1);
            let lock = self.lock_pool.lock_for(idx as u64);
            let guard = lock.read();
            // SAFETY: bucket read lock held.
            let head = unsafe { *self.buckets[idx].get() };
            if !head.is_null() {
                // SAFETY: `head` is live under the bucket lock, held by `guard`.
                let node = unsafe { &*head };
                let result = f(Some(node));
                drop(guard);
                return result;
            }
        }
        f(None)
    }

    /// Convenience wrapper over [`Self::random_obj_with`] that draws probe
    /// hashes from an `rng` implementing [`rand::RngCore`] rather than
    /// requiring the caller to hand-roll a hash source.
    pub fn random_obj_with_rng<R>(
        &self,
        rng: &mut impl rand::RngCore,
        f: impl FnOnce(Option<&Obj<P>>) -> R,
    ) -> R {
        self.random_obj_with(|| rng.next_u64(), f)
    }
}

impl<P> Drop for HashIndex<P> {
    fn drop(&mut self) {
        // The index never owns nodes; the owning tier is responsible for
        // freeing them. Nothing to do here beyond dropping the bucket array
        // and lock pool themselves.
    }
}

impl<P> core::fmt::Debug for HashIndex<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashIndex")
            .field("hashpower", &self.hashpower)
            .field("bucket_count", &self.bucket_count())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;

    fn leak(obj: Obj<u32>) -> *mut Obj<u32> {
        Box::into_raw(Box::new(obj))
    }

    #[test]
    fn insert_then_find() {
        let index: HashIndex<u32> = HashIndex::new(4);
        let node = leak(Obj::new(7, 10, 1));
        unsafe {
            assert!(index.insert(node).is_none());
        }
        assert!(index.contains(7));
        assert!(!index.contains(8));
        assert_eq!(index.len(), 1);
        unsafe {
            drop(Box::from_raw(index.delete(7).unwrap()));
        }
    }

    #[test]
    fn insert_replaces_existing() {
        let index: HashIndex<u32> = HashIndex::new(4);
        let a = leak(Obj::new(1, 10, 1));
        let b = leak(Obj::new(1, 20, 2));
        unsafe {
            assert!(index.insert(a).is_none());
            let old = index.insert(b).expect("replaced node returned");
            assert_eq!(old, a);
            drop(Box::from_raw(old));
        }
        assert_eq!(index.len(), 1);
        index.find_with(1, |found| {
            assert_eq!(found.unwrap().obj_size, 20);
        });
        unsafe {
            drop(Box::from_raw(index.delete(1).unwrap()));
        }
    }

    #[test]
    fn delete_missing_returns_none() {
        let index: HashIndex<u32> = HashIndex::new(4);
        assert!(index.delete(42).is_none());
    }

    #[test]
    fn chain_survives_multiple_entries_in_same_bucket() {
        let index: HashIndex<u32> = HashIndex::new(0); // single bucket
        let nodes: Vec<_> = (0..8).map(|i| leak(Obj::new(i, 1, i as u32))).collect();
        for &n in &nodes {
            unsafe {
                assert!(index.insert(n).is_none());
            }
        }
        assert_eq!(index.len(), 8);
        for i in 0..8 {
            assert!(index.contains(i));
        }
        for &n in &nodes {
            let id = unsafe { (*n).obj_id };
            unsafe {
                drop(Box::from_raw(index.delete(id).unwrap()));
            }
        }
        assert!(index.is_empty());
    }

    #[test]
    fn random_obj_returns_none_on_empty_index() {
        let index: HashIndex<u32> = HashIndex::new(4);
        let mut seed = 1u64;
        let got = index.random_obj_with(
            || {
                seed = mix64(seed);
                seed
            },
            |found| found.map(|o| o.obj_id),
        );
        assert!(got.is_none());
    }

    #[test]
    fn random_obj_finds_resident_object() {
        let index: HashIndex<u32> = HashIndex::new(4);
        let node = leak(Obj::new(99, 1, 0));
        unsafe {
            index.insert(node);
        }
        // Walk every bucket index in turn so the probe is guaranteed to
        // reach whichever bucket holds `99`, regardless of its hash.
        let mut probe = 0u64;
        let got = index.random_obj_with(
            || {
                let hash = probe;
                probe += 1;
                hash
            },
            |found| found.map(|o| o.obj_id),
        );
        assert_eq!(got, Some(99));
        unsafe {
            drop(Box::from_raw(index.delete(99).unwrap()));
        }
    }

    /// Walks every bucket's chain by hand and sums the lengths — the same
    /// count `len()` reports from its atomic counter, but derived
    /// independently from the chain pointers themselves.
    fn chain_length_sum(index: &HashIndex<u32>) -> usize {
        let mut total = 0;
        for bucket in index.buckets.iter() {
            // SAFETY: no concurrent access; test-only introspection.
            let mut cur = unsafe { *bucket.get() };
            while !cur.is_null() {
                total += 1;
                // SAFETY: `cur` is live, the index owns no aliasing refs here.
                cur = unsafe { (*cur).hash_next };
            }
        }
        total
    }

    proptest::proptest! {
        /// After any sequence of inserts/deletes over a small id space (so
        /// collisions within a bucket are common), the number of objects the
        /// index reports matches both the number of live chain links and the
        /// caller's own bookkeeping, and `contains` agrees with that
        /// bookkeeping for every id touched.
        #[test]
        fn chain_length_and_membership_track_insert_delete_sequence(
            ops in proptest::collection::vec((0u64..16, proptest::bool::ANY), 0..200)
        ) {
            let index: HashIndex<u32> = HashIndex::new(2); // 4 buckets, heavy collision
            let mut resident = alloc::collections::BTreeSet::new();

            for (id, should_insert) in ops {
                if should_insert {
                    // `id` is bounded to 0..16 by the generator, so this never truncates.
                    #[allow(clippy::cast_possible_truncation)]
                    let node = leak(Obj::new(id, 1, id as u32));
                    // SAFETY: `node` freshly allocated, not yet linked anywhere.
                    let replaced = unsafe { index.insert(node) };
                    if let Some(old) = replaced {
                        // SAFETY: `old` was just unlinked by `insert`.
                        drop(unsafe { Box::from_raw(old) });
                    }
                    resident.insert(id);
                } else if let Some(ptr) = index.delete(id) {
                    // SAFETY: `ptr` was just unlinked by `delete`.
                    drop(unsafe { Box::from_raw(ptr) });
                    resident.remove(&id);
                }

                proptest::prop_assert_eq!(index.len(), resident.len());
                proptest::prop_assert_eq!(chain_length_sum(&index), resident.len());
                for probe in 0u64..16 {
                    proptest::prop_assert_eq!(index.contains(probe), resident.contains(&probe));
                }
            }

            for id in resident {
                // SAFETY: `id` is known resident; its node is freed here.
                drop(unsafe { Box::from_raw(index.delete(id).unwrap()) });
            }
        }
    }

    #[test]
    fn random_obj_with_rng_finds_resident_object() {
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        // A single-bucket index: any probe hash lands on the only bucket,
        // so the result is deterministic regardless of the rng's output.
        let index: HashIndex<u32> = HashIndex::new(0);
        let node = leak(Obj::new(3, 1, 0));
        unsafe {
            index.insert(node);
        }
        let mut rng = SmallRng::seed_from_u64(42);
        let got = index.random_obj_with_rng(&mut rng, |found| found.map(|o| o.obj_id));
        assert_eq!(got, Some(3));
        unsafe {
            drop(Box::from_raw(index.delete(3).unwrap()));
        }
    }
}
