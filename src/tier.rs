//! A single LRU tier: a fixed-capacity recency list backed by its own
//! [`HashIndex`].
//!
//! `LruTier` is the primitive [`Slru`](crate::slru::Slru) composes into `n_seg`
//! ordered segments. Its own recency list is an intrusive doubly-linked list
//! threaded through `Obj::lru_prev`/`Obj::lru_next`, modeled directly on the
//! teacher's `list::List<T>` — Box-owned sentinel head/tail nodes, raw
//! pointer traversal, `_detach`/`attach`/`move_to_front` as separate unsafe
//! primitives. Unlike the teacher's `List<T>`, a tier's list does not own its
//! nodes outright: nodes are owned by whichever `Slru` created them, and the
//! tier only ever holds them while they're resident.
//!
//! A tier is **not** thread-safe on its own (matching the teacher's
//! documented stance that `SlruCache` requires external synchronization);
//! only its embedded `HashIndex` is.

use alloc::boxed::Box;
use core::ptr;

use crate::hash_index::HashIndex;
use crate::obj::Obj;

/// Outcome of a lookup against a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// The object is resident and unexpired.
    Hit {
        /// Size of the hit object, in bytes.
        size: u64,
    },
    /// The object is not resident in this tier.
    Miss,
    /// The object was resident but past its expiry time.
    Expired,
}

/// A single ordered LRU segment.
pub struct LruTier<P> {
    capacity: u64,
    per_obj_overhead: u64,
    occupied_size: u64,
    len: usize,
    head: *mut Obj<P>,
    tail: *mut Obj<P>,
    index: HashIndex<P>,
}

impl<P> LruTier<P> {
    /// Creates an empty tier with the given byte capacity, accounting
    /// overhead, and hash index sizing.
    pub fn new(capacity: u64, per_obj_overhead: u64, hashpower: u32) -> Self {
        let head = Box::into_raw(Box::new(Obj::new_sigil()));
        let tail = Box::into_raw(Box::new(Obj::new_sigil()));
        // SAFETY: head/tail were just allocated and are exclusively owned here.
        unsafe {
            (*head).lru_next = tail;
            (*tail).lru_prev = head;
        }
        LruTier {
            capacity,
            per_obj_overhead,
            occupied_size: 0,
            len: 0,
            head,
            tail,
            index: HashIndex::new(hashpower),
        }
    }

    /// Byte capacity of this tier.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Currently occupied bytes, including per-object overhead.
    #[inline]
    pub fn occupied_size(&self) -> u64 {
        self.occupied_size
    }

    /// Number of resident objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the tier holds no objects.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if an object of `size` bytes would fit without evicting anything
    /// else from this tier.
    pub fn fits(&self, size: u64) -> bool {
        self.occupied_size + size + self.per_obj_overhead <= self.capacity
    }

    /// Looks up `obj_id`. When `update_recency` is true and the object is
    /// present and unexpired, moves it to the most-recently-used end.
    pub fn check(&mut self, obj_id: u64, update_recency: bool, now: u64) -> CheckResult {
        let found = self.index.find_ptr(obj_id);
        match found {
            None => CheckResult::Miss,
            Some(ptr) => {
                // SAFETY: `ptr` came from this tier's own index and is live.
                let node = unsafe { &*ptr };
                if let Some(expire_at) = node.expire_at {
                    if now >= expire_at {
                        return CheckResult::Expired;
                    }
                }
                let size = node.obj_size;
                if update_recency {
                    // SAFETY: `ptr` is linked into this tier's own list.
                    unsafe { self.move_to_front(ptr) };
                }
                CheckResult::Hit { size }
            }
        }
    }

    /// Links a freshly allocated, unlinked node into this tier at the
    /// most-recently-used end and indexes it.
    ///
    /// # Safety
    ///
    /// `node` must not already be linked into any tier or hash index.
    pub unsafe fn insert(&mut self, node: *mut Obj<P>) {
        // SAFETY: caller guarantees `node` is unlinked and uniquely owned.
        unsafe {
            (*node).lru_prev = self.head;
            (*node).lru_next = (*self.head).lru_next;
            (*(*self.head).lru_next).lru_prev = node;
            (*self.head).lru_next = node;
            (*node).in_cache = true;
            self.occupied_size += (*node).obj_size + self.per_obj_overhead;
        }
        self.len += 1;
        // SAFETY: `node` is uniquely owned and not yet in any index.
        let replaced = unsafe { self.index.insert(node) };
        debug_assert!(replaced.is_none(), "insert: duplicate obj_id in tier");
    }

    /// Removes and returns the least-recently-used object, if any.
    pub fn evict(&mut self) -> Option<Box<Obj<P>>> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: tier is non-empty, so `tail.lru_prev` is a real node.
        let victim = unsafe { (*self.tail).lru_prev };
        let obj_id = unsafe { (*victim).obj_id };
        unsafe { self.detach(victim) };
        self.index.delete(obj_id);
        // SAFETY: `victim` is now unlinked from both list and index; this
        // tier was its sole owner.
        let boxed = unsafe { Box::from_raw(victim) };
        self.occupied_size -= boxed.obj_size + self.per_obj_overhead;
        self.len -= 1;
        Some(boxed)
    }

    /// Returns a reference to the least-recently-used object without
    /// removing it.
    pub fn to_evict(&self) -> Option<&Obj<P>> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: tier is non-empty.
        Some(unsafe { &*(*self.tail).lru_prev })
    }

    /// Removes `obj_id` from this tier, if present, and returns its node.
    pub fn remove(&mut self, obj_id: u64) -> Option<Box<Obj<P>>> {
        let ptr = self.index.find_ptr(obj_id)?;
        self.index.delete(obj_id);
        // SAFETY: `ptr` was linked into this tier's own list.
        unsafe { self.detach(ptr) };
        // SAFETY: `ptr` is now unlinked from both list and index.
        let boxed = unsafe { Box::from_raw(ptr) };
        self.occupied_size -= boxed.obj_size + self.per_obj_overhead;
        self.len -= 1;
        Some(boxed)
    }

    /// # Safety
    ///
    /// `node` must be currently linked into this tier's recency list.
    unsafe fn detach(&mut self, node: *mut Obj<P>) {
        // SAFETY: caller guarantees `node` is linked here.
        unsafe {
            let prev = (*node).lru_prev;
            let next = (*node).lru_next;
            (*prev).lru_next = next;
            (*next).lru_prev = prev;
            (*node).lru_prev = ptr::null_mut();
            (*node).lru_next = ptr::null_mut();
            (*node).in_cache = false;
        }
    }

    /// # Safety
    ///
    /// `node` must be currently linked into this tier's recency list.
    unsafe fn move_to_front(&mut self, node: *mut Obj<P>) {
        // SAFETY: detach/re-attach of a node already linked into this list.
        unsafe {
            self.detach(node);
            (*node).lru_prev = self.head;
            (*node).lru_next = (*self.head).lru_next;
            (*(*self.head).lru_next).lru_prev = node;
            (*self.head).lru_next = node;
            (*node).in_cache = true;
        }
    }
}

impl<P> Drop for LruTier<P> {
    fn drop(&mut self) {
        while self.evict().is_some() {}
        // SAFETY: sentinels were allocated by this tier via `Box::into_raw`
        // and are never shared.
        unsafe {
            drop(Box::from_raw(self.head));
            drop(Box::from_raw(self.tail));
        }
    }
}

impl<P> core::fmt::Debug for LruTier<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LruTier")
            .field("capacity", &self.capacity)
            .field("occupied_size", &self.occupied_size)
            .field("len", &self.len)
            .finish()
    }
}
