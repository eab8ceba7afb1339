//! The cache object node (`Obj`).
//!
//! `Obj<P>` is the single unit of caching: a heap-allocated node carrying the
//! object's identity and size, an intrusive hash-chain link, an intrusive
//! doubly-linked recency link, and an opaque user payload `P` that the core
//! never interprets.
//!
//! Nodes are allocated one at a time with `Box::into_raw` and reclaimed with
//! `Box::from_raw`, mirroring the ownership style of the teacher crate's
//! `list::Entry<T>`. A node is reachable from at most one [`crate::hash_index::HashIndex`]
//! bucket chain and at most one [`crate::tier::LruTier`] recency list at a time.

use core::fmt;
use core::mem::MaybeUninit;
use core::ptr;

/// A single cached object.
///
/// # Safety
///
/// `hash_next`, `lru_prev`, and `lru_next` are raw pointers into other `Obj`
/// allocations (or null). They are valid exactly as long as the owning
/// [`crate::hash_index::HashIndex`] / [`crate::tier::LruTier`] has not unlinked and freed
/// the node. Callers outside this crate never see these fields.
pub struct Obj<P> {
    /// Unique identifier of the cached object.
    pub obj_id: u64,
    /// Byte size counted toward tier occupancy.
    pub obj_size: u64,
    /// True iff this node is currently linked into some tier's recency list.
    pub(crate) in_cache: bool,
    /// Absolute expiry time (caller-defined clock units), if any.
    pub(crate) expire_at: Option<u64>,
    /// Forward link in the owning hash bucket's chain.
    pub(crate) hash_next: *mut Obj<P>,
    /// Previous node in the owning tier's recency list (toward MRU).
    pub(crate) lru_prev: *mut Obj<P>,
    /// Next node in the owning tier's recency list (toward LRU).
    pub(crate) lru_next: *mut Obj<P>,
    /// Opaque, uninterpreted user payload. Sentinel nodes never initialize this.
    payload: MaybeUninit<P>,
}

impl<P> Obj<P> {
    /// Creates a new, unlinked object node.
    pub fn new(obj_id: u64, obj_size: u64, payload: P) -> Self {
        Obj {
            obj_id,
            obj_size,
            in_cache: false,
            expire_at: None,
            hash_next: ptr::null_mut(),
            lru_prev: ptr::null_mut(),
            lru_next: ptr::null_mut(),
            payload: MaybeUninit::new(payload),
        }
    }

    /// Creates an uninitialized sentinel node used as a list head/tail marker.
    ///
    /// Sentinel nodes are never inserted into a hash index and their payload
    /// is never read.
    pub(crate) fn new_sigil() -> Self {
        Obj {
            obj_id: 0,
            obj_size: 0,
            in_cache: false,
            expire_at: None,
            hash_next: ptr::null_mut(),
            lru_prev: ptr::null_mut(),
            lru_next: ptr::null_mut(),
            payload: MaybeUninit::uninit(),
        }
    }

    /// Sets an absolute expiry time for this object.
    pub fn set_expire_at(&mut self, expire_at: Option<u64>) {
        self.expire_at = expire_at;
    }

    /// Returns `true` if this node is currently resident in some tier.
    #[inline]
    pub fn in_cache(&self) -> bool {
        self.in_cache
    }

    /// Returns a reference to the opaque payload.
    ///
    /// # Safety
    ///
    /// Must not be called on a sentinel node.
    pub unsafe fn payload(&self) -> &P {
        // SAFETY: caller guarantees this is not a sentinel node, so `payload`
        // was initialized by `new`.
        unsafe { self.payload.assume_init_ref() }
    }

    /// Returns a mutable reference to the opaque payload.
    ///
    /// # Safety
    ///
    /// Must not be called on a sentinel node.
    pub unsafe fn payload_mut(&mut self) -> &mut P {
        // SAFETY: caller guarantees this is not a sentinel node.
        unsafe { self.payload.assume_init_mut() }
    }

    /// Consumes a boxed, non-sentinel node and returns its payload.
    ///
    /// # Safety
    ///
    /// `node` must not be a sentinel node.
    pub unsafe fn into_payload(self) -> P {
        // SAFETY: caller guarantees this is not a sentinel node.
        unsafe { self.payload.assume_init() }
    }
}

impl<P: fmt::Debug> fmt::Debug for Obj<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Obj")
            .field("obj_id", &self.obj_id)
            .field("obj_size", &self.obj_size)
            .field("in_cache", &self.in_cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn new_object_is_not_in_cache() {
        let obj = Obj::new(1, 10, "payload");
        assert!(!obj.in_cache());
        assert_eq!(obj.obj_id, 1);
        assert_eq!(obj.obj_size, 10);
        unsafe {
            assert_eq!(*obj.payload(), "payload");
        }
    }

    #[test]
    fn into_payload_recovers_value() {
        let obj = Obj::new(7, 1, String::from("hello"));
        let payload = unsafe { obj.into_payload() };
        assert_eq!(payload, "hello");
    }
}
