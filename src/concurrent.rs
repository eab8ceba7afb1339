//! Concurrent cache wrapper, available when the `concurrent` feature is
//! enabled.
//!
//! [`crate::hash_index::HashIndex`] and [`crate::lock_pool::LockPool`] are
//! always thread-safe — that's the core deliverable. This module adds an
//! optional, coarser-grained wrapper for callers who want a whole `Slru`
//! shared across threads without reasoning about tier-level locking
//! themselves, grounded in the teacher's `ConcurrentSlruCache` (which shards
//! a cache across `Mutex`-guarded segments) but using one lock per SLRU tier
//! instead of one lock per hash shard, since a tier is this crate's natural
//! unit of exclusive access.

mod slru;

pub use self::slru::ConcurrentSlru;
