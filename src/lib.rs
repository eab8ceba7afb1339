#![doc = include_str!("../README.md")]
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// Intrusive cache node type.
///
/// `Obj<P>` is the single node type shared by every tier's hash index and
/// recency list: it carries its own hash-chain link, its own LRU links, and
/// the caller's payload, so no separate bookkeeping struct is needed per
/// entry.
pub mod obj;

/// Striped lock pool.
///
/// Maps a bucket hash to one of a fixed power-of-two number of
/// `parking_lot::RwLock`s, decoupling the number of locks from the number of
/// hash buckets so a [`hash_index::HashIndex`] can grow without growing its
/// lock footprint in lockstep.
pub mod lock_pool;

/// Concurrent chained hash index.
///
/// An intrusive hash table over [`obj::Obj`] nodes, synchronized with a
/// [`lock_pool::LockPool`]. Never owns the nodes it indexes; callers retain
/// ownership and pass raw pointers across the `insert`/`delete` boundary.
pub mod hash_index;

/// A single LRU-ordered cache tier.
///
/// Combines a [`hash_index::HashIndex`] for lookups with an intrusive
/// doubly-linked recency list built directly on [`obj::Obj`]'s own link
/// fields. Not thread-safe by itself; [`concurrent::ConcurrentSlru`] adds a
/// lock per tier for multi-threaded use.
pub mod tier;

/// Segmented LRU (SLRU) cache with an arbitrary number of cascading tiers.
///
/// Tier 0 is coldest, the last tier is hottest. A hit promotes an object
/// toward the hottest tier, cooling (demoting) objects out of the way as
/// needed; cooling out of tier 0 is a true eviction.
pub mod slru;

/// Cache request and lookup result types.
pub mod request;

/// Construction parameters for [`slru::Slru`] and [`concurrent::ConcurrentSlru`].
pub mod config;

/// Cache error types.
pub mod error;

/// Cache metrics system.
///
/// Provides a flexible metrics collection and reporting system, following
/// the same `CacheMetrics` trait shape for every cache algorithm this crate
/// implements.
pub mod metrics;

/// Concurrent cache implementations.
///
/// Provides a thread-safe [`concurrent::ConcurrentSlru`] wrapper around
/// [`slru::Slru`]'s tiers, using one lock per tier for multi-threaded
/// access. Available when the `concurrent` feature is enabled.
#[cfg(feature = "concurrent")]
pub mod concurrent;

pub use config::{CommonCacheParams, SlruParams};
pub use error::CacheError;
pub use obj::Obj;
pub use request::{CacheResult, Request};
pub use slru::Slru;

#[cfg(feature = "concurrent")]
pub use concurrent::ConcurrentSlru;
