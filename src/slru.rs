//! Segmented LRU (SLRU) eviction policy.
//!
//! `Slru<P>` composes `n_seg` [`LruTier`]s into an ordered cascade: tier 0 is
//! coldest, the last tier is hottest. A hit in any tier below the top
//! promotes the object one tier up; making room in the destination tier
//! cascades a "cooling" demotion down through the lower tiers, and cooling
//! tier 0 is the cache's only true eviction.
//!
//! This generalizes the teacher's `SlruSegment`/`SlruCache`, which hard-codes
//! exactly two segments (probationary, protected) backed by a `HashMap`, to
//! an arbitrary number of tiers backed by the intrusive [`HashIndex`]-backed
//! [`LruTier`] primitive. The promotion/cooling control flow below mirrors
//! the shape of the teacher's `promote_to_protected`/`demote_lru_protected`
//! pair, threaded through an arbitrary tier count instead of a fixed two.
//!
//! `Slru` is **not** thread-safe by itself, matching the teacher's own
//! documented stance that `SlruCache` requires external synchronization; see
//! [`crate::concurrent::slru::ConcurrentSlru`] for a lock-wrapped variant.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::config::{CommonCacheParams, SlruParams};
use crate::error::CacheError;
use crate::metrics::SlruCacheMetrics;
use crate::obj::Obj;
use crate::request::{CacheResult, Request};
use crate::tier::{CheckResult, LruTier};

/// An `n_seg`-tier Segmented LRU cache.
pub struct Slru<P> {
    tiers: Vec<LruTier<P>>,
    total_capacity: u64,
    per_obj_overhead: u64,
    default_ttl: Option<u64>,
    metrics: SlruCacheMetrics,
}

impl<P> Slru<P> {
    /// Builds an `Slru` from common and SLRU-specific parameters.
    ///
    /// Divides `cache_size` evenly across `n_seg` tiers; any remainder from
    /// integer division is assigned to tier 0 rather than dropped.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidConfig`] if `cache_size` is too small to
    /// give every tier above tier 0 a non-zero capacity.
    pub fn from_params(common: CommonCacheParams, policy: SlruParams) -> Result<Self, CacheError> {
        let n_seg = policy.n_seg();
        let total = common.cache_size().get();
        let per_tier = total / n_seg as u64;
        let remainder = total % n_seg as u64;
        if n_seg > 1 && per_tier == 0 {
            return Err(CacheError::InvalidConfig {
                reason: "cache_size too small to give every tier non-zero capacity",
            });
        }
        let mut tiers = Vec::with_capacity(n_seg);
        for i in 0..n_seg {
            let capacity = if i == 0 { per_tier + remainder } else { per_tier };
            tiers.push(LruTier::new(
                capacity,
                common.per_obj_overhead(),
                common.hashpower(),
            ));
        }
        Ok(Slru {
            tiers,
            total_capacity: total,
            per_obj_overhead: common.per_obj_overhead(),
            default_ttl: common.default_ttl(),
            metrics: SlruCacheMetrics::new(total, n_seg),
        })
    }

    /// Number of tiers.
    pub fn n_seg(&self) -> usize {
        self.tiers.len()
    }

    /// Total number of resident objects across all tiers.
    pub fn len(&self) -> usize {
        self.tiers.iter().map(LruTier::len).sum()
    }

    /// True if no tier holds any objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only access to accumulated metrics.
    pub fn metrics(&self) -> &SlruCacheMetrics {
        &self.metrics
    }

    /// Looks up `obj_id` without inserting on a miss. Promotes on hit unless
    /// already in the hottest tier. Returns [`CacheResult::Expired`] without
    /// removing the stale entry — callers that want TTL cleanup should
    /// follow up with [`Slru::remove`] or use [`Slru::get`].
    pub fn check(&mut self, obj_id: u64, update_recency: bool, now: u64) -> CacheResult {
        let n = self.tiers.len();
        for i in 0..n {
            let is_top = i + 1 == n;
            match self.tiers[i].check(obj_id, update_recency && is_top, now) {
                CheckResult::Hit { size } => {
                    self.metrics.record_tier_hit(i, size);
                    if update_recency && !is_top {
                        self.promote(i, obj_id);
                    }
                    return CacheResult::Hit;
                }
                CheckResult::Expired => return CacheResult::Expired,
                CheckResult::Miss => continue,
            }
        }
        CacheResult::Miss
    }

    /// Looks up `obj_id`; on a miss or an expired hit, inserts `payload`
    /// under `req` and returns the original lookup result.
    pub fn get(&mut self, req: Request, payload: P, now: u64) -> CacheResult {
        let result = self.check(req.obj_id, true, now);
        match result {
            CacheResult::Hit => CacheResult::Hit,
            CacheResult::Expired => {
                self.remove(req.obj_id);
                self.insert(req, payload, now);
                CacheResult::Expired
            }
            CacheResult::Miss => {
                self.insert(req, payload, now);
                CacheResult::Miss
            }
        }
    }

    /// Inserts a new object into tier 0, cooling as needed to make room.
    /// Silently declines to insert an object too large to ever fit, even in
    /// an empty cache, counting the per-object accounting overhead toward
    /// that size. If `req.obj_id` is already resident in some tier, that
    /// entry is displaced first — `insert` always (re)starts the object cold.
    pub fn insert(&mut self, req: Request, payload: P, now: u64) {
        if req.obj_size + self.per_obj_overhead > self.total_capacity {
            return;
        }
        for tier in self.tiers.iter_mut() {
            if tier.remove(req.obj_id).is_some() {
                break;
            }
        }
        while !self.tiers[0].fits(req.obj_size) {
            if self.tiers[0].is_empty() {
                // A single object can't fit even alone; nothing left to evict.
                return;
            }
            self.cool(0);
        }
        let expire_at = req.ttl.or_else(|| self.default_ttl.map(|horizon| now + horizon));
        let mut obj = Obj::new(req.obj_id, req.obj_size, payload);
        obj.set_expire_at(expire_at);
        let ptr = Box::into_raw(Box::new(obj));
        // SAFETY: `ptr` is freshly allocated and unlinked.
        unsafe { self.tiers[0].insert(ptr) };
        self.metrics.core.record_insertion(req.obj_size);
    }

    /// Forces a single true eviction from tier 0, the cache's coldest tier.
    pub fn evict(&mut self) -> Option<Box<Obj<P>>> {
        let victim = self.tiers[0].evict()?;
        self.metrics.record_eviction(victim.obj_size);
        Some(victim)
    }

    /// Returns the next object tier 0 would evict, without removing it.
    pub fn to_evict(&self) -> Option<&Obj<P>> {
        self.tiers[0].to_evict()
    }

    /// Removes `obj_id` from whichever tier holds it. Logs a non-fatal
    /// warning and returns `false` if the object is absent from every tier.
    pub fn remove(&mut self, obj_id: u64) -> bool {
        for tier in self.tiers.iter_mut() {
            if tier.remove(obj_id).is_some() {
                return true;
            }
        }
        log::warn!("remove: obj_id {obj_id} not found in any tier");
        false
    }

    /// Evicts from `tier_idx`'s LRU end. Cooling tier 0 is a true eviction;
    /// cooling any higher tier demotes the evicted object into the tier
    /// below, recursively cooling that tier first if it has no room.
    fn cool(&mut self, tier_idx: usize) {
        let victim = match self.tiers[tier_idx].evict() {
            Some(v) => v,
            None => return,
        };
        if tier_idx == 0 {
            self.metrics.record_eviction(victim.obj_size);
            drop(victim);
            return;
        }
        self.metrics.record_cooling(tier_idx);
        let target = tier_idx - 1;
        while !self.tiers[target].fits(victim.obj_size) {
            self.cool(target);
        }
        let ptr = Box::into_raw(victim);
        // SAFETY: `ptr` was just unlinked from its previous tier and is
        // uniquely owned here.
        unsafe { self.tiers[target].insert(ptr) };
    }

    /// Promotes the object at `obj_id` out of `from_idx` into the next
    /// hotter tier, cooling that tier first if it has no room.
    fn promote(&mut self, from_idx: usize, obj_id: u64) {
        let node = match self.tiers[from_idx].remove(obj_id) {
            Some(n) => n,
            None => return,
        };
        let target = from_idx + 1;
        while !self.tiers[target].fits(node.obj_size) {
            self.cool(target);
        }
        self.metrics.record_promotion(from_idx);
        let ptr = Box::into_raw(node);
        // SAFETY: `ptr` was just unlinked from `from_idx` and is uniquely
        // owned here.
        unsafe { self.tiers[target].insert(ptr) };
    }
}

impl<P> core::fmt::Debug for Slru<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Slru")
            .field("n_seg", &self.n_seg())
            .field("total_capacity", &self.total_capacity)
            .field("len", &self.len())
            .finish()
    }
}
