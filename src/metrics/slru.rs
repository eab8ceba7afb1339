//! SLRU Cache Metrics
//!
//! Metrics specific to the SLRU (Segmented Least Recently Used) cache
//! algorithm, generalized from the teacher's fixed probationary/protected
//! pair to an arbitrary number of ordered tiers.

extern crate alloc;

use super::{CacheMetrics, CoreCacheMetrics};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

/// SLRU-specific metrics (extends [`CoreCacheMetrics`]).
///
/// Per-tier counters are indexed identically to the `Slru`'s own tier
/// ordering: index 0 is the coldest tier, the last index is the hottest.
#[derive(Debug, Clone)]
pub struct SlruCacheMetrics {
    /// Core metrics common to all cache algorithms.
    pub core: CoreCacheMetrics,

    /// Number of objects currently resident in each tier.
    pub tier_sizes: Vec<u64>,

    /// Cache hits recorded against each tier.
    pub tier_hits: Vec<u64>,

    /// Evictions (true, leaving the cache) recorded against tier 0.
    pub evictions: u64,

    /// Promotions from tier `i` to tier `i + 1`, indexed by the source tier.
    pub promotions: Vec<u64>,

    /// Cooling events (demotion from tier `i` to tier `i - 1`), indexed by
    /// the source tier.
    pub coolings: Vec<u64>,
}

impl SlruCacheMetrics {
    /// Creates metrics for an SLRU with `n_seg` tiers.
    pub fn new(max_cache_size_bytes: u64, n_seg: usize) -> Self {
        Self {
            core: CoreCacheMetrics::new(max_cache_size_bytes),
            tier_sizes: vec![0; n_seg],
            tier_hits: vec![0; n_seg],
            evictions: 0,
            promotions: vec![0; n_seg],
            coolings: vec![0; n_seg],
        }
    }

    /// Records a hit in tier `tier_idx`.
    pub fn record_tier_hit(&mut self, tier_idx: usize, object_size: u64) {
        self.core.record_hit(object_size);
        self.tier_hits[tier_idx] += 1;
    }

    /// Records a promotion out of tier `tier_idx` into the next hotter tier.
    pub fn record_promotion(&mut self, tier_idx: usize) {
        self.promotions[tier_idx] += 1;
    }

    /// Records a cooling (demotion) out of tier `tier_idx` into the next
    /// colder tier.
    pub fn record_cooling(&mut self, tier_idx: usize) {
        self.coolings[tier_idx] += 1;
    }

    /// Records a true eviction (from tier 0, leaving the cache).
    pub fn record_eviction(&mut self, evicted_size: u64) {
        self.core.record_eviction(evicted_size);
        self.evictions += 1;
    }

    /// Updates the reported per-tier resident counts.
    pub fn update_tier_sizes(&mut self, sizes: &[u64]) {
        self.tier_sizes.clear();
        self.tier_sizes.extend_from_slice(sizes);
    }

    /// Converts SLRU metrics to a BTreeMap for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        for (i, &size) in self.tier_sizes.iter().enumerate() {
            metrics.insert(alloc::format!("tier_{i}_size"), size as f64);
        }
        for (i, &hits) in self.tier_hits.iter().enumerate() {
            metrics.insert(alloc::format!("tier_{i}_hits"), hits as f64);
        }
        for (i, &count) in self.promotions.iter().enumerate() {
            metrics.insert(alloc::format!("tier_{i}_promotions"), count as f64);
        }
        for (i, &count) in self.coolings.iter().enumerate() {
            metrics.insert(alloc::format!("tier_{i}_coolings"), count as f64);
        }
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics
    }
}

impl CacheMetrics for SlruCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "SLRU"
    }
}
