//! Cache Configuration Module
//!
//! Construction parameters for [`crate::slru::Slru`], following the teacher's
//! builder-style config shape: required fields via `new(...)` with `assert!`
//! invariant checks, optional fields via `with_*` builder methods, plain
//! accessors, manual `Debug`.

use core::num::NonZeroU64;

/// Parameters shared by every tier of an [`crate::slru::Slru`].
#[derive(Clone, Copy)]
pub struct CommonCacheParams {
    /// Total cache capacity across all tiers, in bytes.
    cache_size: NonZeroU64,

    /// Constant overhead, in bytes, charged against every object's size
    /// when accounting for tier occupancy.
    per_obj_overhead: u64,

    /// `log2` of the number of hash buckets each tier's index allocates.
    hashpower: u32,

    /// Default absolute expiry horizon applied to inserted objects that
    /// don't specify their own TTL via `Request::with_ttl`. Measured in the
    /// same units as the `now` passed to `Slru` operations.
    default_ttl: Option<u64>,
}

impl CommonCacheParams {
    /// Creates parameters with a given total cache size.
    ///
    /// # Panics
    /// Panics if `hashpower` is 0 (a hash index needs at least one bucket).
    pub fn new(cache_size: NonZeroU64) -> Self {
        Self {
            cache_size,
            per_obj_overhead: 0,
            hashpower: 10,
            default_ttl: None,
        }
    }

    /// Sets the per-object accounting overhead.
    pub fn with_per_obj_overhead(mut self, per_obj_overhead: u64) -> Self {
        self.per_obj_overhead = per_obj_overhead;
        self
    }

    /// Sets the hash index's `log2` bucket count.
    ///
    /// # Panics
    /// Panics if `hashpower` is 0.
    pub fn with_hashpower(mut self, hashpower: u32) -> Self {
        assert!(hashpower > 0, "hashpower must be non-zero");
        self.hashpower = hashpower;
        self
    }

    /// Sets a default TTL horizon applied to objects without their own.
    pub fn with_default_ttl(mut self, default_ttl: u64) -> Self {
        self.default_ttl = Some(default_ttl);
        self
    }

    /// Total cache capacity, in bytes.
    pub fn cache_size(&self) -> NonZeroU64 {
        self.cache_size
    }

    /// Per-object accounting overhead, in bytes.
    pub fn per_obj_overhead(&self) -> u64 {
        self.per_obj_overhead
    }

    /// `log2` of each tier's hash index bucket count.
    pub fn hashpower(&self) -> u32 {
        self.hashpower
    }

    /// Configured default TTL horizon, if any.
    pub fn default_ttl(&self) -> Option<u64> {
        self.default_ttl
    }
}

impl core::fmt::Debug for CommonCacheParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommonCacheParams")
            .field("cache_size", &self.cache_size)
            .field("per_obj_overhead", &self.per_obj_overhead)
            .field("hashpower", &self.hashpower)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

/// SLRU-specific parameters: the number of cascading tiers.
#[derive(Clone, Copy)]
pub struct SlruParams {
    n_seg: usize,
}

impl SlruParams {
    /// Creates parameters for an SLRU with `n_seg` tiers.
    ///
    /// # Panics
    /// Panics if `n_seg` is 0.
    pub fn new(n_seg: usize) -> Self {
        assert!(n_seg > 0, "n_seg must be non-zero");
        Self { n_seg }
    }

    /// Number of ordered tiers.
    pub fn n_seg(&self) -> usize {
        self.n_seg
    }
}

impl core::fmt::Debug for SlruParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlruParams")
            .field("n_seg", &self.n_seg)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_params_defaults() {
        let params = CommonCacheParams::new(NonZeroU64::new(1000).unwrap());
        assert_eq!(params.cache_size().get(), 1000);
        assert_eq!(params.per_obj_overhead(), 0);
        assert_eq!(params.hashpower(), 10);
        assert_eq!(params.default_ttl(), None);
    }

    #[test]
    fn common_params_builder_methods() {
        let params = CommonCacheParams::new(NonZeroU64::new(1000).unwrap())
            .with_per_obj_overhead(8)
            .with_hashpower(6)
            .with_default_ttl(3600);
        assert_eq!(params.per_obj_overhead(), 8);
        assert_eq!(params.hashpower(), 6);
        assert_eq!(params.default_ttl(), Some(3600));
    }

    #[test]
    #[should_panic(expected = "hashpower must be non-zero")]
    fn zero_hashpower_panics() {
        CommonCacheParams::new(NonZeroU64::new(1000).unwrap()).with_hashpower(0);
    }

    #[test]
    fn slru_params_n_seg() {
        let params = SlruParams::new(3);
        assert_eq!(params.n_seg(), 3);
    }

    #[test]
    #[should_panic(expected = "n_seg must be non-zero")]
    fn zero_n_seg_panics() {
        SlruParams::new(0);
    }
}
