// Exercises the raw-pointer-heavy paths of `Slru`/`ConcurrentSlru` (tier
// promotion, cascading cooling, hash index splicing) under repeated churn.
//
// Run with: cargo +nightly miri test --test miri_pointer_safety

use cache_core::{CommonCacheParams, Request, Slru, SlruParams};
use core::num::NonZeroU64;

fn make(cache_size: u64, n_seg: usize) -> Slru<u64> {
    let common = CommonCacheParams::new(NonZeroU64::new(cache_size).unwrap());
    let policy = SlruParams::new(n_seg);
    Slru::from_params(common, policy).unwrap()
}

/// Promotion unlinks a node from one tier's list and index and splices it
/// into another's; repeating this many times over is the likeliest place to
/// catch a use-after-unlink or a stale `hash_next`/`lru_prev` pointer.
#[test]
fn repeated_promotion_does_not_corrupt_links() {
    let mut cache = make(400, 4);
    for i in 0..20u64 {
        cache.insert(Request::new(i, 10), i, 0);
    }
    for _ in 0..10 {
        for i in 0..20u64 {
            cache.check(i, true, 0);
        }
    }
    assert!(cache.len() <= 20);
}

/// Cooling recurses through tiers, evicting and re-inserting nodes; this
/// drives that recursion past a single level.
#[test]
fn cascading_cooling_under_churn() {
    let mut cache = make(100, 3);
    for i in 0..50u64 {
        cache.insert(Request::new(i, 10), i, 0);
        cache.check(i, true, 0);
    }
    assert!(cache.len() * 10 <= 100);
}

/// Hash index splicing on `insert`'s replace-in-place path (matching
/// `obj_id`): repeatedly overwriting the same id exercises the old node's
/// detach-and-return sequence.
#[test]
fn repeated_overwrite_of_same_id() {
    let mut cache = make(200, 2);
    for v in 0..100u64 {
        cache.insert(Request::new(1, 10), v, 0);
    }
    assert!(cache.check(1, false, 0).is_hit());
    assert_eq!(cache.len(), 1);
}

#[cfg(feature = "concurrent")]
#[test]
fn concurrent_promotion_under_miri() {
    use cache_core::ConcurrentSlru;
    use std::sync::Arc;
    use std::thread;

    let common = CommonCacheParams::new(NonZeroU64::new(400).unwrap());
    let cache = Arc::new(ConcurrentSlru::<u64>::from_params(common, SlruParams::new(3)).unwrap());
    let mut handles = Vec::new();
    for t in 0..2u64 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..10u64 {
                let id = t * 10 + i;
                cache.get(Request::new(id, 10), id, 0);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}
