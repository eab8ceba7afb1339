//! Property-based tests for `Slru`.
//!
//! Complements the example-driven scenarios in `correctness_tests.rs` with
//! randomized operation sequences, checking invariants that should hold
//! after *every* step rather than just a handful of hand-picked ones.

use cache_core::{CommonCacheParams, Request, Slru, SlruParams};
use core::num::NonZeroU64;
use proptest::prelude::*;

const OBJECT_SIZE: u64 = 10;

fn make(cache_size: u64, n_seg: usize) -> Slru<u64> {
    let common = CommonCacheParams::new(NonZeroU64::new(cache_size).unwrap());
    let policy = SlruParams::new(n_seg);
    Slru::from_params(common, policy).unwrap()
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Insert(u64),
    Check(u64),
    Remove(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..20).prop_map(Op::Insert),
        (0u64..20).prop_map(Op::Check),
        (0u64..20).prop_map(Op::Remove),
    ]
}

proptest! {
    /// Across any mix of inserts, checks (with promotion), and removals, a
    /// cache never holds more bytes of fixed-size objects than its
    /// configured capacity allows, no matter how tier boundaries or
    /// promotions shuffle residency underneath.
    #[test]
    fn occupied_bytes_never_exceed_capacity(
        n_seg in 1usize..5,
        ops in proptest::collection::vec(op_strategy(), 0..300),
    ) {
        let cache_size = 50 * OBJECT_SIZE;
        let mut cache = make(cache_size, n_seg);
        for op in ops {
            match op {
                Op::Insert(id) => cache.insert(Request::new(id, OBJECT_SIZE), id, 0),
                Op::Check(id) => { cache.check(id, true, 0); }
                Op::Remove(id) => { cache.remove(id); }
            }
            prop_assert!(cache.len() as u64 * OBJECT_SIZE <= cache_size);
        }
    }

    /// `insert(k)` followed immediately by `remove(k)` always leaves `k`
    /// absent, regardless of tier count or how many other objects share the
    /// cache.
    #[test]
    fn insert_then_remove_is_a_miss(
        n_seg in 1usize..5,
        id in 0u64..1000,
        filler in proptest::collection::vec(0u64..1000, 0..20),
    ) {
        let mut cache = make(200 * OBJECT_SIZE, n_seg);
        for f in filler {
            cache.insert(Request::new(f, OBJECT_SIZE), f, 0);
        }
        cache.insert(Request::new(id, OBJECT_SIZE), id, 0);
        cache.remove(id);
        prop_assert!(cache.check(id, false, 0).is_miss());
    }

    /// A solitary object repeatedly hit enough times to climb every tier
    /// stays resident and keeps hitting — nothing else is contending for
    /// its slot, so it must stabilize in the hottest tier rather than being
    /// evicted along the way.
    #[test]
    fn repeated_hits_stabilize_a_solitary_object_in_the_top_tier(
        n_seg in 1usize..8,
    ) {
        let mut cache = make(100 * OBJECT_SIZE, n_seg);
        cache.insert(Request::new(1, OBJECT_SIZE), 1, 0);
        for _ in 0..n_seg {
            prop_assert!(cache.check(1, true, 0).is_hit());
        }
        prop_assert!(cache.check(1, true, 0).is_hit());
        prop_assert_eq!(cache.len(), 1);
    }
}
