//! Property-based tests for the connectivity cache.
//!
//! Uses proptest to verify invariants across random inputs:
//! - A connected pair is always a member
//! - A disconnected pair is never a member
//! - Any operation sequence matches a plain set model
//! - Mutating one channel never changes another

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chancache::{CallContext, ChannelCache, ConnectivityCache, MemorySetBackend};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
enum Op {
    Connect(String, String),
    Disconnect(String, String),
    Remove(String),
}

fn id() -> impl Strategy<Value = String> {
    // Small domain so operations collide often; includes the empty ID
    prop::sample::select(vec!["", "a", "b", "c", "chan:1", "dev-A"]).prop_map(str::to_string)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (id(), id()).prop_map(|(c, t)| Op::Connect(c, t)),
        (id(), id()).prop_map(|(c, t)| Op::Disconnect(c, t)),
        id().prop_map(Op::Remove),
    ]
}

fn cache() -> ConnectivityCache<MemorySetBackend> {
    ConnectivityCache::new(MemorySetBackend::new())
}

proptest! {
    /// Property: after connect, has_thing is true.
    #[test]
    fn prop_connect_then_member(c in ".{0,16}", t in ".{0,16}") {
        let member = tokio_test::block_on(async {
            let cache = cache();
            let ctx = CallContext::new();
            cache.connect(&ctx, &c, &t).await.unwrap();
            cache.has_thing(&ctx, &c, &t).await.unwrap()
        });
        prop_assert!(member);
    }

    /// Property: after disconnect, has_thing is false whether or not it was connected.
    #[test]
    fn prop_disconnect_then_not_member(c in ".{0,16}", t in ".{0,16}", connected in any::<bool>()) {
        let member = tokio_test::block_on(async {
            let cache = cache();
            let ctx = CallContext::new();
            if connected {
                cache.connect(&ctx, &c, &t).await.unwrap();
            }
            cache.disconnect(&ctx, &c, &t).await.unwrap();
            cache.has_thing(&ctx, &c, &t).await.unwrap()
        });
        prop_assert!(!member);
    }

    /// Property: connect on one channel never leaks into another.
    #[test]
    fn prop_channels_isolated(c1 in "[a-z]{1,8}", c2 in "[a-z]{1,8}", t in "[a-z0-9-]{1,8}") {
        prop_assume!(c1 != c2);
        let leaked = tokio_test::block_on(async {
            let cache = cache();
            let ctx = CallContext::new();
            cache.connect(&ctx, &c1, &t).await.unwrap();
            cache.has_thing(&ctx, &c2, &t).await.unwrap()
        });
        prop_assert!(!leaked);
    }

    /// Property: any operation sequence agrees with a set model.
    #[test]
    fn prop_matches_set_model(ops in prop::collection::vec(op(), 0..40)) {
        let (observed, expected) = tokio_test::block_on(async {
            let cache = cache();
            let ctx = CallContext::new();
            let mut model: HashMap<String, HashSet<String>> = HashMap::new();

            for op in &ops {
                match op {
                    Op::Connect(c, t) => {
                        cache.connect(&ctx, c, t).await.unwrap();
                        model.entry(c.clone()).or_default().insert(t.clone());
                    },
                    Op::Disconnect(c, t) => {
                        cache.disconnect(&ctx, c, t).await.unwrap();
                        if let Some(set) = model.get_mut(c) {
                            set.remove(t);
                        }
                    },
                    Op::Remove(c) => {
                        cache.remove(&ctx, c).await.unwrap();
                        model.remove(c);
                    },
                }
            }

            let ids = ["", "a", "b", "c", "chan:1", "dev-A"];
            let mut observed = Vec::new();
            let mut expected = Vec::new();
            for c in ids {
                for t in ids {
                    observed.push(cache.has_thing(&ctx, c, t).await.unwrap());
                    expected.push(model.get(c).is_some_and(|set| set.contains(t)));
                }
            }

            let non_empty = model.values().filter(|set| !set.is_empty()).count();
            prop_assert_eq!(cache.backend().key_count(), non_empty);
            Ok((observed, expected))
        })?;
        prop_assert_eq!(observed, expected);
    }
}
