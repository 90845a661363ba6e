//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key derivation, round-trips, fail-open behaviour and
//! the eviction bound.

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::cache::{
    eviction_quota, rank_for_eviction, CacheAnalytics, CacheBackend, CacheCategory, CacheClient,
    CacheStore, ClientOptions, KeyBuilder, MemoryBackend, StoreOptions,
};

// == Strategies ==
/// Flat parameter objects like the ones listing and search handlers build.
fn params_strategy() -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map(
        "[a-zA-Z]{1,12}",
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            "[a-z ]{0,16}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            Just(Value::Null),
        ],
        0..8,
    )
}

fn object_in_order(entries: &[(String, Value)]) -> Value {
    let mut map = Map::new();
    for (key, value) in entries {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn memory_store(backend: Arc<MemoryBackend>) -> Arc<CacheStore> {
    let backend: Arc<dyn CacheBackend> = backend;
    let client = Arc::new(CacheClient::with_backend(backend, ClientOptions::default()));
    Arc::new(CacheStore::new(client, StoreOptions::default()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Deep-equal parameter sets produce the same key whatever the insertion order.
    #[test]
    fn prop_key_ignores_insertion_order(params in params_strategy(), seed in any::<u64>()) {
        let forward: Vec<(String, Value)> = params.into_iter().collect();
        let mut shuffled = forward.clone();
        // deterministic rotation plus reversal
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
        }
        shuffled.reverse();

        let keys = KeyBuilder::new("ns", "v1");
        let a = keys.build_key(CacheCategory::Paginated, &object_in_order(&forward)).unwrap();
        let b = keys.build_key(CacheCategory::Paginated, &object_in_order(&shuffled)).unwrap();
        prop_assert_eq!(a, b);
    }

    // Different canonical parameter sets get different keys (collisions are
    // possible in principle but vanishingly rare at this sample size).
    #[test]
    fn prop_distinct_params_distinct_keys(a in params_strategy(), b in params_strategy()) {
        prop_assume!(a != b);

        let keys = KeyBuilder::new("ns", "v1");
        let ka = keys.build_key(CacheCategory::Search, &a).unwrap();
        let kb = keys.build_key(CacheCategory::Search, &b).unwrap();
        prop_assert_ne!(ka, kb);
    }

    // Keys always follow `{namespace}:{version}:{category}:{8 hex}`.
    #[test]
    fn prop_key_shape(params in params_strategy()) {
        let key = KeyBuilder::new("ns", "v1").build_key(CacheCategory::Count, &params).unwrap();
        let digest = key.strip_prefix("ns:v1:count:").unwrap();

        prop_assert_eq!(digest.len(), 8);
        prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // set followed by get returns an equal value.
    #[test]
    fn prop_roundtrip(params in params_strategy(), ttl in 1u64..86_400) {
        let store = memory_store(Arc::new(MemoryBackend::new()));
        let value = Value::Object(params.into_iter().collect());

        let cached: Option<Value> = runtime().block_on(async {
            prop_assert!(store.set("ns:v1:search:k", &value, ttl).await);
            Ok(store.get("ns:v1:search:k").await)
        })?;
        prop_assert_eq!(cached, Some(value));
    }

    // An unreachable backend never errors: get misses, set reports false.
    #[test]
    fn prop_outage_fails_open(key in "[a-z:]{1,32}", value in "[a-z]{0,32}") {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_available(false);
        let store = memory_store(backend);

        runtime().block_on(async {
            let cached: Option<String> = store.get(&key).await;
            prop_assert!(cached.is_none());
            prop_assert!(!store.set(&key, &value, 60).await);
            Ok(())
        })?;
    }

    // Ranking never invents keys and never keeps absent ones.
    #[test]
    fn prop_rank_keeps_present_keys(ttls in prop::collection::vec(-2i64..1000, 0..40)) {
        let keys: Vec<String> = (0..ttls.len()).map(|i| format!("k{}", i)).collect();
        let present = ttls.iter().filter(|t| **t != -2).count();

        let ranked = rank_for_eviction(keys, &ttls);
        prop_assert_eq!(ranked.len(), present);
        prop_assert!(eviction_quota(present) <= present);
    }
}

// Eviction runs against a real backend; fewer cases keep the suite quick.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(25))]

    // Eviction removes at most ceil(25%) of eligible keys and never a protected one.
    #[test]
    fn prop_eviction_bound(
        low in prop::collection::vec(1u64..10_000, 0..60),
        protected in 0usize..10,
    ) {
        let backend = Arc::new(MemoryBackend::new());
        let keys = KeyBuilder::new("ns", "v1");
        let store = memory_store(backend.clone());
        let analytics = CacheAnalytics::new(store, keys.clone());

        let evicted = runtime().block_on(async {
            let mut protected_keys = HashSet::new();
            for (i, ttl) in low.iter().enumerate() {
                backend
                    .set_ex(&keys.for_id(CacheCategory::Paginated, i), "[]", *ttl)
                    .await
                    .unwrap();
            }
            for i in 0..protected {
                let key = keys.for_id(CacheCategory::Count, i);
                backend.set_ex(&key, "1", 3600).await.unwrap();
                protected_keys.insert(key);
            }

            let evicted = analytics.evict_low_priority().await;

            for key in &protected_keys {
                prop_assert!(backend.exists(key).await.unwrap(), "protected key {} evicted", key);
            }
            Ok(evicted)
        })?;

        prop_assert!(evicted as usize <= low.len().div_ceil(4));
        prop_assert_eq!(evicted as usize, eviction_quota(low.len()));
    }
}
