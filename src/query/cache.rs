// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded TTL cache for idempotent query results.
//!
//! Keys are canonical: serde_json maps are ordered by key, so two requests
//! with the same params hash to the same entry no matter how the client
//! ordered its JSON. The cache is passive — entries expire on read, writes
//! are last-writer-wins, and nothing is invalidated or refreshed in the
//! background.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;

use crate::rpc::Params;

struct CacheEntry {
    result: Value,
    inserted_at: Instant,
}

pub struct QueryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl QueryCache {
    /// Create a cache holding at most `capacity` entries, each living for
    /// `ttl` after insertion.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Fetch the cached result for `(method, params)`, if fresh.
    pub fn retrieve(&self, method: &str, params: &Params) -> Option<Value> {
        let key = cache_key(method, params);
        let mut entries = self.entries.lock().ok()?;
        if let Some(entry) = entries.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.result.clone());
            }
            entries.pop(&key);
        }
        None
    }

    /// Store a result under `(method, params)`. Last writer wins.
    pub fn save(&self, method: &str, params: &Params, result: Value) {
        let key = cache_key(method, params);
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key,
                CacheEntry {
                    result,
                    inserted_at: Instant::now(),
                },
            );
        }
    }
}

/// Canonical cache key. serde_json's object maps are BTree-ordered, so the
/// serialization is stable across clients.
fn cache_key(method: &str, params: &Params) -> String {
    format!("{method}:{}", params.to_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => Params::ByName(map),
            Value::Null => Params::Absent,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn save_and_retrieve() {
        let cache = QueryCache::new(16, Duration::from_secs(60));
        let p = params(json!({"urls": ["a", "b"]}));

        assert!(cache.retrieve("resolve", &p).is_none());
        cache.save("resolve", &p, json!({"a": 1}));
        assert_eq!(cache.retrieve("resolve", &p), Some(json!({"a": 1})));
    }

    #[test]
    fn key_is_canonical_across_key_order() {
        let cache = QueryCache::new(16, Duration::from_secs(60));
        let first: Params =
            serde_json::from_str(r#"{"page": 1, "any_tags": ["music"]}"#).unwrap();
        let second: Params =
            serde_json::from_str(r#"{"any_tags": ["music"], "page": 1}"#).unwrap();

        cache.save("claim_search", &first, json!("hit"));
        assert_eq!(cache.retrieve("claim_search", &second), Some(json!("hit")));
    }

    #[test]
    fn method_is_part_of_the_key() {
        let cache = QueryCache::new(16, Duration::from_secs(60));
        let p = params(json!({"urls": ["a"]}));
        cache.save("resolve", &p, json!(1));
        assert!(cache.retrieve("claim_search", &p).is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = QueryCache::new(16, Duration::from_millis(1));
        let p = params(json!({"urls": ["a"]}));
        cache.save("resolve", &p, json!(1));

        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.retrieve("resolve", &p).is_none());
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = QueryCache::new(2, Duration::from_secs(60));
        for i in 0..3 {
            cache.save("resolve", &params(json!({ "urls": [i] })), json!(i));
        }
        // The oldest entry was evicted.
        assert!(cache
            .retrieve("resolve", &params(json!({"urls": [0]})))
            .is_none());
        assert!(cache
            .retrieve("resolve", &params(json!({"urls": [2]})))
            .is_some());
    }
}
