use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use testweave_core::{GeneratedDataResult, GenerationRequest};

/// Cache key for a request: data type, scope and quality level. Record count
/// and request context do not participate.
pub fn cache_signature(request: &GenerationRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.data_type.as_bytes());
    hasher.update(b"|");
    hasher.update(request.generation_scope.name().as_bytes());
    hasher.update(b"|");
    hasher.update(request.quality_level.as_bytes());
    format!("cache_{}", hex::encode(hasher.finalize()))
}

/// A cached result and the time it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: GeneratedDataResult,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now < self.cached_at + ttl,
            Err(_) => true,
        }
    }
}

/// Capacity-bounded TTL cache of generation results.
///
/// When full, an insert of a new key evicts whichever entry the map yields
/// first; this is not LRU. Expired entries count as misses and are dropped
/// when looked up.
#[derive(Debug)]
pub struct GenerationCache {
    entries: DashMap<String, CacheEntry>,
    max_size: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GenerationCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_size,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, signature: &str) -> Option<GeneratedDataResult> {
        self.get_at(signature, Utc::now())
    }

    pub fn get_at(&self, signature: &str, now: DateTime<Utc>) -> Option<GeneratedDataResult> {
        let cached = self.entries.get(signature).map(|entry| entry.value().clone());
        match cached {
            Some(entry) if entry.is_valid_at(now, self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.result)
            }
            Some(_) => {
                self.entries
                    .remove_if(signature, |_, entry| !entry.is_valid_at(now, self.ttl));
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, signature: String, result: GeneratedDataResult) {
        self.insert_at(signature, result, Utc::now());
    }

    pub fn insert_at(&self, signature: String, result: GeneratedDataResult, now: DateTime<Utc>) {
        if self.max_size == 0 {
            return;
        }
        if !self.entries.contains_key(&signature) && self.entries.len() >= self.max_size {
            let victim = self.entries.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(
            signature,
            CacheEntry {
                result,
                cached_at: now,
            },
        );
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.entries.contains_key(signature)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Percentage of lookups that hit; 0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testweave_core::{DataRecord, GenerationScope};

    fn result(tag: &str) -> GeneratedDataResult {
        let mut record = DataRecord::new();
        record.insert("tag".to_string(), tag.into());
        GeneratedDataResult::success("req_test", vec![record])
    }

    #[test]
    fn signature_ignores_record_count_and_context() {
        let base = GenerationRequest::new("user");
        let other = GenerationRequest::new("user")
            .with_record_count(99)
            .with_context_value("userId", "u-1");
        assert_eq!(cache_signature(&base), cache_signature(&other));

        let scoped = GenerationRequest::new("user").with_scope(GenerationScope::Session);
        assert_ne!(cache_signature(&base), cache_signature(&scoped));
        assert!(cache_signature(&base).starts_with("cache_"));
        assert_eq!(cache_signature(&base).len(), "cache_".len() + 64);
    }

    #[test]
    fn expired_entries_miss_and_are_dropped() {
        let cache = GenerationCache::new(10, Duration::from_secs(60));
        let stored_at = Utc::now();
        cache.insert_at("k".to_string(), result("a"), stored_at);

        assert!(cache.get_at("k", stored_at + chrono::Duration::seconds(59)).is_some());
        assert!(cache.get_at("k", stored_at + chrono::Duration::seconds(60)).is_none());
        assert!(!cache.contains("k"));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hit_rate(), 50.0);
    }

    #[test]
    fn full_cache_evicts_one_entry_for_new_keys() {
        let cache = GenerationCache::new(2, Duration::from_secs(60));
        cache.insert("a".to_string(), result("a"));
        cache.insert("b".to_string(), result("b"));
        cache.insert("b".to_string(), result("b2"));
        assert_eq!(cache.len(), 2);

        cache.insert("c".to_string(), result("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_capacity_never_stores() {
        let cache = GenerationCache::new(0, Duration::from_secs(60));
        cache.insert("a".to_string(), result("a"));
        assert!(cache.is_empty());
    }
}
