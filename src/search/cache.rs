use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::models::RankedResultSet;

/// Short-lived store of finished result sets keyed by query signature.
///
/// `get` and `set` are independent calls: two identical requests that miss
/// at the same time both run the pipeline and the later write wins.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Option<RankedResultSet>;
    fn set(&self, key: String, value: RankedResultSet, ttl: Duration);
}

struct CacheEntry {
    value: RankedResultSet,
    expires_at: Instant,
}

/// In-process TTL cache. Expired entries are dropped lazily when read.
#[derive(Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for TtlCache {
    fn get(&self, key: &str) -> Option<RankedResultSet> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        entries.remove(key);
        None
    }

    fn set(&self, key: String, value: RankedResultSet, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let expires_at = Instant::now() + ttl;
        self.entries
            .lock()
            .insert(key, CacheEntry { value, expires_at });
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(&self, _key: &str) -> Option<RankedResultSet> {
        None
    }

    fn set(&self, _key: String, _value: RankedResultSet, _ttl: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StrategyUsed;

    fn result(total: usize) -> RankedResultSet {
        RankedResultSet {
            documents: Vec::new(),
            total,
            page: 1,
            page_size: 10,
            has_more: false,
            strategy: StrategyUsed::Primary,
            expanded_terms: Some(vec!["pizza".to_string()]),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new();
        cache.set("k".to_string(), result(3), Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get("k").map(|r| r.total), Some(3));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").is_none());
        // lazily removed on the expired read
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_supersedes_previous_value() {
        let cache = TtlCache::new();
        cache.set("k".to_string(), result(1), Duration::from_secs(30));
        cache.set("k".to_string(), result(2), Duration::from_secs(30));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k").map(|r| r.total), Some(2));
    }

    #[test]
    fn test_zero_ttl_is_not_stored() {
        let cache = TtlCache::new();
        cache.set("k".to_string(), result(1), Duration::ZERO);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_noop_cache_never_hits() {
        let cache = NoopCache;
        cache.set("k".to_string(), result(1), Duration::from_secs(30));
        assert!(cache.get("k").is_none());
    }
}
