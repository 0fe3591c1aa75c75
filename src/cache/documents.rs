use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use super::CacheEntry;
use crate::config::DocumentConfig;
use crate::models::OrderValueMatch;

/// Enrichment output for one document URL.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    pub values: Vec<OrderValueMatch>,
    pub snippet: String,
}

/// URL-keyed cache of successful document enrichments.
///
/// Bounded by entry count; when full, expired entries go first and then the
/// oldest ones.
pub struct DocumentCache {
    entries: RwLock<HashMap<String, CacheEntry<CachedDocument>>>,
    capacity: usize,
    ttl: Duration,
}

impl DocumentCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    pub fn from_config(config: &DocumentConfig) -> Self {
        Self::new(
            config.cache_entries,
            Duration::from_secs(config.cache_ttl_minutes * 60),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn get(&self, url: &str) -> Option<CachedDocument> {
        self.entries
            .read()
            .ok()
            .and_then(|guard| guard.get(url).and_then(|e| e.get()))
    }

    pub fn insert(&self, url: &str, document: CachedDocument) {
        if !self.is_enabled() {
            return;
        }
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(url.to_string(), CacheEntry::new(document, self.ttl));
            if guard.len() > self.capacity {
                guard.retain(|_, entry| !entry.is_expired());
            }
            while guard.len() > self.capacity {
                let oldest = guard
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(key) => guard.remove(&key),
                    None => break,
                };
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
