//! Product-knowledge cache shared across enrichment calls.
//!
//! Keyed by `(vendor, name)`. Advisory only: a lost or stale entry costs a
//! capability call, never correctness, so concurrent population races are
//! resolved last-write-wins. Passed by reference into pipeline runs so
//! tests can inject a fresh instance.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::capabilities::SearchHitMetadata;
use crate::config::CacheConfig;

/// One cached knowledge entry.
#[derive(Debug, Clone)]
pub struct KnowledgeEntry {
    pub metadata: SearchHitMetadata,
    pub context: String,
}

struct Slot {
    entry: KnowledgeEntry,
    inserted_at: Instant,
}

/// Bounded TTL cache for product knowledge.
pub struct KnowledgeCache {
    config: CacheConfig,
    slots: Mutex<HashMap<(String, String), Slot>>,
}

impl KnowledgeCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a live entry; expired entries are removed on access.
    pub fn get(&self, vendor: &str, name: &str) -> Option<KnowledgeEntry> {
        let key = (vendor.to_lowercase(), name.to_lowercase());
        let mut slots = self.slots.lock().ok()?;
        let expired = match slots.get(&key) {
            Some(slot) if slot.inserted_at.elapsed() < self.config.ttl => {
                return Some(slot.entry.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            slots.remove(&key);
        }
        None
    }

    /// Insert or overwrite (last write wins). When the cache is full the
    /// oldest entry is evicted.
    pub fn put(&self, vendor: &str, name: &str, entry: KnowledgeEntry) {
        let key = (vendor.to_lowercase(), name.to_lowercase());
        let Ok(mut slots) = self.slots.lock() else {
            return;
        };
        if slots.len() >= self.config.max_entries && !slots.contains_key(&key) {
            if let Some(oldest) = slots
                .iter()
                .min_by_key(|(_, s)| s.inserted_at)
                .map(|(k, _)| k.clone())
            {
                slots.remove(&oldest);
            }
        }
        slots.insert(
            key,
            Slot {
                entry,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
