use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::models::MedicationInfo;

struct CacheEntry {
    value: MedicationInfo,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Thread-safe LRU cache of resolved medication records.
///
/// Keys are normalized medication names (see `models::normalize_name`).
/// Entries expire lazily: an expired entry is dropped by the `get` that
/// finds it. Clones share one table.
#[derive(Clone)]
pub struct MedicationCache {
    entries: Arc<Mutex<LruCache<String, CacheEntry>>>,
}

impl MedicationCache {
    /// Capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<MedicationInfo> {
        let mut entries = self.lock();
        let now = Instant::now();

        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        None
    }

    /// Insert or replace. If the cache is full the least recently used entry goes.
    pub fn put(&self, key: impl Into<String>, value: MedicationInfo, ttl: Duration) {
        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
            ttl,
        };
        self.lock().put(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
