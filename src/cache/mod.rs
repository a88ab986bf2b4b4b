//! Metadata cache: bounded, TTL'd lookup of a type's unique and notify
//! field lists by slug.
//!
//! Used only on the object store's insert path to default `notify_fields`.
//! Update paths must never consult it for unique-field checks. Entries
//! expire by TTL and are explicitly invalidated by every type-mutating
//! operation; capacity is bounded with oldest-entry eviction. Starts empty;
//! no teardown beyond process exit.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cached field lists for one registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFieldLists {
    /// Fields whose combined value must be unique
    pub unique_fields: Vec<String>,
    /// Fields flagged for downstream notification
    pub notify_fields: Vec<String>,
}

/// Cache bounds.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum number of cached slugs
    pub capacity: usize,
    /// Entry lifetime
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            ttl: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Entry {
    lists: TypeFieldLists,
    inserted_at: Instant,
}

/// Process-wide metadata cache. Explicitly constructed and injected; never
/// a module-level singleton.
#[derive(Debug)]
pub struct MetadataCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MetadataCache {
    /// Creates an empty cache with the given bounds.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the cached lists for a slug, dropping the entry when expired.
    pub fn get(&self, slug: &str) -> Option<TypeFieldLists> {
        let mut entries = self.lock();
        match entries.get(slug) {
            Some(entry) if entry.inserted_at.elapsed() < self.config.ttl => {
                Some(entry.lists.clone())
            }
            Some(_) => {
                entries.remove(slug);
                None
            }
            None => None,
        }
    }

    /// Stores the lists for a slug, evicting the oldest entry at capacity.
    pub fn put(&self, slug: &str, lists: TypeFieldLists) {
        let mut entries = self.lock();
        if !entries.contains_key(slug) && entries.len() >= self.config.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }
        entries.insert(
            slug.to_string(),
            Entry {
                lists,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drops the entry for a slug. Called synchronously at the end of every
    /// type-mutating operation.
    pub fn invalidate(&self, slug: &str) {
        self.lock().remove(slug);
    }

    /// Number of live entries (expired entries included until touched).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
