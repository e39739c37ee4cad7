//! In-memory LRU cache with per-entry expiry and a tag index.

use std::{
    collections::{HashMap, HashSet},
    num::NonZeroUsize,
    sync::{Mutex, MutexGuard},
    time::Instant,
};

use bytes::Bytes;
use lru::LruCache;
use rpcgate_traits::{Cache, CacheError};
use rpcgate_types::CacheTag;

/// Capacity used when zero is requested.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Entry in the memory cache.
struct CacheEntry {
    value: Bytes,
    tag: String,
    expires_at: Instant,
}

#[derive(Default)]
struct TagIndex(HashMap<String, HashSet<String>>);

impl TagIndex {
    fn insert(&mut self, tag: &str, key: &str) {
        self.0.entry(tag.to_string()).or_default().insert(key.to_string());
    }

    fn remove(&mut self, tag: &str, key: &str) {
        if let Some(keys) = self.0.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                self.0.remove(tag);
            }
        }
    }

    fn take(&mut self, tag: &str) -> HashSet<String> {
        self.0.remove(tag).unwrap_or_default()
    }
}

struct Inner {
    entries: LruCache<String, CacheEntry>,
    tags: TagIndex,
}

impl Inner {
    fn evict(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.tags.remove(&entry.tag, key);
        Some(entry)
    }
}

/// In-memory LRU cache.
///
/// Every entry carries the tag it was stored under; [`Cache::purge`] drops all
/// entries of a tag at once. Expired entries are dropped lazily on access.
pub struct MemoryCache {
    inner: Mutex<Inner>,
}

impl MemoryCache {
    /// Create a new memory cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            inner: Mutex::new(Inner { entries: LruCache::new(capacity), tags: TagIndex::default() }),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or_default()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live keys grouped under `tag`.
    pub fn tagged(&self, tag: &str) -> usize {
        self.lock().map(|inner| inner.tags.0.get(tag).map_or(0, HashSet::len)).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, CacheError> {
        self.inner.lock().map_err(|e| CacheError(format!("lock poisoned: {e}")))
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").field("len", &self.len()).finish_non_exhaustive()
    }
}

impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut inner = self.lock()?;

        if let Some(entry) = inner.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            inner.evict(key);
        }

        Ok(None)
    }

    async fn put(&self, key: &str, value: Bytes, tag: &CacheTag) -> Result<(), CacheError> {
        let mut inner = self.lock()?;

        let entry = CacheEntry {
            value,
            tag: tag.tag.clone(),
            expires_at: Instant::now() + tag.ttl,
        };

        // `push` hands back either the replaced entry of `key` or the evicted
        // least recently used one.
        if let Some((old_key, old)) = inner.entries.push(key.to_string(), entry) {
            inner.tags.remove(&old.tag, &old_key);
        }
        inner.tags.insert(&tag.tag, key);
        Ok(())
    }

    async fn purge(&self, tag: &str) -> Result<usize, CacheError> {
        let mut inner = self.lock()?;

        let keys = inner.tags.take(tag);
        let removed = keys.iter().filter(|key| inner.entries.pop(key.as_str()).is_some()).count();
        trace!(tag, removed, "purged cache tag");
        Ok(removed)
    }
}
