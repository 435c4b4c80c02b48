mod file;

use std::{
  num::NonZeroUsize,
  sync::RwLock,
  time::{Duration, Instant},
};

use lru::LruCache;

use crate::error::CacheWriteError;

pub use file::FileCache;

/// Key-value store with per-entry expiration used by the feed loader.
///
/// Every entry lives under a namespace so that one loader can drop all
/// of its entries at once without touching anyone else's.
pub trait ContentCache: Send + Sync {
  fn load(&self, namespace: &str, key: &str) -> Option<Vec<u8>>;

  fn save(
    &self,
    namespace: &str,
    key: &str,
    value: &[u8],
    ttl: Duration,
  ) -> Result<(), CacheWriteError>;

  fn clear(&self, namespace: &str);
}

struct Timed<T> {
  value: T,
  expires: Instant,
}

/// In-process LRU cache. Entries expire individually and the least
/// recently used entry is evicted once `max_entries` is reached.
pub struct MemoryCache {
  map: RwLock<LruCache<(String, String), Timed<Vec<u8>>>>,
}

impl MemoryCache {
  pub fn new(max_entries: usize) -> Self {
    let max_entries = max_entries.try_into().unwrap_or(NonZeroUsize::MIN);
    Self {
      map: RwLock::new(LruCache::new(max_entries)),
    }
  }

  pub fn len(&self) -> usize {
    self.map.read().map(|map| map.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for MemoryCache {
  fn default() -> Self {
    Self::new(64)
  }
}

impl ContentCache for MemoryCache {
  fn load(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
    let mut map = self.map.write().ok()?;
    let cache_key = (namespace.to_string(), key.to_string());
    let entry = map.get(&cache_key)?;
    if entry.expires <= Instant::now() {
      map.pop(&cache_key);
      return None;
    }
    Some(entry.value.clone())
  }

  fn save(
    &self,
    namespace: &str,
    key: &str,
    value: &[u8],
    ttl: Duration,
  ) -> Result<(), CacheWriteError> {
    let timed = Timed {
      value: value.to_vec(),
      expires: Instant::now() + ttl,
    };
    let mut map = self
      .map
      .write()
      .map_err(|e| CacheWriteError::new(key, e))?;
    map.push((namespace.to_string(), key.to_string()), timed);
    Ok(())
  }

  fn clear(&self, namespace: &str) {
    let Ok(mut map) = self.map.write() else {
      return;
    };
    let keys: Vec<_> = map
      .iter()
      .filter(|((ns, _), _)| ns == namespace)
      .map(|(k, _)| k.clone())
      .collect();
    for key in keys {
      map.pop(&key);
    }
  }
}
