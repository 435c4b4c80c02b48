use std::{
  fs,
  io::Write,
  path::{Path, PathBuf},
  time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ContentCache;
use crate::error::CacheWriteError;

/// Cache persisted on disk, one JSON document per entry.
///
/// Layout: `<root>/<namespace>/<blake3(key)>.json`.
pub struct FileCache {
  root: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct Entry {
  key: String,
  expires_at: DateTime<Utc>,
  value: String,
}

impl FileCache {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn namespace_dir(&self, namespace: &str) -> PathBuf {
    self.root.join(sanitize_namespace(namespace))
  }

  fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
    let name = blake3::hash(key.as_bytes()).to_hex();
    self
      .namespace_dir(namespace)
      .join(format!("{}.json", name.as_str()))
  }

  fn read_entry(path: &Path) -> Option<Entry> {
    let content = fs::read(path).ok()?;
    serde_json::from_slice(&content).ok()
  }
}

impl ContentCache for FileCache {
  fn load(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
    let path = self.entry_path(namespace, key);
    let entry = Self::read_entry(&path)?;

    if entry.key != key {
      return None;
    }

    if entry.expires_at <= Utc::now() {
      let _ = fs::remove_file(&path);
      return None;
    }

    BASE64.decode(entry.value).ok()
  }

  fn save(
    &self,
    namespace: &str,
    key: &str,
    value: &[u8],
    ttl: Duration,
  ) -> Result<(), CacheWriteError> {
    let err = |e: &dyn std::fmt::Display| CacheWriteError::new(key, e);

    let ttl = chrono::Duration::from_std(ttl).map_err(|e| err(&e))?;
    let entry = Entry {
      key: key.to_string(),
      expires_at: Utc::now() + ttl,
      value: BASE64.encode(value),
    };
    let content = serde_json::to_vec(&entry).map_err(|e| err(&e))?;

    let dir = self.namespace_dir(namespace);
    fs::create_dir_all(&dir).map_err(|e| err(&e))?;

    // write to a temporary file first so readers never see half an entry
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| err(&e))?;
    tmp.write_all(&content).map_err(|e| err(&e))?;
    tmp
      .persist(self.entry_path(namespace, key))
      .map_err(|e| err(&e))?;

    Ok(())
  }

  fn clear(&self, namespace: &str) {
    let dir = self.namespace_dir(namespace);
    if !dir.exists() {
      return;
    }

    if let Err(e) = fs::remove_dir_all(&dir) {
      warn!("failed to clear cache namespace {}: {}", namespace, e);
    }
  }
}

fn sanitize_namespace(namespace: &str) -> String {
  namespace
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect()
}

#[cfg(test)]
mod test {
  use super::*;

  const HOUR: Duration = Duration::from_secs(3600);

  #[test]
  fn test_roundtrip_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    FileCache::new(dir.path())
      .save("ns", "https://example.com/feed", b"<rss/>", HOUR)
      .unwrap();

    let cache = FileCache::new(dir.path());
    assert_eq!(
      cache.load("ns", "https://example.com/feed").as_deref(),
      Some(&b"<rss/>"[..])
    );
    assert!(cache.load("ns", "https://example.com/other").is_none());
  }

  #[test]
  fn test_expired_entry_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let cache = FileCache::new(dir.path());
    cache.save("ns", "k", b"v", Duration::ZERO).unwrap();

    assert!(cache.load("ns", "k").is_none());
    assert!(!cache.entry_path("ns", "k").exists());
  }

  #[test]
  fn test_clear_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let cache = FileCache::new(dir.path());
    cache.save("feed", "k", b"v", HOUR).unwrap();
    cache.save("other", "k", b"w", HOUR).unwrap();

    cache.clear("feed");
    cache.clear("missing");

    assert!(cache.load("feed", "k").is_none());
    assert_eq!(cache.load("other", "k").as_deref(), Some(&b"w"[..]));
  }

  #[test]
  fn test_unwritable_root_is_cache_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let cache = FileCache::new(&blocker);
    let err = cache.save("ns", "k", b"v", HOUR).unwrap_err();
    assert_eq!(err.key, "k");
  }

  #[test]
  fn test_namespace_is_sanitized() {
    assert_eq!(sanitize_namespace("../etc"), "___etc");
    assert_eq!(sanitize_namespace("wordpress-post-feed"), "wordpress-post-feed");
  }
}
