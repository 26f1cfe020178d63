//! Disk-backed cache of raw API responses.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Stable cache key for a parameter set.
///
/// Keys are sorted lexicographically before serialization, so two
/// semantically identical requests collide regardless of construction
/// order.
pub fn cache_key(params: &[(&str, &str)]) -> String {
    let map: BTreeMap<&str, &str> = params.iter().copied().collect();
    serde_json::to_string(&map).unwrap_or_default()
}

/// Durable key → response store for raw API payloads.
pub struct PageCache {
    path: PathBuf,
    entries: HashMap<String, Value>,
    dirty: bool,
    flush_every: usize,
    writes_since_flush: usize,
}

impl PageCache {
    /// Cache file path for an endpoint under the given directory.
    ///
    /// One file per configuration; the endpoint hash keeps different
    /// sources apart without encoding the URL into a filename.
    pub fn file_for(cache_dir: impl AsRef<Path>, endpoint: &str) -> PathBuf {
        let digest = Sha256::digest(endpoint.as_bytes());
        let tag = hex::encode(&digest[..6]);
        cache_dir.as_ref().join(format!("pages-{tag}.json"))
    }

    /// Load the cache eagerly. A missing or corrupt file starts empty; the
    /// cache is an optimization, never a reason to fail the pipeline.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        Self::load_with_flush_every(path, 25).await
    }

    /// Load with a custom flush cadence (stored responses per disk write).
    pub async fn load_with_flush_every(path: impl Into<PathBuf>, flush_every: usize) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, Value>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("Cache file {:?} is corrupt ({}), starting empty", path, e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                log::warn!("Cache file {:?} unreadable ({}), starting empty", path, e);
                HashMap::new()
            }
        };
        Self {
            path,
            entries,
            dirty: false,
            flush_every: flush_every.max(1),
            writes_since_flush: 0,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store a response and mark the cache dirty.
    pub fn insert(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
        self.dirty = true;
        self.writes_since_flush += 1;
    }

    /// Whether enough writes have accumulated to warrant a flush.
    pub fn wants_flush(&self) -> bool {
        self.writes_since_flush >= self.flush_every
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the store atomically (write to temp, then rename).
    ///
    /// No-op when nothing changed since the last save.
    pub async fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        self.dirty = false;
        self.writes_since_flush = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = cache_key(&[("action", "parse"), ("page", "France")]);
        let b = cache_key(&[("page", "France"), ("action", "parse")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_distinguishes_values() {
        let a = cache_key(&[("page", "France")]);
        let b = cache_key(&[("page", "Spain")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_file_for_is_stable() {
        let a = PageCache::file_for("cache", "https://en.wikivoyage.org/w/api.php");
        let b = PageCache::file_for("cache", "https://en.wikivoyage.org/w/api.php");
        let c = PageCache::file_for("cache", "https://de.wikivoyage.org/w/api.php");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pages.json");

        let mut cache = PageCache::load(&path).await;
        assert!(cache.is_empty());
        cache.insert("k1".to_string(), json!({"parse": {"title": "France"}}));
        cache.save().await.unwrap();

        let reloaded = PageCache::load(&path).await;
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.has("k1"));
        assert!(!reloaded.has("k2"));
        assert_eq!(reloaded.get("k1").unwrap()["parse"]["title"], "France");
    }

    #[tokio::test]
    async fn test_save_noop_when_clean() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pages.json");

        let mut cache = PageCache::load(&path).await;
        cache.save().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pages.json");

        let mut cache = PageCache::load(&path).await;
        cache.insert("k".to_string(), json!(1));
        cache.save().await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_flush_cadence() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pages.json");

        let mut cache = PageCache::load_with_flush_every(&path, 3).await;
        cache.insert("a".to_string(), json!(1));
        cache.insert("b".to_string(), json!(2));
        assert!(!cache.wants_flush());
        cache.insert("c".to_string(), json!(3));
        assert!(cache.wants_flush());

        cache.save().await.unwrap();
        assert!(!cache.wants_flush());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pages.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let cache = PageCache::load(&path).await;
        assert!(cache.is_empty());
    }
}
