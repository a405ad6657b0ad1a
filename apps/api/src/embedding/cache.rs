//! Persistent text → embedding cache keyed by content digest.
//!
//! The whole map lives in memory and is rewritten in full after each insert.
//! Entries are never updated or evicted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::embedding::EmbeddingError;
use crate::hashing::content_digest;
use crate::persist::write_atomic;

pub struct EmbeddingCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Opens the cache file, starting empty if it is missing or unreadable.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, Vec<f32>>>(&bytes) {
                Ok(map) => {
                    info!("Loaded {} cached embeddings from {}", map.len(), path.display());
                    map
                }
                Err(e) => {
                    error!("Embedding cache at {} is corrupt, starting empty: {e}", path.display());
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                error!("Failed to read embedding cache {}: {e}", path.display());
                HashMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = content_digest(text);
        let hit = self.entries.lock().get(&key).cloned();
        if hit.is_some() {
            debug!("Embedding cache hit for {}", &key[..12]);
        }
        hit
    }

    /// Inserts a vector and rewrites the file. An existing key is left untouched.
    pub fn put(&self, text: &str, vector: Vec<f32>) -> Result<(), EmbeddingError> {
        let key = content_digest(text);
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return Ok(());
        }
        entries.insert(key, vector);
        debug!("Embedding cache miss stored ({} entries)", entries.len());

        // Serialise while holding the lock so concurrent writers cannot interleave files.
        let bytes = serde_json::to_vec(&*entries).map_err(|e| EmbeddingError::Persist(e.to_string()))?;
        write_atomic(&self.path, &bytes).map_err(|e| EmbeddingError::Persist(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the current map to disk. Called on shutdown.
    pub fn flush(&self) -> Result<(), EmbeddingError> {
        let entries = self.entries.lock();
        let bytes = serde_json::to_vec(&*entries).map_err(|e| EmbeddingError::Persist(e.to_string()))?;
        write_atomic(&self.path, &bytes).map_err(|e| EmbeddingError::Persist(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(dir.path().join("cache.json"));
        assert!(cache.get("python, rust").is_none());

        cache.put("python, rust", vec![0.25, -1.5, 3.0]).unwrap();
        assert_eq!(cache.get("python, rust"), Some(vec![0.25, -1.5, 3.0]));
    }

    #[test]
    fn test_entries_are_immutable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(dir.path().join("cache.json"));
        cache.put("text", vec![1.0]).unwrap();
        cache.put("text", vec![2.0]).unwrap();
        assert_eq!(cache.get("text"), Some(vec![1.0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reload_is_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let vector = vec![0.1_f32, 1.0 / 3.0, -7.123_456_7, f32::MIN_POSITIVE];
        {
            let cache = EmbeddingCache::open(&path);
            cache.put("experience section", vector.clone()).unwrap();
        }

        let reopened = EmbeddingCache::open(&path);
        let loaded = reopened.get("experience section").unwrap();
        let bits: Vec<u32> = loaded.iter().map(|f| f.to_bits()).collect();
        let expected: Vec<u32> = vector.iter().map(|f| f.to_bits()).collect();
        assert_eq!(bits, expected);
    }

    #[test]
    fn test_file_keys_are_digests_not_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = EmbeddingCache::open(&path);
        cache.put("secret resume text", vec![1.0]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret resume text"));
        assert!(raw.contains(&content_digest("secret resume text")));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"not json").unwrap();
        let cache = EmbeddingCache::open(&path);
        assert!(cache.is_empty());
    }
}
