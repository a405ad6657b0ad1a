//! Append-only similarity indexes with positional metadata.
//!
//! Each store is a [`FlatIndex`] of raw vectors plus a metadata list where
//! entry `i` describes row `i`. Both halves are persisted together after every
//! mutation and restored together (or not at all) on open.

use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::persist::write_atomic;

pub mod evidence;
pub mod resume;
pub mod similarity;

pub use evidence::EvidenceVectorStore;
pub use resume::ResumeVectorStore;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector has dimension {actual}, index expects {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("vector store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector store file is corrupt: {0}")]
    Corrupt(String),
}

/// Exact brute-force index over raw (non-normalized) vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<usize, VectorStoreError> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.data.extend_from_slice(vector);
        Ok(self.len() - 1)
    }

    pub fn reconstruct(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// k nearest rows by Euclidean distance, closest first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if query.len() != self.dimension || k == 0 {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, row)| (i, similarity::l2_squared(query, row)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(8 + self.data.len() * 4);
        buf.put_u32_le(self.dimension as u32);
        buf.put_u32_le(self.len() as u32);
        for value in &self.data {
            buf.put_f32_le(*value);
        }
        buf
    }

    fn decode(mut bytes: &[u8]) -> Result<Self, VectorStoreError> {
        if bytes.remaining() < 8 {
            return Err(VectorStoreError::Corrupt("index header truncated".to_string()));
        }
        let dimension = bytes.get_u32_le() as usize;
        let count = bytes.get_u32_le() as usize;
        let expected = dimension * count * 4;
        if bytes.remaining() != expected {
            return Err(VectorStoreError::Corrupt(format!(
                "index body has {} bytes, header implies {expected}",
                bytes.remaining()
            )));
        }
        let mut data = Vec::with_capacity(dimension * count);
        while bytes.has_remaining() {
            data.push(bytes.get_f32_le());
        }
        Ok(Self { dimension, data })
    }
}

/// On-disk locations for one store's index and metadata halves.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
}

impl StorePaths {
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            index: dir.join(format!("{stem}.index")),
            metadata: dir.join(format!("{stem}.meta.json")),
        }
    }
}

/// An index and its parallel metadata list, kept in lockstep.
#[derive(Debug)]
pub(crate) struct Snapshot<M> {
    pub index: FlatIndex,
    pub metadata: Vec<M>,
}

impl<M: Serialize + DeserializeOwned> Snapshot<M> {
    pub fn empty(dimension: usize) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            metadata: Vec::new(),
        }
    }

    /// Restores both halves, or neither.
    pub fn load(paths: &StorePaths, dimension: usize) -> Self {
        let index_exists = paths.index.exists();
        let metadata_exists = paths.metadata.exists();
        if !index_exists && !metadata_exists {
            info!("Creating new vector index at {}", paths.index.display());
            return Self::empty(dimension);
        }
        if index_exists != metadata_exists {
            warn!(
                "Only one half of vector store {} exists, starting empty",
                paths.index.display()
            );
            return Self::empty(dimension);
        }

        match Self::read(paths) {
            Ok(snapshot) if snapshot.index.dimension() != dimension => {
                warn!(
                    "Vector store {} has dimension {}, expected {dimension}; starting empty",
                    paths.index.display(),
                    snapshot.index.dimension()
                );
                Self::empty(dimension)
            }
            Ok(snapshot) => {
                info!(
                    "Loaded vector index {} with {} rows",
                    paths.index.display(),
                    snapshot.metadata.len()
                );
                snapshot
            }
            Err(e) => {
                warn!("Failed to load vector store {}: {e}", paths.index.display());
                Self::empty(dimension)
            }
        }
    }

    fn read(paths: &StorePaths) -> Result<Self, VectorStoreError> {
        let index = FlatIndex::decode(&std::fs::read(&paths.index)?)?;
        let metadata: Vec<M> = serde_json::from_slice(&std::fs::read(&paths.metadata)?)
            .map_err(|e| VectorStoreError::Corrupt(e.to_string()))?;
        if index.len() != metadata.len() {
            return Err(VectorStoreError::Corrupt(format!(
                "index has {} rows but metadata has {}",
                index.len(),
                metadata.len()
            )));
        }
        Ok(Self { index, metadata })
    }

    pub fn save(&self, paths: &StorePaths) -> Result<(), VectorStoreError> {
        let metadata = serde_json::to_vec(&self.metadata).map_err(|e| VectorStoreError::Corrupt(e.to_string()))?;
        write_atomic(&paths.index, &self.index.encode())?;
        write_atomic(&paths.metadata, &metadata)?;
        Ok(())
    }

    /// Appends a row and its metadata; neither half changes if the vector is rejected.
    pub fn push(&mut self, vector: &[f32], meta: M) -> Result<usize, VectorStoreError> {
        let position = self.index.add(vector)?;
        self.metadata.push(meta);
        debug_assert_eq!(self.index.len(), self.metadata.len());
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_orders_by_l2() {
        let mut index = FlatIndex::new(2);
        index.add(&[10.0, 10.0]).unwrap();
        index.add(&[1.0, 1.0]).unwrap();
        index.add(&[0.0, 0.0]).unwrap();

        let hits = index.search(&[0.0, 0.0], 2);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_add_rejects_wrong_dimension() {
        let mut index = FlatIndex::new(3);
        assert!(matches!(
            index.add(&[1.0]),
            Err(VectorStoreError::Dimension { expected: 3, actual: 1 })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_reconstruct_returns_row() {
        let mut index = FlatIndex::new(2);
        index.add(&[1.0, 2.0]).unwrap();
        index.add(&[3.0, 4.0]).unwrap();
        assert_eq!(index.reconstruct(1), Some(&[3.0, 4.0][..]));
        assert_eq!(index.reconstruct(2), None);
    }

    #[test]
    fn test_snapshot_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::new(dir.path(), "test");
        let mut snapshot: Snapshot<String> = Snapshot::empty(2);
        snapshot.push(&[0.5, 1.5], "a".to_string()).unwrap();
        snapshot.push(&[2.5, 3.5], "b".to_string()).unwrap();
        snapshot.save(&paths).unwrap();

        let loaded: Snapshot<String> = Snapshot::load(&paths, 2);
        assert_eq!(loaded.metadata, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(loaded.index.reconstruct(1), Some(&[2.5, 3.5][..]));
    }

    #[test]
    fn test_missing_metadata_half_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::new(dir.path(), "test");
        let mut snapshot: Snapshot<String> = Snapshot::empty(2);
        snapshot.push(&[0.5, 1.5], "a".to_string()).unwrap();
        snapshot.save(&paths).unwrap();
        std::fs::remove_file(&paths.metadata).unwrap();

        let loaded: Snapshot<String> = Snapshot::load(&paths, 2);
        assert_eq!(loaded.len(), 0);
        assert!(loaded.index.is_empty());
    }

    #[test]
    fn test_count_mismatch_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::new(dir.path(), "test");
        let mut snapshot: Snapshot<String> = Snapshot::empty(2);
        snapshot.push(&[0.5, 1.5], "a".to_string()).unwrap();
        snapshot.save(&paths).unwrap();
        std::fs::write(&paths.metadata, br#"["a","b"]"#).unwrap();

        let loaded: Snapshot<String> = Snapshot::load(&paths, 2);
        assert_eq!(loaded.len(), 0);
    }

    #[test]
    fn test_rejected_push_keeps_halves_aligned() {
        let mut snapshot: Snapshot<String> = Snapshot::empty(2);
        assert!(snapshot.push(&[1.0, 2.0, 3.0], "bad".to_string()).is_err());
        assert_eq!(snapshot.len(), 0);
        assert_eq!(snapshot.index.len(), 0);
    }
}
