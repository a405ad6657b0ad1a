//! Resume Vector Store: one vector per (candidate, section).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::candidate::ResumeSection;
use crate::vector_store::{Snapshot, StorePaths, VectorStoreError};

const STORE_STEM: &str = "resume_vectors";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub candidate_id: String,
    pub section: ResumeSection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionHit {
    pub record: SectionRecord,
    pub distance: f32,
}

struct Inner {
    snapshot: Snapshot<SectionRecord>,
    keys: HashSet<(String, ResumeSection)>,
}

pub struct ResumeVectorStore {
    paths: StorePaths,
    inner: Mutex<Inner>,
}

impl ResumeVectorStore {
    pub fn open(dir: &Path, dimension: usize) -> Self {
        let paths = StorePaths::new(dir, STORE_STEM);
        let snapshot: Snapshot<SectionRecord> = Snapshot::load(&paths, dimension);
        let keys = snapshot
            .metadata
            .iter()
            .map(|r| (r.candidate_id.clone(), r.section))
            .collect();
        Self {
            paths,
            inner: Mutex::new(Inner { snapshot, keys }),
        }
    }

    /// Stores a section vector. Returns `false` (and writes nothing) if the pair already exists.
    pub fn add_section(
        &self,
        candidate_id: &str,
        section: ResumeSection,
        vector: &[f32],
    ) -> Result<bool, VectorStoreError> {
        let mut inner = self.inner.lock();
        let key = (candidate_id.to_string(), section);
        if inner.keys.contains(&key) {
            debug!("Vector already exists for {candidate_id} - {}, skipping", section.as_str());
            return Ok(false);
        }

        inner.snapshot.push(
            vector,
            SectionRecord {
                candidate_id: candidate_id.to_string(),
                section,
            },
        )?;
        inner.keys.insert(key);
        inner.snapshot.save(&self.paths)?;
        info!("Indexed {candidate_id} - {}", section.as_str());
        Ok(true)
    }

    pub fn contains(&self, candidate_id: &str, section: ResumeSection) -> bool {
        self.inner
            .lock()
            .keys
            .contains(&(candidate_id.to_string(), section))
    }

    /// Reconstructs every stored section vector for one candidate.
    pub fn section_vectors(&self, candidate_id: &str) -> HashMap<ResumeSection, Vec<f32>> {
        let inner = self.inner.lock();
        inner
            .snapshot
            .metadata
            .iter()
            .enumerate()
            .filter(|(_, r)| r.candidate_id == candidate_id)
            .filter_map(|(i, r)| {
                inner
                    .snapshot
                    .index
                    .reconstruct(i)
                    .map(|v| (r.section, v.to_vec()))
            })
            .collect()
    }

    /// Raw-L2 nearest sections across all candidates.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SectionHit> {
        let inner = self.inner.lock();
        inner
            .snapshot
            .index
            .search(query, k)
            .into_iter()
            .filter_map(|(i, distance)| {
                inner.snapshot.metadata.get(i).map(|record| SectionHit {
                    record: record.clone(),
                    distance,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
