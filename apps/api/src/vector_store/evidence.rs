//! Evidence Vector Store: chunked repository content per candidate, for
//! retrieval-augmented evidence lookup.
//!
//! The index is shared by all candidates; searches over-fetch and filter to the
//! requested candidate afterwards.

use std::collections::HashSet;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::embedding::EmbeddingService;
use crate::evidence::models::RepoContent;
use crate::vector_store::{Snapshot, StorePaths, VectorStoreError};

const STORE_STEM: &str = "evidence_vectors";
/// Evidence text is split into chunks of this many characters.
pub const CHUNK_CHARS: usize = 1000;
/// Neighbours requested per wanted result, to absorb post-hoc candidate filtering.
pub const OVERFETCH_FACTOR: usize = 10;
const MIN_FETCH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    pub candidate_id: String,
    pub repo_name: String,
    /// `meta`, `readme`, or `code_N`.
    pub kind: String,
    pub chunk_text: String,
}

type ChunkKey = (String, String, String);

struct Inner {
    snapshot: Snapshot<EvidenceChunk>,
    keys: HashSet<ChunkKey>,
}

pub struct EvidenceVectorStore {
    paths: StorePaths,
    inner: Mutex<Inner>,
}

fn chunk_key(candidate_id: &str, repo_name: &str, chunk_text: &str) -> ChunkKey {
    (
        candidate_id.to_string(),
        repo_name.to_string(),
        chunk_text.to_string(),
    )
}

/// Character-based chunking. Empty text yields no chunks.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// The labelled text parts indexed for one repository.
pub fn content_parts(repo: &RepoContent) -> Vec<(String, String)> {
    let mut parts = vec![
        (
            "meta".to_string(),
            format!(
                "Repo: {}. Description: {}",
                repo.name,
                repo.description.as_deref().unwrap_or("")
            ),
        ),
        ("readme".to_string(), repo.readme.clone()),
    ];
    for (i, snippet) in repo.code_snippets.iter().enumerate() {
        parts.push((format!("code_{i}"), snippet.clone()));
    }
    parts
}

impl EvidenceVectorStore {
    pub fn open(dir: &Path, dimension: usize) -> Self {
        let paths = StorePaths::new(dir, STORE_STEM);
        let snapshot: Snapshot<EvidenceChunk> = Snapshot::load(&paths, dimension);
        let keys = snapshot
            .metadata
            .iter()
            .map(|c| chunk_key(&c.candidate_id, &c.repo_name, &c.chunk_text))
            .collect();
        Self {
            paths,
            inner: Mutex::new(Inner { snapshot, keys }),
        }
    }

    fn contains(&self, key: &ChunkKey) -> bool {
        self.inner.lock().keys.contains(key)
    }

    /// Chunks, embeds and stores a repository's content. Returns the number of new chunks.
    ///
    /// A chunk whose embedding fails is skipped; the rest of the repository is still indexed.
    pub async fn add_repo_content(
        &self,
        candidate_id: &str,
        repo: &RepoContent,
        embeddings: &EmbeddingService,
    ) -> Result<usize, VectorStoreError> {
        let mut added = 0usize;

        for (kind, text) in content_parts(repo) {
            for chunk in chunk_text(&text, CHUNK_CHARS) {
                let key = chunk_key(candidate_id, &repo.name, &chunk);
                if self.contains(&key) {
                    debug!("Chunk already exists for {candidate_id}/{}, skipping", repo.name);
                    continue;
                }

                let vector = match embeddings.embed(&chunk).await {
                    Ok(v) => v,
                    Err(e) => {
                        error!("Failed to index chunk for {candidate_id}/{}: {e}", repo.name);
                        continue;
                    }
                };

                let mut inner = self.inner.lock();
                // Re-check: the same text can appear in two parts of one repository.
                if inner.keys.contains(&key) {
                    continue;
                }
                let pushed = inner.snapshot.push(
                    &vector,
                    EvidenceChunk {
                        candidate_id: candidate_id.to_string(),
                        repo_name: repo.name.clone(),
                        kind: kind.clone(),
                        chunk_text: chunk,
                    },
                );
                if let Err(e) = pushed {
                    // Rows already accepted in this call must reach disk.
                    inner.snapshot.save(&self.paths)?;
                    return Err(e);
                }
                inner.keys.insert(key);
                added += 1;
            }
        }

        let inner = self.inner.lock();
        inner.snapshot.save(&self.paths)?;
        info!(
            "Indexed {added} new chunks for {candidate_id}/{} (store total: {})",
            repo.name,
            inner.snapshot.len()
        );
        Ok(added)
    }

    /// Nearest chunks for one candidate. Query embedding failures yield no evidence.
    pub async fn search(
        &self,
        query: &str,
        candidate_id: &str,
        top_k: usize,
        embeddings: &EmbeddingService,
    ) -> Vec<EvidenceChunk> {
        if top_k == 0 || self.is_empty() {
            return Vec::new();
        }

        let query_vector = match embeddings.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                error!("Evidence search failed for {candidate_id}: {e}");
                return Vec::new();
            }
        };

        let inner = self.inner.lock();
        let fetch = (top_k * OVERFETCH_FACTOR)
            .max(MIN_FETCH)
            .min(inner.snapshot.len());
        inner
            .snapshot
            .index
            .search(&query_vector, fetch)
            .into_iter()
            .filter_map(|(i, _)| inner.snapshot.metadata.get(i))
            .filter(|chunk| chunk.candidate_id == candidate_id)
            .take(top_k)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub fn candidate_chunks(&self, candidate_id: &str) -> Vec<EvidenceChunk> {
        self.inner
            .lock()
            .snapshot
            .metadata
            .iter()
            .filter(|c| c.candidate_id == candidate_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
