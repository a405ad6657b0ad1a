//! Embedding Service: every text → vector conversion goes through here so the
//! content-hash cache is consulted before any provider call.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

pub mod cache;
pub mod gemini;

pub use cache::EmbeddingCache;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider failed: {0}")]
    Provider(String),

    #[error("embedding has dimension {actual}, expected {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("failed to persist embedding cache: {0}")]
    Persist(String),
}

/// A remote (or fake) model that turns text into a fixed-width vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Cache-first embedding front end. No retries at this layer.
#[derive(Clone)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    dimension: usize,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, cache: Arc<EmbeddingCache>, dimension: usize) -> Self {
        Self {
            provider,
            cache,
            dimension,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(vector) = self.cache.get(text) {
            return Ok(vector);
        }

        info!(
            "Generating embedding via {} for text of {} chars",
            self.provider.model(),
            text.chars().count()
        );
        let vector = self.provider.embed(text).await?;
        if vector.len() != self.dimension {
            return Err(EmbeddingError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        // A failed cache write costs a future provider call, not this result.
        if let Err(e) = self.cache.put(text, vector.clone()) {
            warn!("{e}");
        }
        Ok(vector)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Deterministic provider: a text's vector is derived from its bytes. Counts calls.
    pub struct FakeEmbedder {
        pub dimension: usize,
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl FakeEmbedder {
        pub fn new(dimension: usize) -> Self {
            Self {
                dimension,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub fn failing(dimension: usize) -> Self {
            Self {
                fail: true,
                ..Self::new(dimension)
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        fn model(&self) -> &str {
            "fake-embedder"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EmbeddingError::Provider("provider unavailable".to_string()));
            }
            let mut vector = vec![0.0_f32; self.dimension];
            for (i, byte) in text.bytes().enumerate() {
                vector[i % self.dimension] += byte as f32 / 255.0;
            }
            vector[0] += 1.0;
            Ok(vector)
        }
    }

    pub fn fake_service(dir: &std::path::Path, dimension: usize) -> (EmbeddingService, Arc<FakeEmbedder>) {
        let provider = Arc::new(FakeEmbedder::new(dimension));
        let cache = Arc::new(EmbeddingCache::open(dir.join("embedding_cache.json")));
        (
            EmbeddingService::new(provider.clone(), cache, dimension),
            provider,
        )
    }
}
