//! Evidence Extractor: turns a candidate's public repositories into raw stats,
//! bounded features, and text content for retrieval.
//!
//! The code host is a trait so the extractor can be driven by the GitHub client
//! in production and by in-process fakes in tests.

use async_trait::async_trait;
use thiserror::Error;

pub mod extractor;
pub mod github;
pub mod models;

pub use extractor::EvidenceExtractor;

use models::{RepoFile, RepoSummary};

#[derive(Debug, Error)]
pub enum CodeHostError {
    #[error("code host request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("code host returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("code host payload could not be decoded: {0}")]
    Decode(String),
}

/// Read-only access to a repository host. Missing users, repositories and files
/// are "no data" (empty results), not errors.
#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn list_repos(&self, username: &str) -> Result<Vec<RepoSummary>, CodeHostError>;

    /// Decoded README text, or empty if the repository has none.
    async fn readme(&self, username: &str, repo: &str) -> Result<String, CodeHostError>;

    async fn list_files(&self, username: &str, repo: &str) -> Result<Vec<RepoFile>, CodeHostError>;

    /// Raw file body, or `None` if it is gone.
    async fn download(&self, url: &str) -> Result<Option<String>, CodeHostError>;
}
