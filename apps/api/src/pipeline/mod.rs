//! Pipeline Orchestrator: the fixed linear stage graph from candidate roster to
//! per-candidate hiring decisions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agents::{FinalDecision, ReadinessReport, SkepticAnalysis, UnifiedEvaluation};
use crate::embedding::EmbeddingError;
use crate::evidence::models::{EngineeredFeatures, RawRepoStats, RepoContent};

pub mod orchestrator;
pub mod ranking;
pub mod state;

pub use orchestrator::{Orchestrator, PipelineInput, PipelineOutcome};
pub use ranking::{RankingEntry, SectionWeights};
pub use state::Stage;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("job description could not be embedded: {0}")]
    JobEmbedding(#[source] EmbeddingError),

    #[error("stage {got:?} cannot run before {expected:?}")]
    OutOfOrder { expected: Stage, got: Stage },

    #[error("state key '{key}' was already written")]
    StateConflict { key: &'static str },

    #[error("state key '{key}' is missing")]
    MissingState { key: &'static str },
}

/// Tunables for one run. `Default` matches production.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Candidates that proceed past ranking.
    pub top_n: usize,
    /// Evidence chunks retrieved per candidate.
    pub evidence_top_k: usize,
    pub weights: SectionWeights,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_n: 3,
            evidence_top_k: 3,
            weights: SectionWeights::default(),
        }
    }
}

/// Everything the pipeline concluded about one top-N candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub candidate_id: String,
    pub name: String,
    pub repository_stats: RawRepoStats,
    pub repository_features: EngineeredFeatures,
    pub repos: Vec<RepoContent>,
    pub evaluation: UnifiedEvaluation,
    pub interview_readiness: ReadinessReport,
    pub skeptic_analysis: SkepticAnalysis,
    pub final_decision: FinalDecision,
}
