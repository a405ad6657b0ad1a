//! Pipeline state: one append-only record threaded through a fixed, linear
//! stage sequence. Stages never mutate it directly; each returns a
//! [`StageDelta`] which [`PipelineState::apply`] merges after checking order
//! and that no key is written twice.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::agents::{FinalDecision, ReadinessReport, SkepticAnalysis, UnifiedEvaluation};
use crate::evidence::models::CandidateEvidence;
use crate::models::candidate::Candidate;
use crate::models::job::JobDescription;
use crate::pipeline::ranking::RankingEntry;
use crate::pipeline::PipelineError;
use crate::vector_store::evidence::EvidenceChunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Load,
    Index,
    Rank,
    ExtractEvidence,
    UnifyEvaluate,
    Readiness,
    Skeptic,
    Synthesize,
    Done,
}

impl Stage {
    pub const SEQUENCE: [Stage; 10] = [
        Stage::Init,
        Stage::Load,
        Stage::Index,
        Stage::Rank,
        Stage::ExtractEvidence,
        Stage::UnifyEvaluate,
        Stage::Readiness,
        Stage::Skeptic,
        Stage::Synthesize,
        Stage::Done,
    ];

    pub fn next(self) -> Option<Stage> {
        let position = Self::SEQUENCE.iter().position(|s| *s == self)?;
        Self::SEQUENCE.get(position + 1).copied()
    }

    /// Progress-stream step number and label. `Done` has none.
    pub fn progress(self) -> Option<(u8, &'static str)> {
        match self {
            Stage::Init => Some((0, "System Initialization")),
            Stage::Load => Some((1, "Data Ingestion")),
            Stage::Index => Some((2, "Semantic Indexing")),
            Stage::Rank => Some((3, "Neural Retrieval")),
            Stage::ExtractEvidence => Some((4, "Repository Validation")),
            Stage::UnifyEvaluate => Some((5, "Holistic Evaluation")),
            Stage::Readiness => Some((6, "Readiness Audit")),
            Stage::Skeptic => Some((7, "Skeptic Review")),
            Stage::Synthesize => Some((8, "Decision Synthesis")),
            Stage::Done => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexSummary {
    pub added: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// Repository evidence for one top-N candidate plus the chunks retrieved for the JD.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievedEvidence {
    pub evidence: CandidateEvidence,
    pub chunks: Vec<EvidenceChunk>,
}

/// What a stage adds. Exactly one variant per stage that writes state.
#[derive(Debug)]
pub enum StageDelta {
    Init(RunInfo),
    Load {
        job: JobDescription,
        candidates: Vec<Candidate>,
    },
    Index(IndexSummary),
    Rank(Vec<RankingEntry>),
    ExtractEvidence(BTreeMap<String, RetrievedEvidence>),
    UnifyEvaluate(BTreeMap<String, UnifiedEvaluation>),
    Readiness(BTreeMap<String, ReadinessReport>),
    Skeptic(BTreeMap<String, SkepticAnalysis>),
    Synthesize(BTreeMap<String, FinalDecision>),
}

impl StageDelta {
    pub fn stage(&self) -> Stage {
        match self {
            StageDelta::Init(_) => Stage::Init,
            StageDelta::Load { .. } => Stage::Load,
            StageDelta::Index(_) => Stage::Index,
            StageDelta::Rank(_) => Stage::Rank,
            StageDelta::ExtractEvidence(_) => Stage::ExtractEvidence,
            StageDelta::UnifyEvaluate(_) => Stage::UnifyEvaluate,
            StageDelta::Readiness(_) => Stage::Readiness,
            StageDelta::Skeptic(_) => Stage::Skeptic,
            StageDelta::Synthesize(_) => Stage::Synthesize,
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineState {
    completed: Option<Stage>,
    pub run: Option<RunInfo>,
    pub job: Option<JobDescription>,
    pub candidates: Option<Vec<Candidate>>,
    pub index: Option<IndexSummary>,
    pub ranking: Option<Vec<RankingEntry>>,
    pub evidence: Option<BTreeMap<String, RetrievedEvidence>>,
    pub evaluations: Option<BTreeMap<String, UnifiedEvaluation>>,
    pub readiness: Option<BTreeMap<String, ReadinessReport>>,
    pub skeptic: Option<BTreeMap<String, SkepticAnalysis>>,
    pub decisions: Option<BTreeMap<String, FinalDecision>>,
}

fn set_once<T>(slot: &mut Option<T>, key: &'static str, value: T) -> Result<(), PipelineError> {
    if slot.is_some() {
        return Err(PipelineError::StateConflict { key });
    }
    *slot = Some(value);
    Ok(())
}

impl PipelineState {
    pub fn completed(&self) -> Option<Stage> {
        self.completed
    }

    /// The stage that must run next.
    pub fn expected(&self) -> Stage {
        match self.completed {
            None => Stage::Init,
            Some(stage) => stage.next().unwrap_or(Stage::Done),
        }
    }

    pub fn apply(&mut self, delta: StageDelta) -> Result<(), PipelineError> {
        let expected = self.expected();
        let got = delta.stage();
        if got != expected {
            return Err(PipelineError::OutOfOrder { expected, got });
        }

        match delta {
            StageDelta::Init(run) => set_once(&mut self.run, "run", run)?,
            StageDelta::Load { job, candidates } => {
                set_once(&mut self.job, "job", job)?;
                set_once(&mut self.candidates, "candidates", candidates)?;
            }
            StageDelta::Index(summary) => set_once(&mut self.index, "index", summary)?,
            StageDelta::Rank(ranking) => set_once(&mut self.ranking, "ranking", ranking)?,
            StageDelta::ExtractEvidence(evidence) => set_once(&mut self.evidence, "evidence", evidence)?,
            StageDelta::UnifyEvaluate(evals) => set_once(&mut self.evaluations, "evaluations", evals)?,
            StageDelta::Readiness(reports) => set_once(&mut self.readiness, "readiness", reports)?,
            StageDelta::Skeptic(analyses) => set_once(&mut self.skeptic, "skeptic", analyses)?,
            StageDelta::Synthesize(decisions) => set_once(&mut self.decisions, "decisions", decisions)?,
        }
        self.completed = Some(got);
        Ok(())
    }

    /// Marks the terminal state once every writing stage has run.
    pub fn finish(&mut self) -> Result<(), PipelineError> {
        match self.expected() {
            Stage::Done => {
                self.completed = Some(Stage::Done);
                Ok(())
            }
            expected => Err(PipelineError::OutOfOrder {
                expected,
                got: Stage::Done,
            }),
        }
    }

    pub fn require<'a, T>(slot: &'a Option<T>, key: &'static str) -> Result<&'a T, PipelineError> {
        slot.as_ref().ok_or(PipelineError::MissingState { key })
    }
}
