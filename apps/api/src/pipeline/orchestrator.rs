use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::{
    invoke, DecisionSynthesizer, EvaluationInput, ReadinessGatekeeper, ReadinessInput, Skeptic, SkepticInput,
    SynthesisInput, UnifiedEvaluator,
};
use crate::embedding::EmbeddingService;
use crate::evidence::EvidenceExtractor;
use crate::llm_client::ChatModel;
use crate::models::candidate::{Candidate, ResumeSection};
use crate::models::job::JobDescription;
use crate::pipeline::ranking::{sort_ranking, weighted_score, RankingEntry};
use crate::pipeline::state::{IndexSummary, PipelineState, RetrievedEvidence, RunInfo, StageDelta};
use crate::pipeline::{CandidateEvaluation, PipelineError, PipelineSettings};
use crate::vector_store::{EvidenceVectorStore, ResumeVectorStore};

pub struct PipelineInput {
    pub job: JobDescription,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    /// Every candidate, best first.
    pub ranking: Vec<RankingEntry>,
    /// Top-N candidates only.
    pub evaluations: BTreeMap<String, CandidateEvaluation>,
}

/// Drives one run through every stage in order. Candidates are processed one at a time.
#[derive(Clone)]
pub struct Orchestrator {
    embeddings: EmbeddingService,
    resume_store: Arc<ResumeVectorStore>,
    evidence_store: Arc<EvidenceVectorStore>,
    extractor: Arc<EvidenceExtractor>,
    model: Arc<dyn ChatModel>,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        embeddings: EmbeddingService,
        resume_store: Arc<ResumeVectorStore>,
        evidence_store: Arc<EvidenceVectorStore>,
        extractor: Arc<EvidenceExtractor>,
        model: Arc<dyn ChatModel>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embeddings,
            resume_store,
            evidence_store,
            extractor,
            model,
            settings,
        }
    }

    pub async fn run(&self, input: PipelineInput) -> Result<PipelineOutcome, PipelineError> {
        let mut state = PipelineState::default();

        advance(&mut state, self.init())?;
        advance(&mut state, self.load(input))?;
        let delta = self.index(&state).await?;
        advance(&mut state, delta)?;
        let delta = self.rank(&state).await?;
        advance(&mut state, delta)?;
        let delta = self.extract_evidence(&state).await?;
        advance(&mut state, delta)?;
        let delta = self.unify_evaluate(&state).await?;
        advance(&mut state, delta)?;
        let delta = self.readiness(&state).await?;
        advance(&mut state, delta)?;
        let delta = self.skeptic(&state).await?;
        advance(&mut state, delta)?;
        let delta = self.synthesize(&state).await?;
        advance(&mut state, delta)?;
        state.finish()?;

        self.outcome(state)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Stages
    // ────────────────────────────────────────────────────────────────────────

    fn init(&self) -> StageDelta {
        let run = RunInfo {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        info!("Workflow initialized (run {})", run.run_id);
        StageDelta::Init(run)
    }

    fn load(&self, input: PipelineInput) -> StageDelta {
        info!("{} resumes loaded, job description {}", input.candidates.len(), input.job.jd_hash);
        StageDelta::Load {
            job: input.job,
            candidates: input.candidates,
        }
    }

    async fn index(&self, state: &PipelineState) -> Result<StageDelta, PipelineError> {
        let candidates = PipelineState::require(&state.candidates, "candidates")?;
        let mut summary = IndexSummary::default();

        for candidate in candidates {
            let id = &candidate.candidate_id;
            for section in ResumeSection::ALL {
                let text = candidate.section(section);
                if text.trim().is_empty() {
                    continue;
                }
                if self.resume_store.contains(id, section) {
                    summary.already_present += 1;
                    continue;
                }
                let vector = match self.embeddings.embed(text).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Could not embed {id} - {}: {e}", section.as_str());
                        summary.failed += 1;
                        continue;
                    }
                };
                match self.resume_store.add_section(id, section, &vector) {
                    Ok(true) => summary.added += 1,
                    Ok(false) => summary.already_present += 1,
                    Err(e) => {
                        warn!("Could not index {id} - {}: {e}", section.as_str());
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            "Indexed resume sections: {} added, {} already present, {} failed",
            summary.added, summary.already_present, summary.failed
        );
        Ok(StageDelta::Index(summary))
    }

    async fn rank(&self, state: &PipelineState) -> Result<StageDelta, PipelineError> {
        let job = PipelineState::require(&state.job, "job")?;
        let candidates = PipelineState::require(&state.candidates, "candidates")?;

        info!("Generating embedding for job description");
        let jd_vector = self
            .embeddings
            .embed(&job.jd_text)
            .await
            .map_err(PipelineError::JobEmbedding)?;

        let mut ranking: Vec<RankingEntry> = candidates
            .iter()
            .map(|candidate| {
                let sections = self.resume_store.section_vectors(&candidate.candidate_id);
                RankingEntry {
                    candidate_id: candidate.candidate_id.clone(),
                    name: candidate.name.clone(),
                    score: weighted_score(&jd_vector, &sections, &self.settings.weights),
                    repository_url: candidate.repository_url().map(str::to_string),
                }
            })
            .collect();
        sort_ranking(&mut ranking);

        for (i, entry) in ranking.iter().enumerate() {
            info!("{}. {} ({}) - Score: {:.4}", i + 1, entry.candidate_id, entry.name, entry.score);
        }
        Ok(StageDelta::Rank(ranking))
    }

    async fn extract_evidence(&self, state: &PipelineState) -> Result<StageDelta, PipelineError> {
        let job = PipelineState::require(&state.job, "job")?;
        let mut evidence = BTreeMap::new();

        for (_, candidate) in self.top_candidates(state)? {
            let id = &candidate.candidate_id;
            let retrieved = match candidate.code_host_username() {
                None => {
                    info!("No repository link for {id}, using empty evidence");
                    RetrievedEvidence::default()
                }
                Some(username) => {
                    let extracted = self.extractor.extract(&username).await;
                    for repo in &extracted.repos {
                        if let Err(e) = self.evidence_store.add_repo_content(id, repo, &self.embeddings).await {
                            warn!("Could not index evidence for {id}/{}: {e}", repo.name);
                        }
                    }
                    let chunks = self
                        .evidence_store
                        .search(&job.jd_text, id, self.settings.evidence_top_k, &self.embeddings)
                        .await;
                    RetrievedEvidence {
                        evidence: extracted,
                        chunks,
                    }
                }
            };
            evidence.insert(id.clone(), retrieved);
        }

        Ok(StageDelta::ExtractEvidence(evidence))
    }

    async fn unify_evaluate(&self, state: &PipelineState) -> Result<StageDelta, PipelineError> {
        let job = PipelineState::require(&state.job, "job")?;
        let evidence = PipelineState::require(&state.evidence, "evidence")?;
        let mut evaluations = BTreeMap::new();

        for (entry, candidate) in self.top_candidates(state)? {
            let retrieved = evidence.get(&candidate.candidate_id).cloned().unwrap_or_default();
            let input = EvaluationInput {
                jd_text: job.jd_text.clone(),
                resume_summary: candidate.resume_summary(),
                resume_similarity: entry.score,
                features: retrieved.evidence.features,
                evidence: retrieved.chunks,
            };
            let outcome = invoke(self.model.as_ref(), &UnifiedEvaluator, &candidate.candidate_id, &input).await;
            info!(
                "Unified evaluation for {}: overall {} ({:?})",
                candidate.candidate_id, outcome.output.overall_score, outcome.source
            );
            evaluations.insert(candidate.candidate_id.clone(), outcome.output);
        }

        Ok(StageDelta::UnifyEvaluate(evaluations))
    }

    async fn readiness(&self, state: &PipelineState) -> Result<StageDelta, PipelineError> {
        let evaluations = PipelineState::require(&state.evaluations, "evaluations")?;
        let mut reports = BTreeMap::new();

        for (id, evaluation) in self.in_rank_order(state, evaluations)? {
            let input = ReadinessInput {
                candidate_id: id.clone(),
                evaluation: evaluation.clone(),
            };
            let outcome = invoke(self.model.as_ref(), &ReadinessGatekeeper, id, &input).await;
            reports.insert(id.clone(), outcome.output);
        }

        Ok(StageDelta::Readiness(reports))
    }

    async fn skeptic(&self, state: &PipelineState) -> Result<StageDelta, PipelineError> {
        let evaluations = PipelineState::require(&state.evaluations, "evaluations")?;
        let readiness = PipelineState::require(&state.readiness, "readiness")?;
        let mut analyses = BTreeMap::new();

        for (id, gatekeeper) in self.in_rank_order(state, readiness)? {
            let Some(evaluation) = evaluations.get(id) else {
                continue;
            };
            let input = SkepticInput {
                candidate_id: id.clone(),
                evaluation: evaluation.clone(),
                gatekeeper: gatekeeper.clone(),
            };
            let outcome = invoke(self.model.as_ref(), &Skeptic, id, &input).await;
            analyses.insert(id.clone(), outcome.output);
        }

        Ok(StageDelta::Skeptic(analyses))
    }

    async fn synthesize(&self, state: &PipelineState) -> Result<StageDelta, PipelineError> {
        let evaluations = PipelineState::require(&state.evaluations, "evaluations")?;
        let readiness = PipelineState::require(&state.readiness, "readiness")?;
        let skeptic = PipelineState::require(&state.skeptic, "skeptic")?;
        let mut decisions = BTreeMap::new();

        for (id, gatekeeper) in self.in_rank_order(state, readiness)? {
            let (Some(evaluation), Some(analysis)) = (evaluations.get(id), skeptic.get(id)) else {
                continue;
            };
            let input = SynthesisInput {
                gatekeeper: gatekeeper.clone(),
                skeptic: analysis.clone(),
                scores: evaluation.clone(),
            };
            let outcome = invoke(self.model.as_ref(), &DecisionSynthesizer, id, &input).await;
            info!("Final decision for {id}: {}", outcome.output.final_decision);
            decisions.insert(id.clone(), outcome.output);
        }

        Ok(StageDelta::Synthesize(decisions))
    }

    // ────────────────────────────────────────────────────────────────────────
    // Helpers
    // ────────────────────────────────────────────────────────────────────────

    /// Top-N ranking entries joined with their roster records.
    fn top_candidates<'a>(
        &self,
        state: &'a PipelineState,
    ) -> Result<Vec<(&'a RankingEntry, &'a Candidate)>, PipelineError> {
        let ranking = PipelineState::require(&state.ranking, "ranking")?;
        let candidates = PipelineState::require(&state.candidates, "candidates")?;
        Ok(ranking
            .iter()
            .take(self.settings.top_n)
            .filter_map(|entry| {
                candidates
                    .iter()
                    .find(|c| c.candidate_id == entry.candidate_id)
                    .map(|c| (entry, c))
            })
            .collect())
    }

    /// Entries of a per-candidate map, ordered by rank.
    fn in_rank_order<'a, T>(
        &self,
        state: &'a PipelineState,
        map: &'a BTreeMap<String, T>,
    ) -> Result<Vec<(&'a String, &'a T)>, PipelineError> {
        let ranking = PipelineState::require(&state.ranking, "ranking")?;
        Ok(ranking
            .iter()
            .filter_map(|entry| map.get_key_value(&entry.candidate_id))
            .collect())
    }

    fn outcome(&self, state: PipelineState) -> Result<PipelineOutcome, PipelineError> {
        let run = PipelineState::require(&state.run, "run")?;
        let ranking = PipelineState::require(&state.ranking, "ranking")?;
        let evidence = PipelineState::require(&state.evidence, "evidence")?;
        let evaluations = PipelineState::require(&state.evaluations, "evaluations")?;
        let readiness = PipelineState::require(&state.readiness, "readiness")?;
        let skeptic = PipelineState::require(&state.skeptic, "skeptic")?;
        let decisions = PipelineState::require(&state.decisions, "decisions")?;

        let mut results = BTreeMap::new();
        for entry in ranking.iter().take(self.settings.top_n) {
            let id = &entry.candidate_id;
            let (Some(evaluation), Some(report), Some(analysis), Some(decision)) = (
                evaluations.get(id),
                readiness.get(id),
                skeptic.get(id),
                decisions.get(id),
            ) else {
                continue;
            };
            let retrieved = evidence.get(id).cloned().unwrap_or_default();
            results.insert(
                id.clone(),
                CandidateEvaluation {
                    candidate_id: id.clone(),
                    name: entry.name.clone(),
                    repository_stats: retrieved.evidence.raw,
                    repository_features: retrieved.evidence.features,
                    repos: retrieved.evidence.repos,
                    evaluation: evaluation.clone(),
                    interview_readiness: report.clone(),
                    skeptic_analysis: analysis.clone(),
                    final_decision: decision.clone(),
                },
            );
        }

        info!(
            "Run {} complete: {} ranked, {} evaluated",
            run.run_id,
            ranking.len(),
            results.len()
        );
        Ok(PipelineOutcome {
            run_id: run.run_id,
            ranking: ranking.clone(),
            evaluations: results,
        })
    }
}

fn advance(state: &mut PipelineState, delta: StageDelta) -> Result<(), PipelineError> {
    let stage = delta.stage();
    state.apply(delta)?;
    info!("Stage {stage:?} complete");
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::embedding::testing::FakeEmbedder;
    use crate::embedding::EmbeddingCache;
    use crate::evidence::extractor::testing::{make_file, make_repo, FakeCodeHost};
    use crate::evidence::CodeHost;
    use crate::models::candidate::CandidateLinks;

    pub const DIMENSION: usize = 16;

    pub fn make_candidate(id: &str, github: Option<&str>, skills: &str) -> Candidate {
        Candidate {
            candidate_id: id.to_string(),
            name: format!("Candidate {id}"),
            links: CandidateLinks {
                github: github.map(str::to_string),
                linkedin: None,
            },
            skills: skills.to_string(),
            experience: format!("{id} built retrieval pipelines and agent workflows"),
            projects: format!("{id} shipped a RAG chatbot"),
            education: "B.Tech Computer Science".to_string(),
        }
    }

    pub fn make_roster() -> Vec<Candidate> {
        vec![
            make_candidate("C001", Some("https://github.com/octo"), "Python, LangGraph, FAISS"),
            make_candidate("C002", None, "Java, Spring"),
            make_candidate("C003", Some("github.com/nobody"), "PyTorch, Transformers"),
        ]
    }

    pub fn make_code_host() -> FakeCodeHost {
        let mut host = FakeCodeHost::default();
        host.repos.insert(
            "octo".to_string(),
            vec![make_repo("rag-agent", "LangGraph agent", 4), make_repo("dotfiles", "shell", 0)],
        );
        host.readmes
            .insert("rag-agent".to_string(), "# RAG agent\nRetrieval over papers".to_string());
        host.files.insert("rag-agent".to_string(), vec![make_file("main.py")]);
        host.downloads
            .insert("https://raw.example/main.py".to_string(), "from langgraph import graph".to_string());
        host
    }

    pub fn make_orchestrator(
        dir: &std::path::Path,
        embedder: Arc<FakeEmbedder>,
        model: Arc<dyn ChatModel>,
        settings: PipelineSettings,
    ) -> Orchestrator {
        let cache = Arc::new(EmbeddingCache::open(dir.join("embedding_cache.json")));
        let embeddings = EmbeddingService::new(embedder, cache, DIMENSION);
        let host: Arc<dyn CodeHost> = Arc::new(make_code_host());
        Orchestrator::new(
            embeddings,
            Arc::new(ResumeVectorStore::open(dir, DIMENSION)),
            Arc::new(EvidenceVectorStore::open(dir, DIMENSION)),
            Arc::new(EvidenceExtractor::new(host)),
            model,
            settings,
        )
    }

    pub fn make_input() -> PipelineInput {
        PipelineInput {
            job: JobDescription::new("AI Engineer Intern: LangGraph, RAG, FAISS, Python"),
            candidates: make_roster(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::agents::models::{DecisionLabel, Level};
    use crate::agents::prompts::{GATEKEEPER_SYSTEM, SKEPTIC_SYSTEM, SYNTHESIZER_SYSTEM};
    use crate::agents::testing::FakeChatModel;
    use crate::embedding::testing::FakeEmbedder;

    #[tokio::test]
    async fn test_ranks_all_but_evaluates_top_n() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PipelineSettings {
            top_n: 2,
            ..Default::default()
        };
        let orchestrator = make_orchestrator(
            dir.path(),
            Arc::new(FakeEmbedder::new(DIMENSION)),
            Arc::new(FakeChatModel::new()),
            settings,
        );

        let outcome = orchestrator.run(make_input()).await.unwrap();

        assert_eq!(outcome.ranking.len(), 3);
        assert_eq!(outcome.evaluations.len(), 2);
        for entry in outcome.ranking.iter().take(2) {
            assert!(outcome.evaluations.contains_key(&entry.candidate_id));
        }
        assert!(!outcome.evaluations.contains_key(&outcome.ranking[2].candidate_id));
        assert!(outcome.ranking.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_model_outage_degrades_to_fallbacks_with_bounded_scores() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = make_orchestrator(
            dir.path(),
            Arc::new(FakeEmbedder::new(DIMENSION)),
            Arc::new(FakeChatModel::new()),
            PipelineSettings::default(),
        );

        let outcome = orchestrator.run(make_input()).await.unwrap();

        assert_eq!(outcome.evaluations.len(), 3);
        for result in outcome.evaluations.values() {
            let features = &result.repository_features;
            assert!(features.activity_score <= 100 && features.ai_relevance_score <= 100);
            let ceiling = result.evaluation.resume_score.min(result.evaluation.github_score);
            assert!(result.interview_readiness.confidence_score <= ceiling);
            assert_eq!(result.final_decision.final_decision, DecisionLabel::Hold);
            assert_eq!(result.final_decision.candidate_classification, "System Error");
        }
    }

    #[tokio::test]
    async fn test_candidate_with_repositories_gets_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = make_orchestrator(
            dir.path(),
            Arc::new(FakeEmbedder::new(DIMENSION)),
            Arc::new(FakeChatModel::new()),
            PipelineSettings::default(),
        );

        let outcome = orchestrator.run(make_input()).await.unwrap();

        let c001 = &outcome.evaluations["C001"];
        assert_eq!(c001.repository_stats.total_repos, 2);
        assert_eq!(c001.repository_features.ai_relevance_score, 25);
        assert_eq!(c001.repos.len(), 1);
        assert!(!c001.evaluation.ai_evidence.is_empty());
        assert!(c001.evaluation.ai_evidence.iter().all(|c| c.repo == "rag-agent"));

        let c002 = &outcome.evaluations["C002"];
        assert_eq!(c002.repository_features, Default::default());
        assert!(c002.repos.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_pays_no_new_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(FakeEmbedder::new(DIMENSION));
        let orchestrator = make_orchestrator(
            dir.path(),
            embedder.clone(),
            Arc::new(FakeChatModel::new()),
            PipelineSettings::default(),
        );

        orchestrator.run(make_input()).await.unwrap();
        let after_first = embedder.calls();
        assert!(after_first > 0);

        orchestrator.run(make_input()).await.unwrap();
        assert_eq!(embedder.calls(), after_first);
    }

    #[tokio::test]
    async fn test_job_embedding_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = make_orchestrator(
            dir.path(),
            Arc::new(FakeEmbedder::failing(DIMENSION)),
            Arc::new(FakeChatModel::new()),
            PipelineSettings::default(),
        );

        let err = orchestrator.run(make_input()).await.unwrap_err();
        assert!(matches!(err, PipelineError::JobEmbedding(_)));
    }

    #[tokio::test]
    async fn test_contradiction_is_resolved_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let model = FakeChatModel::new()
            .reply(
                GATEKEEPER_SYSTEM,
                r#"{"hire_readiness_level": "HIGH", "confidence_score": 90,
                    "risk_factors": ["r"], "skill_gaps": ["a", "b"],
                    "final_hiring_recommendation": "Strong Hire"}"#,
            )
            .reply(
                SKEPTIC_SYSTEM,
                r#"{"risk_level": "HIGH", "major_concerns": ["x", "y", "z"], "critical_skill_gaps": ["p", "q"]}"#,
            )
            .reply(
                SYNTHESIZER_SYSTEM,
                r#"{"final_decision": "STRONG HIRE", "decision_reasoning": ["Great"], "risk_level": "LOW", "confidence": 95}"#,
            );
        let settings = PipelineSettings {
            top_n: 1,
            ..Default::default()
        };
        let orchestrator = make_orchestrator(
            dir.path(),
            Arc::new(FakeEmbedder::new(DIMENSION)),
            Arc::new(model),
            settings,
        );

        let outcome = orchestrator.run(make_input()).await.unwrap();
        let result = outcome.evaluations.values().next().unwrap();
        assert_eq!(result.interview_readiness.hire_readiness_level, Level::High);
        assert_eq!(result.skeptic_analysis.risk_level, Level::High);
        assert_ne!(result.final_decision.final_decision, DecisionLabel::StrongHire);
    }
}
