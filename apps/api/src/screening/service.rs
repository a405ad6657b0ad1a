use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::candidate::Candidate;
use crate::models::job::JobDescription;
use crate::pipeline::{Orchestrator, PipelineError, PipelineInput};
use crate::screening::models::{HrDecision, ScreeningReport, ScreeningResult};
use crate::screening::store::{ScreeningStore, StoreError};

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("candidate {0} is not on the roster")]
    CandidateNotFound(String),

    #[error("job description text is empty")]
    EmptyJobDescription,
}

impl ScreeningError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ScreeningError::CandidateNotFound(_) | ScreeningError::Store(StoreError::NotFound { .. })
        )
    }
}

/// Runs screening against the active job description, serving whole runs from
/// the result cache when every candidate already has a record.
#[derive(Clone)]
pub struct ScreeningService {
    orchestrator: Orchestrator,
    store: Arc<dyn ScreeningStore>,
    candidates: Arc<Vec<Candidate>>,
    default_jd: Arc<str>,
    // Vector stores and the embedding cache assume one writer at a time.
    run_lock: Arc<Mutex<()>>,
}

impl ScreeningService {
    pub fn new(
        orchestrator: Orchestrator,
        store: Arc<dyn ScreeningStore>,
        candidates: Vec<Candidate>,
        default_jd: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            candidates: Arc::new(candidates),
            default_jd: default_jd.into(),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The active job description, activating the configured default when none is set.
    pub async fn active_job(&self) -> Result<JobDescription, ScreeningError> {
        match self.store.active_job().await? {
            Some(job) => Ok(job),
            None => {
                info!("No active job description, activating the default");
                Ok(self.store.activate_job(&self.default_jd).await?)
            }
        }
    }

    pub async fn activate_job_description(&self, jd_text: &str) -> Result<JobDescription, ScreeningError> {
        let jd_text = jd_text.trim();
        if jd_text.is_empty() {
            return Err(ScreeningError::EmptyJobDescription);
        }
        Ok(self.store.activate_job(jd_text).await?)
    }

    /// The full report from cache, if every roster candidate has a record for `job`.
    pub async fn cached_report(&self, job: &JobDescription) -> Result<Option<ScreeningReport>, ScreeningError> {
        if self.candidates.is_empty() {
            return Ok(None);
        }
        for candidate in self.candidates.iter() {
            if self.store.get(&candidate.candidate_id, &job.jd_hash).await?.is_none() {
                return Ok(None);
            }
        }
        info!("All candidates cached for job {}, skipping pipeline", job.jd_hash);
        Ok(Some(self.report(job, true).await?))
    }

    pub async fn run_screening(&self) -> Result<ScreeningReport, ScreeningError> {
        let _guard = self.run_lock.lock().await;
        let job = self.active_job().await?;
        if let Some(report) = self.cached_report(&job).await? {
            return Ok(report);
        }
        self.execute(&job).await?;
        self.report(&job, false).await
    }

    /// Drops one candidate's cached result and recomputes the run. A prior HR
    /// review of that candidate is reapplied to the fresh record; if the rerun
    /// fails the previous record is put back unchanged.
    pub async fn re_evaluate(&self, candidate_id: &str) -> Result<ScreeningReport, ScreeningError> {
        if !self.candidates.iter().any(|c| c.candidate_id == candidate_id) {
            return Err(ScreeningError::CandidateNotFound(candidate_id.to_string()));
        }

        let _guard = self.run_lock.lock().await;
        let job = self.active_job().await?;
        let prior = self.store.get(candidate_id, &job.jd_hash).await?;
        self.store.invalidate(candidate_id, &job.jd_hash).await?;
        info!("Re-evaluating {candidate_id} for job {}", job.jd_hash);

        if let Err(e) = self.execute(&job).await {
            if let Some(prior) = prior {
                warn!("Re-evaluation of {candidate_id} failed, restoring its previous result");
                self.store.put(prior).await?;
            }
            return Err(e);
        }

        if let Some(ScreeningResult {
            hr_decision: Some(decision),
            hr_notes,
            ..
        }) = prior
        {
            self.store
                .record_hr_decision(candidate_id, &job.jd_hash, decision, hr_notes)
                .await?;
        }
        self.report(&job, false).await
    }

    pub async fn stored_results(&self) -> Result<ScreeningReport, ScreeningError> {
        let job = self.active_job().await?;
        self.report(&job, true).await
    }

    pub async fn submit_hr_decision(
        &self,
        candidate_id: &str,
        decision: HrDecision,
        notes: Option<String>,
    ) -> Result<ScreeningResult, ScreeningError> {
        let job = self.active_job().await?;
        let result = self
            .store
            .record_hr_decision(candidate_id, &job.jd_hash, decision, notes)
            .await?;
        info!("HR decision for {candidate_id}: {}", decision.as_str());
        Ok(result)
    }

    async fn execute(&self, job: &JobDescription) -> Result<(), ScreeningError> {
        let outcome = self
            .orchestrator
            .run(PipelineInput {
                job: job.clone(),
                candidates: self.candidates.as_ref().clone(),
            })
            .await?;

        for (i, entry) in outcome.ranking.iter().enumerate() {
            let evaluation = outcome.evaluations.get(&entry.candidate_id).cloned();
            self.store
                .put(ScreeningResult::new(&job.jd_hash, i + 1, entry, evaluation))
                .await?;
        }
        info!(
            "Stored {} results for job {} (run {})",
            outcome.ranking.len(),
            job.jd_hash,
            outcome.run_id
        );
        Ok(())
    }

    async fn report(&self, job: &JobDescription, from_cache: bool) -> Result<ScreeningReport, ScreeningError> {
        let results: Vec<ScreeningResult> = self
            .store
            .results_for_job(&job.jd_hash)
            .await?
            .into_iter()
            .filter(|r| self.candidates.iter().any(|c| c.candidate_id == r.candidate_id))
            .collect();
        if results.is_empty() {
            return Ok(ScreeningReport::empty(&job.jd_hash));
        }
        Ok(ScreeningReport::from_results(&job.jd_hash, results, from_cache))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::embedding::testing::FakeEmbedder;
    use crate::pipeline::orchestrator::testing::DIMENSION;
    use crate::screening::models::HrStatus;
    use crate::screening::store::MemoryScreeningStore;

    #[tokio::test]
    async fn test_first_run_ranks_all_and_evaluates_top_n() {
        let harness = make_harness();
        let report = harness.service.run_screening().await.unwrap();

        assert!(!report.from_cache);
        assert_eq!(report.ranking.len(), 3);
        assert_eq!(report.evaluations.len(), 2);
        assert_eq!(
            report.ranking.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(report.evaluations.values().all(|e| e.hr_status == HrStatus::Pending));
    }

    #[tokio::test]
    async fn test_second_run_is_served_from_cache() {
        let harness = make_harness();
        let first = harness.service.run_screening().await.unwrap();
        let embeds = harness.embedder.calls();
        let model_calls = harness.model.calls();

        let second = harness.service.run_screening().await.unwrap();

        assert!(second.from_cache);
        assert_eq!(second.ranking, first.ranking);
        assert_eq!(harness.embedder.calls(), embeds);
        assert_eq!(harness.model.calls(), model_calls);
    }

    #[tokio::test]
    async fn test_re_evaluate_keeps_hr_decision() {
        let harness = make_harness();
        let report = harness.service.run_screening().await.unwrap();
        let top = report.ranking[0].candidate_id.clone();

        harness
            .service
            .submit_hr_decision(&top, HrDecision::Approved, Some("great repos".to_string()))
            .await
            .unwrap();

        let report = harness.service.re_evaluate(&top).await.unwrap();
        assert!(!report.from_cache);
        let evaluation = &report.evaluations[&top];
        assert_eq!(evaluation.hr_decision, Some(HrDecision::Approved));
        assert_eq!(evaluation.hr_notes.as_deref(), Some("great repos"));
        assert_eq!(evaluation.hr_status, HrStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_re_evaluate_keeps_previous_record() {
        let store: Arc<dyn ScreeningStore> = Arc::new(MemoryScreeningStore::new());
        let healthy = make_harness_on(FakeEmbedder::new(DIMENSION), store.clone());
        let report = healthy.service.run_screening().await.unwrap();
        let top = report.ranking[0].candidate_id.clone();
        healthy
            .service
            .submit_hr_decision(&top, HrDecision::Approved, Some("strong RAG work".to_string()))
            .await
            .unwrap();

        let broken = make_harness_on(FakeEmbedder::failing(DIMENSION), store.clone());
        let err = broken.service.re_evaluate(&top).await.unwrap_err();
        assert!(matches!(err, ScreeningError::Pipeline(PipelineError::JobEmbedding(_))));

        let job = healthy.service.active_job().await.unwrap();
        let record = store.get(&top, &job.jd_hash).await.unwrap().unwrap();
        assert_eq!(record.hr_decision, Some(HrDecision::Approved));
        assert_eq!(record.hr_notes.as_deref(), Some("strong RAG work"));
        assert_eq!(record.rank, 1);
        assert!(record.evaluation.is_some());

        let cached = healthy.service.run_screening().await.unwrap();
        assert!(cached.from_cache);
    }

    #[tokio::test]
    async fn test_re_evaluate_unknown_candidate_is_not_found() {
        let harness = make_harness();
        let err = harness.service.re_evaluate("C404").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_hr_decision_without_result_is_not_found() {
        let harness = make_harness();
        let err = harness
            .service
            .submit_hr_decision("C001", HrDecision::Rejected, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stored_results_empty_before_any_run() {
        let harness = make_harness();
        let report = harness.service.stored_results().await.unwrap();
        assert!(report.ranking.is_empty());
        assert!(report.evaluations.is_empty());
    }

    #[tokio::test]
    async fn test_new_job_description_misses_cache() {
        let harness = make_harness();
        harness.service.run_screening().await.unwrap();

        let job = harness
            .service
            .activate_job_description("Backend Engineer: Rust, Postgres")
            .await
            .unwrap();
        let report = harness.service.run_screening().await.unwrap();

        assert!(!report.from_cache);
        assert_eq!(report.jd_hash, job.jd_hash);
    }

    #[tokio::test]
    async fn test_empty_job_description_rejected() {
        let harness = make_harness();
        let err = harness.service.activate_job_description("   ").await.unwrap_err();
        assert!(matches!(err, ScreeningError::EmptyJobDescription));
    }
}
