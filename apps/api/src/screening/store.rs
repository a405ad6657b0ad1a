use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;

use crate::models::job::JobDescription;
use crate::screening::models::{HrDecision, ScreeningResult};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no screening result for {candidate_id} under job {jd_hash}")]
    NotFound { candidate_id: String, jd_hash: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored result could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable screening results keyed by (candidate, job description hash), plus
/// the job descriptions themselves.
#[async_trait]
pub trait ScreeningStore: Send + Sync {
    async fn get(&self, candidate_id: &str, jd_hash: &str) -> Result<Option<ScreeningResult>, StoreError>;

    /// Replaces any prior record. An existing HR decision and notes survive the replacement.
    async fn put(&self, result: ScreeningResult) -> Result<ScreeningResult, StoreError>;

    /// Deletes the record so the next run recomputes it. Returns whether a record existed.
    async fn invalidate(&self, candidate_id: &str, jd_hash: &str) -> Result<bool, StoreError>;

    /// All records for one job description, ordered by rank.
    async fn results_for_job(&self, jd_hash: &str) -> Result<Vec<ScreeningResult>, StoreError>;

    /// Sets the decision; notes are only replaced when given.
    async fn record_hr_decision(
        &self,
        candidate_id: &str,
        jd_hash: &str,
        decision: HrDecision,
        notes: Option<String>,
    ) -> Result<ScreeningResult, StoreError>;

    /// Makes `jd_text` the single active job description, reusing the record with the same hash.
    async fn activate_job(&self, jd_text: &str) -> Result<JobDescription, StoreError>;

    async fn active_job(&self) -> Result<Option<JobDescription>, StoreError>;
}

#[derive(Default)]
struct Inner {
    results: HashMap<(String, String), ScreeningResult>,
    jobs: Vec<JobDescription>,
}

/// Process-local store for tests and database-less runs.
#[derive(Default)]
pub struct MemoryScreeningStore {
    inner: Mutex<Inner>,
}

impl MemoryScreeningStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(candidate_id: &str, jd_hash: &str) -> (String, String) {
    (candidate_id.to_string(), jd_hash.to_string())
}

#[async_trait]
impl ScreeningStore for MemoryScreeningStore {
    async fn get(&self, candidate_id: &str, jd_hash: &str) -> Result<Option<ScreeningResult>, StoreError> {
        Ok(self.inner.lock().results.get(&key(candidate_id, jd_hash)).cloned())
    }

    async fn put(&self, mut result: ScreeningResult) -> Result<ScreeningResult, StoreError> {
        let mut inner = self.inner.lock();
        let k = key(&result.candidate_id, &result.jd_hash);
        if let Some(prior) = inner.results.remove(&k) {
            result.carry_forward(&prior);
        }
        inner.results.insert(k, result.clone());
        Ok(result)
    }

    async fn invalidate(&self, candidate_id: &str, jd_hash: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().results.remove(&key(candidate_id, jd_hash)).is_some())
    }

    async fn results_for_job(&self, jd_hash: &str) -> Result<Vec<ScreeningResult>, StoreError> {
        let mut results: Vec<ScreeningResult> = self
            .inner
            .lock()
            .results
            .values()
            .filter(|r| r.jd_hash == jd_hash)
            .cloned()
            .collect();
        results.sort_by_key(|r| r.rank);
        Ok(results)
    }

    async fn record_hr_decision(
        &self,
        candidate_id: &str,
        jd_hash: &str,
        decision: HrDecision,
        notes: Option<String>,
    ) -> Result<ScreeningResult, StoreError> {
        let mut inner = self.inner.lock();
        let record = inner
            .results
            .get_mut(&key(candidate_id, jd_hash))
            .ok_or_else(|| StoreError::NotFound {
                candidate_id: candidate_id.to_string(),
                jd_hash: jd_hash.to_string(),
            })?;
        record.hr_decision = Some(decision);
        if notes.is_some() {
            record.hr_notes = notes;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn activate_job(&self, jd_text: &str) -> Result<JobDescription, StoreError> {
        let candidate = JobDescription::new(jd_text);
        let mut inner = self.inner.lock();
        for job in inner.jobs.iter_mut() {
            job.is_active = job.jd_hash == candidate.jd_hash;
        }
        match inner.jobs.iter().find(|j| j.jd_hash == candidate.jd_hash) {
            Some(existing) => Ok(existing.clone()),
            None => {
                inner.jobs.push(candidate.clone());
                Ok(candidate)
            }
        }
    }

    async fn active_job(&self) -> Result<Option<JobDescription>, StoreError> {
        Ok(self.inner.lock().jobs.iter().find(|j| j.is_active).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::models::testing::make_result;

    #[tokio::test]
    async fn test_put_preserves_hr_decision() {
        let store = MemoryScreeningStore::new();
        store.put(make_result("C001", "h1", 1)).await.unwrap();
        store
            .record_hr_decision("C001", "h1", HrDecision::Approved, Some("ship it".to_string()))
            .await
            .unwrap();

        let replaced = store.put(make_result("C001", "h1", 3)).await.unwrap();

        assert_eq!(replaced.hr_decision, Some(HrDecision::Approved));
        assert_eq!(replaced.hr_notes.as_deref(), Some("ship it"));
        let stored = store.get("C001", "h1").await.unwrap().unwrap();
        assert_eq!(stored.rank, 3);
        assert_eq!(stored.hr_decision, Some(HrDecision::Approved));
    }

    #[tokio::test]
    async fn test_hr_call_overwrites_decision_and_keeps_notes_when_absent() {
        let store = MemoryScreeningStore::new();
        store.put(make_result("C001", "h1", 1)).await.unwrap();
        store
            .record_hr_decision("C001", "h1", HrDecision::Approved, Some("first".to_string()))
            .await
            .unwrap();

        let updated = store
            .record_hr_decision("C001", "h1", HrDecision::OnHold, None)
            .await
            .unwrap();
        assert_eq!(updated.hr_decision, Some(HrDecision::OnHold));
        assert_eq!(updated.hr_notes.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_hr_decision_on_missing_record_is_not_found() {
        let store = MemoryScreeningStore::new();
        let err = store
            .record_hr_decision("C404", "h1", HrDecision::Rejected, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalidate_removes_only_that_pair() {
        let store = MemoryScreeningStore::new();
        store.put(make_result("C001", "h1", 1)).await.unwrap();
        store.put(make_result("C001", "h2", 1)).await.unwrap();

        assert!(store.invalidate("C001", "h1").await.unwrap());
        assert!(!store.invalidate("C001", "h1").await.unwrap());
        assert!(store.get("C001", "h1").await.unwrap().is_none());
        assert!(store.get("C001", "h2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_results_for_job_sorted_by_rank() {
        let store = MemoryScreeningStore::new();
        store.put(make_result("C003", "h1", 3)).await.unwrap();
        store.put(make_result("C001", "h1", 1)).await.unwrap();
        store.put(make_result("C002", "h1", 2)).await.unwrap();
        store.put(make_result("C009", "other", 1)).await.unwrap();

        let ids: Vec<String> = store
            .results_for_job("h1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.candidate_id)
            .collect();
        assert_eq!(ids, vec!["C001", "C002", "C003"]);
    }

    #[tokio::test]
    async fn test_activate_dedups_by_hash_and_keeps_single_active() {
        let store = MemoryScreeningStore::new();
        let first = store.activate_job("AI Engineer").await.unwrap();
        store.activate_job("Data Engineer").await.unwrap();
        let again = store.activate_job("AI Engineer").await.unwrap();

        assert_eq!(first.jd_hash, again.jd_hash);
        let active = store.active_job().await.unwrap().unwrap();
        assert_eq!(active.jd_hash, first.jd_hash);
        assert_eq!(store.inner.lock().jobs.len(), 2);
        assert_eq!(store.inner.lock().jobs.iter().filter(|j| j.is_active).count(), 1);
    }
}
