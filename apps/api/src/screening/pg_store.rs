use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::models::job::JobDescription;
use crate::screening::models::{HrDecision, ScreeningResult};
use crate::screening::store::{ScreeningStore, StoreError};

/// Row shape of `screening_results`; the evaluation is a JSONB document.
#[derive(Debug, Clone, FromRow)]
struct ScreeningResultRow {
    candidate_id: String,
    jd_hash: String,
    rank: i32,
    name: String,
    ranking_score: f64,
    repository_url: Option<String>,
    evaluation: Option<Value>,
    hr_decision: Option<String>,
    hr_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ScreeningResultRow> for ScreeningResult {
    type Error = StoreError;

    fn try_from(row: ScreeningResultRow) -> Result<Self, Self::Error> {
        let evaluation = row.evaluation.map(serde_json::from_value).transpose()?;
        Ok(ScreeningResult {
            candidate_id: row.candidate_id,
            jd_hash: row.jd_hash,
            rank: row.rank.max(0) as usize,
            name: row.name,
            ranking_score: row.ranking_score,
            repository_url: row.repository_url,
            evaluation,
            hr_decision: row.hr_decision.as_deref().and_then(HrDecision::parse),
            hr_notes: row.hr_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgScreeningStore {
    pool: PgPool,
}

impl PgScreeningStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScreeningStore for PgScreeningStore {
    async fn get(&self, candidate_id: &str, jd_hash: &str) -> Result<Option<ScreeningResult>, StoreError> {
        let row: Option<ScreeningResultRow> =
            sqlx::query_as("SELECT * FROM screening_results WHERE candidate_id = $1 AND jd_hash = $2")
                .bind(candidate_id)
                .bind(jd_hash)
                .fetch_optional(&self.pool)
                .await?;
        row.map(ScreeningResult::try_from).transpose()
    }

    async fn put(&self, mut result: ScreeningResult) -> Result<ScreeningResult, StoreError> {
        let evaluation = result.evaluation.as_ref().map(serde_json::to_value).transpose()?;
        let mut tx = self.pool.begin().await?;

        let prior: Option<ScreeningResultRow> = sqlx::query_as(
            "SELECT * FROM screening_results WHERE candidate_id = $1 AND jd_hash = $2 FOR UPDATE",
        )
        .bind(&result.candidate_id)
        .bind(&result.jd_hash)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(prior) = prior {
            result.carry_forward(&ScreeningResult::try_from(prior)?);
        }

        // Delete-then-insert so a superseded record never lingers beside its replacement.
        sqlx::query("DELETE FROM screening_results WHERE candidate_id = $1 AND jd_hash = $2")
            .bind(&result.candidate_id)
            .bind(&result.jd_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO screening_results
                (candidate_id, jd_hash, rank, name, ranking_score, repository_url,
                 evaluation, hr_decision, hr_notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&result.candidate_id)
        .bind(&result.jd_hash)
        .bind(result.rank as i32)
        .bind(&result.name)
        .bind(result.ranking_score)
        .bind(&result.repository_url)
        .bind(evaluation)
        .bind(result.hr_decision.map(|d| d.as_str()))
        .bind(&result.hr_notes)
        .bind(result.created_at)
        .bind(result.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result)
    }

    async fn invalidate(&self, candidate_id: &str, jd_hash: &str) -> Result<bool, StoreError> {
        let deleted = sqlx::query("DELETE FROM screening_results WHERE candidate_id = $1 AND jd_hash = $2")
            .bind(candidate_id)
            .bind(jd_hash)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted > 0 {
            info!("Invalidated cached result for {candidate_id} under job {jd_hash}");
        }
        Ok(deleted > 0)
    }

    async fn results_for_job(&self, jd_hash: &str) -> Result<Vec<ScreeningResult>, StoreError> {
        let rows: Vec<ScreeningResultRow> =
            sqlx::query_as("SELECT * FROM screening_results WHERE jd_hash = $1 ORDER BY rank ASC")
                .bind(jd_hash)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(ScreeningResult::try_from).collect()
    }

    async fn record_hr_decision(
        &self,
        candidate_id: &str,
        jd_hash: &str,
        decision: HrDecision,
        notes: Option<String>,
    ) -> Result<ScreeningResult, StoreError> {
        let row: Option<ScreeningResultRow> = sqlx::query_as(
            r#"
            UPDATE screening_results
            SET hr_decision = $3,
                hr_notes = COALESCE($4, hr_notes),
                updated_at = NOW()
            WHERE candidate_id = $1 AND jd_hash = $2
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(jd_hash)
        .bind(decision.as_str())
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| StoreError::NotFound {
            candidate_id: candidate_id.to_string(),
            jd_hash: jd_hash.to_string(),
        })?;
        info!("HR decision {} recorded for {candidate_id}", decision.as_str());
        ScreeningResult::try_from(row)
    }

    async fn activate_job(&self, jd_text: &str) -> Result<JobDescription, StoreError> {
        let job = JobDescription::new(jd_text);
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE job_descriptions SET is_active = FALSE WHERE is_active AND jd_hash <> $1")
            .bind(&job.jd_hash)
            .execute(&mut *tx)
            .await?;

        let stored: JobDescription = sqlx::query_as(
            r#"
            INSERT INTO job_descriptions (jd_hash, jd_text, is_active, created_at)
            VALUES ($1, $2, TRUE, $3)
            ON CONFLICT (jd_hash) DO UPDATE SET is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(&job.jd_hash)
        .bind(&job.jd_text)
        .bind(job.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Active job description is now {}", stored.jd_hash);
        Ok(stored)
    }

    async fn active_job(&self) -> Result<Option<JobDescription>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM job_descriptions WHERE is_active LIMIT 1")
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(hr_decision: Option<&str>, evaluation: Option<Value>) -> ScreeningResultRow {
        ScreeningResultRow {
            candidate_id: "C001".to_string(),
            jd_hash: "h1".to_string(),
            rank: 1,
            name: "Candidate C001".to_string(),
            ranking_score: 71.5,
            repository_url: None,
            evaluation,
            hr_decision: hr_decision.map(str::to_string),
            hr_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_maps_hr_decision() {
        let result = ScreeningResult::try_from(make_row(Some("ON_HOLD"), None)).unwrap();
        assert_eq!(result.hr_decision, Some(HrDecision::OnHold));
        assert_eq!(result.rank, 1);
        assert!(result.evaluation.is_none());
    }

    #[test]
    fn test_malformed_evaluation_is_serialization_error() {
        let err = ScreeningResult::try_from(make_row(None, Some(serde_json::json!({"nope": 1})))).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
