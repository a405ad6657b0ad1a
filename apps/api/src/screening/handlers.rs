use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::job::JobDescription;
use crate::screening::models::{HrDecision, ScreeningReport, ScreeningResult};
use crate::screening::stream::screening_stream;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HrDecisionRequest {
    pub candidate_id: String,
    pub decision: HrDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct JobDescriptionRequest {
    pub jd_text: String,
}

/// POST /api/v1/screen
pub async fn handle_screen(State(state): State<AppState>) -> Result<Json<ScreeningReport>, AppError> {
    Ok(Json(state.screening.run_screening().await?))
}

/// POST /api/v1/screen/stream
pub async fn handle_screen_stream(State(state): State<AppState>) -> Response {
    let tick = Duration::from_millis(state.config.stream_tick_ms);
    let body = Body::from_stream(screening_stream(state.screening.clone(), tick));
    ([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response()
}

/// GET /api/v1/results
pub async fn handle_results(State(state): State<AppState>) -> Result<Json<ScreeningReport>, AppError> {
    Ok(Json(state.screening.stored_results().await?))
}

/// POST /api/v1/re-evaluate/:candidate_id
pub async fn handle_re_evaluate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<ScreeningReport>, AppError> {
    Ok(Json(state.screening.re_evaluate(&candidate_id).await?))
}

/// POST /api/v1/hr-decision
pub async fn handle_hr_decision(
    State(state): State<AppState>,
    Json(req): Json<HrDecisionRequest>,
) -> Result<Json<ScreeningResult>, AppError> {
    let result = state
        .screening
        .submit_hr_decision(&req.candidate_id, req.decision, req.notes)
        .await?;
    Ok(Json(result))
}

/// PUT /api/v1/job-description
pub async fn handle_job_description(
    State(state): State<AppState>,
    Json(req): Json<JobDescriptionRequest>,
) -> Result<Json<JobDescription>, AppError> {
    Ok(Json(state.screening.activate_job_description(&req.jd_text).await?))
}
