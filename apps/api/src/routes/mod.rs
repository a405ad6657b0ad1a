pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/screen", post(handlers::handle_screen))
        .route("/api/v1/screen/stream", post(handlers::handle_screen_stream))
        .route("/api/v1/results", get(handlers::handle_results))
        .route(
            "/api/v1/re-evaluate/:candidate_id",
            post(handlers::handle_re_evaluate),
        )
        .route("/api/v1/hr-decision", post(handlers::handle_hr_decision))
        .route(
            "/api/v1/job-description",
            put(handlers::handle_job_description),
        )
        .with_state(state)
}
