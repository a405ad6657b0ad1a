use crate::config::Config;
use crate::screening::ScreeningService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub screening: ScreeningService,
    pub config: Config,
}
