mod agents;
mod config;
mod db;
mod embedding;
mod errors;
mod evidence;
mod hashing;
mod llm_client;
mod models;
mod persist;
mod pipeline;
mod routes;
mod screening;
mod state;
mod vector_store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embedding::gemini::GeminiEmbedder;
use crate::embedding::{EmbeddingCache, EmbeddingService};
use crate::evidence::github::GitHubClient;
use crate::evidence::EvidenceExtractor;
use crate::llm_client::LlmClient;
use crate::models::candidate::load_roster;
use crate::pipeline::Orchestrator;
use crate::routes::build_router;
use crate::screening::{PgScreeningStore, ScreeningService};
use crate::state::AppState;
use crate::vector_store::{EvidenceVectorStore, ResumeVectorStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgScreeningStore::new(db));

    std::fs::create_dir_all(&config.storage_dir)
        .with_context(|| format!("creating storage dir {}", config.storage_dir.display()))?;

    let cache = Arc::new(EmbeddingCache::open(config.storage_dir.join("embedding_cache.json")));
    let embeddings = EmbeddingService::new(
        Arc::new(GeminiEmbedder::new(config.google_api_key.clone())),
        cache.clone(),
        config.embedding_dimension,
    );
    info!("Embedding cache loaded with {} entries", cache.len());

    let resume_store = Arc::new(ResumeVectorStore::open(&config.storage_dir, config.embedding_dimension));
    let evidence_store = Arc::new(EvidenceVectorStore::open(&config.storage_dir, config.embedding_dimension));

    if config.github_token.is_none() {
        warn!("GITHUB_TOKEN not set, code-host calls are unauthenticated and rate limited");
    }
    let extractor = Arc::new(EvidenceExtractor::new(Arc::new(GitHubClient::new(
        config.github_token.clone(),
    ))));

    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let orchestrator = Orchestrator::new(
        embeddings,
        resume_store,
        evidence_store,
        extractor,
        Arc::new(llm),
        config.pipeline_settings(),
    );

    let candidates = load_roster(&config.candidates_path)?;
    let default_jd = std::fs::read_to_string(&config.job_description_path)
        .with_context(|| format!("reading {}", config.job_description_path.display()))?;
    info!("Loaded {} candidates", candidates.len());

    let state = AppState {
        screening: ScreeningService::new(orchestrator, store, candidates, default_jd),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = cache.flush() {
        warn!("Could not flush embedding cache on shutdown: {e}");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {e}");
    }
    info!("Shutting down");
}
