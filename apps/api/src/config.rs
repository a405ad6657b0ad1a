use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::pipeline::PipelineSettings;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub google_api_key: String,
    pub github_token: Option<String>,
    pub storage_dir: PathBuf,
    pub candidates_path: PathBuf,
    pub job_description_path: PathBuf,
    pub embedding_dimension: usize,
    pub top_n: usize,
    pub evidence_top_k: usize,
    pub stream_tick_ms: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            google_api_key: require_env("GOOGLE_API_KEY")?,
            github_token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            storage_dir: env_or("STORAGE_DIR", "storage").into(),
            candidates_path: env_or("CANDIDATES_PATH", "data/candidates.json").into(),
            job_description_path: env_or("JOB_DESCRIPTION_PATH", "data/job_description.txt").into(),
            embedding_dimension: parse_env("EMBEDDING_DIMENSION", 3072)?,
            top_n: parse_env("TOP_N", 3)?,
            evidence_top_k: parse_env("EVIDENCE_TOP_K", 3)?,
            stream_tick_ms: parse_env("STREAM_TICK_MS", 400)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            top_n: self.top_n,
            evidence_top_k: self.evidence_top_k,
            ..PipelineSettings::default()
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
