use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::embedding::{EmbeddingError, EmbeddingProvider};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Produces 3072-wide vectors; the dimension is pinned in config.
pub const EMBEDDING_MODEL: &str = "gemini-embedding-001";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Google Gemini embedContent client.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GEMINI_API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn model(&self) -> &str {
        EMBEDDING_MODEL
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/models/{}:embedContent", self.base_url, EMBEDDING_MODEL);
        let body = EmbedRequest {
            model: format!("models/{EMBEDDING_MODEL}"),
            content: EmbedContent {
                parts: vec![EmbedPart { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Embedding API returned {status}: {body}");
            return Err(EmbeddingError::Provider(format!("status {status}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;
        Ok(parsed.embedding.values)
    }
}
