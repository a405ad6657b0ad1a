use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::hashing::content_digest;

/// A job description identified by the digest of its text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobDescription {
    pub jd_hash: String,
    pub jd_text: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl JobDescription {
    pub fn new(jd_text: impl Into<String>) -> Self {
        let jd_text = jd_text.into();
        Self {
            jd_hash: content_digest(&jd_text),
            jd_text,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
