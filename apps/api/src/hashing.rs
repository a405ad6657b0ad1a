//! Content digests used as cache keys and job-description identity.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the UTF-8 bytes of `text`.
pub fn content_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
