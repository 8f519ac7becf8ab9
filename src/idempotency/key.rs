use sha2::{Digest, Sha256};
use std::fmt;

use super::error::IdempotencyError;

/// Configuration for composite key derivation.
#[derive(Debug, Clone)]
pub struct KeyComposerConfig {
    /// Prefix for composed keys
    pub key_prefix: String,
    /// Maximum accepted length of the client-supplied key, in characters
    pub max_key_length: usize,
}

impl Default for KeyComposerConfig {
    fn default() -> Self {
        Self {
            key_prefix: "idem".to_string(),
            max_key_length: 255,
        }
    }
}

/// Cache key derived from (route, client key, request body).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CompositeKey(String);

impl CompositeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives bounded-length composite keys using SHA-256.
#[derive(Debug, Clone)]
pub struct IdempotencyKeyComposer {
    config: KeyComposerConfig,
}

impl IdempotencyKeyComposer {
    pub fn new(config: KeyComposerConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(KeyComposerConfig::default())
    }

    /// Checks a raw header value and returns the trimmed client key.
    pub fn validate_client_key(&self, raw: &str) -> Result<String, IdempotencyError> {
        let key = raw.trim();

        if key.is_empty() {
            return Err(IdempotencyError::MissingKey);
        }
        if key.chars().count() > self.config.max_key_length {
            return Err(IdempotencyError::KeyTooLarge {
                max: self.config.max_key_length,
            });
        }
        if key.chars().any(char::is_control) {
            return Err(IdempotencyError::InvalidKey(
                "control characters are not allowed".to_string(),
            ));
        }

        Ok(key.to_string())
    }

    /// Composes the cache key for a request.
    ///
    /// Path and client key are case-folded; the body contributes only its
    /// digest. Every component is length-prefixed, so no choice of body or key
    /// can make two distinct triples hash alike through a shared separator.
    pub fn compose(
        &self,
        route: &str,
        client_key: &str,
        body: &[u8],
    ) -> Result<CompositeKey, IdempotencyError> {
        let client_key = self.validate_client_key(client_key)?.to_lowercase();
        let route = normalize_path(route);
        let body_digest = Sha256::digest(body);

        let mut hasher = Sha256::new();
        update_framed(&mut hasher, route.as_bytes());
        update_framed(&mut hasher, client_key.as_bytes());
        update_framed(&mut hasher, &body_digest);
        let hash_hex = hex::encode(hasher.finalize());

        Ok(CompositeKey(format!("{}:{}", self.config.key_prefix, hash_hex)))
    }
}

/// Lowercases a path and strips any trailing slash.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_lowercase()
    }
}

fn update_framed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}
