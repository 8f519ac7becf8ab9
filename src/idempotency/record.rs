use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response persisted for replay, created only after a successful execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub status_code: u16,
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn new(status_code: u16, body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            status_code,
            body,
            content_type: content_type.into(),
            created_at: Utc::now(),
        }
    }
}

/// Value stored under a composite key: either a lease marker or a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CacheEntry {
    InFlight { owner: String },
    Completed { record: IdempotencyRecord },
}

impl CacheEntry {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

mod base64_body {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
