//! Serialized form of a cached execution result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored execution result. Raw-mode entries keep the wire body and are
/// re-resolved on revival; typed-mode entries keep the resolved payload and
/// are revived by deserialization alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: Value,
    pub is_raw: bool,
    /// Original wire body, carried for raw entries so callers keep access to
    /// the untouched response after a hit.
    pub raw: Option<String>,
}

impl CacheEntry {
    #[must_use]
    pub fn raw(body: String) -> Self {
        Self {
            payload: Value::Null,
            is_raw: true,
            raw: Some(body),
        }
    }

    #[must_use]
    pub fn typed(payload: Value) -> Self {
        Self {
            payload,
            is_raw: false,
            raw: None,
        }
    }

    /// Keeps the wire body alongside a typed payload, so raw accessors stay
    /// usable on typed-mode hits.
    #[must_use]
    pub fn with_raw(mut self, raw: String) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Approximate stored size, used for the write-size guard.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        if self.is_raw {
            self.raw.as_ref().map_or(0, String::len)
        } else {
            serde_json::to_string(&self.payload).map_or(0, |s| s.len())
        }
    }
}
