//! Result envelope returned to callers.

use crate::error::Error;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

/// A binary/attachment response. Never cached; typed reconstruction is
/// skipped entirely for these.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl FileHandle {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The resolved value produced for a caller after dispatch and response
/// interpretation.
#[derive(Debug, Clone)]
pub enum Resolved<T> {
    /// Typed reconstruction of a JSON payload.
    Typed(T),
    /// Raw text passthrough for non-JSON bodies.
    Text(String),
    /// Binary/attachment payload.
    File(FileHandle),
}

impl<T> Resolved<T> {
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Typed(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Serialize> Resolved<T> {
    /// Serializable form for typed-mode cache entries. Files are never
    /// cacheable.
    pub(crate) fn cache_payload(&self) -> Option<Value> {
        match self {
            Self::Typed(value) => serde_json::to_value(value).ok(),
            Self::Text(text) => Some(Value::String(text.clone())),
            Self::File(_) => None,
        }
    }
}

/// The envelope handed back for every execution: resolved value (or none on
/// error), message, numeric status, optional structured details, and the raw
/// wire body for later retrieval.
#[derive(Debug)]
pub struct ClientResponse<T> {
    resolved: Option<Resolved<T>>,
    message: String,
    status: u16,
    details: Option<Value>,
    debug: Option<Value>,
    raw: Option<String>,
}

impl<T> ClientResponse<T> {
    pub(crate) fn success(
        resolved: Resolved<T>,
        message: &str,
        status: u16,
        raw: Option<String>,
    ) -> Self {
        Self {
            resolved: Some(resolved),
            message: message.to_string(),
            status,
            details: None,
            debug: None,
            raw,
        }
    }

    pub(crate) fn failure(status: u16, message: &str, details: Option<Value>) -> Self {
        Self {
            resolved: None,
            message: message.to_string(),
            status,
            details,
            debug: None,
            raw: None,
        }
    }

    pub(crate) fn with_debug(mut self, debug: Option<Value>) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn with_raw(mut self, raw: Option<String>) -> Self {
        self.raw = raw;
        self
    }

    /// The typed result, if resolution produced one.
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        self.resolved.as_ref().and_then(Resolved::value)
    }

    #[must_use]
    pub fn resolved(&self) -> Option<&Resolved<T>> {
        self.resolved.as_ref()
    }

    #[must_use]
    pub fn file(&self) -> Option<&FileHandle> {
        match &self.resolved {
            Some(Resolved::File(file)) => Some(file),
            _ => None,
        }
    }

    /// An execution is an error exactly when nothing was resolved.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.resolved.is_none()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    #[must_use]
    pub fn debug_info(&self) -> Option<&Value> {
        self.debug.as_ref()
    }

    /// The untouched wire body, available on live calls and on raw-mode
    /// cache hits.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Persists the raw wire body to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedData`] when no raw body is available, or an
    /// I/O error from the write.
    pub async fn save_raw_as(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let raw = self.raw.as_ref().ok_or_else(|| Error::UnexpectedData {
            reason: "no raw response body available".to_string(),
        })?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }
}

impl<T: Serialize> ClientResponse<T> {
    /// Persists the resolved payload to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedData`] for file results or errored
    /// responses, serialization errors, or an I/O error from the write.
    pub async fn save_as(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let payload = self
            .resolved
            .as_ref()
            .and_then(Resolved::cache_payload)
            .ok_or_else(|| Error::UnexpectedData {
                reason: "no serializable resolved payload available".to_string(),
            })?;
        let content = serde_json::to_vec_pretty(&payload)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// JSON form of the envelope: `{result, error, message, details?, debug?}`.
    #[must_use]
    pub fn to_envelope(&self) -> Value {
        let result = match &self.resolved {
            Some(Resolved::Typed(value)) => serde_json::to_value(value).unwrap_or(Value::Null),
            Some(Resolved::Text(text)) => Value::String(text.clone()),
            Some(Resolved::File(file)) => json!({
                "file": file.file_name,
                "content_type": file.content_type,
                "size": file.len(),
            }),
            None => Value::Null,
        };

        let mut envelope = json!({
            "result": result,
            "error": self.is_error(),
            "message": self.message,
        });
        if self.is_error() {
            if let Some(details) = &self.details {
                envelope["details"] = details.clone();
            }
        }
        if let Some(debug) = &self.debug {
            envelope["debug"] = debug.clone();
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn success_envelope_exposes_result() {
        let response = ClientResponse::success(
            Resolved::Typed(User {
                id: 1,
                name: "Ada".into(),
            }),
            "Successful",
            200,
            Some(r#"{"id":1,"name":"Ada"}"#.into()),
        );
        assert!(!response.is_error());
        assert_eq!(response.result().unwrap().id, 1);
        assert_eq!(response.status(), 200);
        let envelope = response.to_envelope();
        assert_eq!(envelope["error"], false);
        assert_eq!(envelope["result"]["name"], "Ada");
    }

    #[test]
    fn failure_envelope_has_null_result_and_details() {
        let response: ClientResponse<User> = ClientResponse::failure(
            422,
            "Data error, please contact the service administrator",
            Some(json!({"type": "User"})),
        );
        assert!(response.is_error());
        assert!(response.result().is_none());
        let envelope = response.to_envelope();
        assert_eq!(envelope["error"], true);
        assert_eq!(envelope["result"], Value::Null);
        assert_eq!(envelope["details"]["type"], "User");
    }

    #[test]
    fn file_results_are_not_cache_serializable() {
        let resolved: Resolved<User> = Resolved::File(FileHandle {
            file_name: Some("report.pdf".into()),
            content_type: "application/pdf".into(),
            bytes: Bytes::from_static(b"%PDF"),
        });
        assert!(resolved.is_file());
        assert!(resolved.cache_payload().is_none());
    }

    #[tokio::test]
    async fn save_raw_as_writes_wire_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let response: ClientResponse<User> = ClientResponse::success(
            Resolved::Text("plain".into()),
            "Successful",
            200,
            Some("plain".into()),
        );
        response.save_raw_as(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "plain");
    }
}
