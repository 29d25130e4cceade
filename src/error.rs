use crate::constants;
use crate::transport::TransportError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("HTTP error status {status}")]
    HttpStatus { status: u16, body: String },
    #[error("response data does not match the declaration of `{type_name}`")]
    DtoValidation {
        type_name: String,
        errors: Vec<String>,
    },
    #[error("unexpected response payload: {reason}")]
    UnexpectedData { reason: String },
    /// Not a failure: a validation hook decided the response was incomplete
    /// and another attempt should be made.
    #[error("another attempt requested: {message}")]
    RetryRequested { message: String },
    #[error("unable to extract a collection at `{path}` for `{type_name}`")]
    ExtractPath { path: String, type_name: String },
    #[error("request type `{type_name}` is not registered with any resource")]
    UnresolvedChain { type_name: String },
    #[error("missing path parameter `{name}`")]
    MissingPathParameter { name: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps a typed-construction failure with the declared type name attached.
    #[must_use]
    pub fn dto_validation(type_name: &str, source: &serde_json::Error) -> Self {
        Self::DtoValidation {
            type_name: type_name.to_string(),
            errors: vec![source.to_string()],
        }
    }

    /// Numeric status the error maps to in the result envelope.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Transport(_) => 502,
            Self::HttpStatus { status, .. } => *status,
            Self::DtoValidation { .. } => 422,
            Self::RetryRequested { .. } => 504,
            Self::UnexpectedData { .. }
            | Self::ExtractPath { .. }
            | Self::UnresolvedChain { .. }
            | Self::MissingPathParameter { .. }
            | Self::Config(_)
            | Self::Json(_)
            | Self::Io(_) => 500,
        }
    }

    /// Generic human-readable message for callers. Diagnostic detail is only
    /// exposed through [`Error::details`] in debug mode.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Transport(_) => constants::MSG_GATEWAY_UNAVAILABLE,
            Self::HttpStatus { status, .. } if *status < 500 => constants::MSG_BAD_REQUEST,
            Self::HttpStatus { .. } => constants::MSG_SERVER_ERROR,
            Self::DtoValidation { .. } => constants::MSG_UNPROCESSABLE,
            _ => constants::MSG_INTERNAL,
        }
    }

    /// Structured diagnostics for the envelope's debug details.
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::HttpStatus { status, body } => {
                // The remote body is diagnostic gold; keep it verbatim,
                // decoded as JSON when possible.
                let body_value = serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.clone()));
                json!({ "status": status, "body": body_value })
            }
            Self::DtoValidation { type_name, errors } => {
                json!({ "type": type_name, "errors": errors })
            }
            other => json!({ "message": other.to_string() }),
        }
    }

    /// Whether the error belongs to the documented taxonomy. Unclassified
    /// faults may be rethrown instead of enveloped when the client enables
    /// debug-rethrow.
    #[must_use]
    pub fn is_classified(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Json(_) | Self::Io(_))
    }
}
