//! Outbound HTTP transport capability.
//!
//! The executor never talks to `reqwest` directly: it builds a [`WireRequest`]
//! and hands it to a [`Transport`]. Connection-level failures and HTTP error
//! statuses are kept distinct: the former surface as [`TransportError`], the
//! latter travel back inside [`WireResponse`] for the executor to classify.

use crate::constants;
use crate::declaration::Method;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the transport itself, before any HTTP status exists.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {reason}")]
    Connect { reason: String },
    #[error("request timed out: {reason}")]
    Timeout { reason: String },
    #[error("failed to build outbound request: {reason}")]
    Build { reason: String },
    #[error("failed to read response body: {reason}")]
    Body { reason: String },
}

impl TransportError {
    /// Connection-level failures are retry-eligible; build errors are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Timeout { .. })
    }
}

/// Request body encoding, selected by the most specific override
/// (request declaration, then client default).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyFormat {
    #[default]
    Json,
    Form,
    Multipart,
}

/// Encoded request body handed to the transport.
#[derive(Debug, Clone, Default)]
pub enum BodyPayload {
    #[default]
    None,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(Vec<(String, String)>),
}

/// A fully built wire-level call: placeholders substituted, query string
/// appended, headers merged across the chain.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: BodyPayload,
    pub timeout: Duration,
}

impl WireRequest {
    /// Replaces the value of a header, or appends it if absent.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        for (existing, v) in &mut self.headers {
            if existing.eq_ignore_ascii_case(name) {
                *v = value;
                return;
            }
        }
        self.headers.push((name.to_string(), value));
    }
}

/// Raw response as received from the wire. Header names are lowercased.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl WireResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header(constants::HEADER_CONTENT_TYPE).unwrap_or("")
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The outbound HTTP capability consumed by the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError>;
}

/// Default transport backed by `reqwest` with rustls.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the underlying client with the given connect timeout.
    /// Per-request timeouts come from the [`WireRequest`] itself.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the client cannot be constructed.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Build {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    fn classify(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                reason: error.to_string(),
            }
        } else if error.is_connect() {
            TransportError::Connect {
                reason: error.to_string(),
            }
        } else if error.is_builder() || error.is_request() {
            TransportError::Build {
                reason: error.to_string(),
            }
        } else {
            TransportError::Connect {
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match &request.body {
            BodyPayload::None => builder,
            BodyPayload::Json(value) => builder.json(value),
            BodyPayload::Form(pairs) => builder.form(pairs),
            BodyPayload::Multipart(pairs) => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in pairs {
                    form = form.text(name.clone(), value.clone());
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().await.map_err(Self::classify)?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    v.to_str().unwrap_or("").to_string(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body {
                reason: e.to_string(),
            })?;

        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}
