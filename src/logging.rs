//! Request and response logging with automatic secret redaction.
//!
//! Sensitive header values (authorization, API keys, tokens) are replaced
//! with a redaction marker before anything reaches the log output. Bodies
//! are logged at trace level only, truncated to a configurable length.

use crate::transport::{WireRequest, WireResponse};
use tracing::{debug, info, trace};

/// Checks if a header name should be redacted
#[must_use]
pub fn should_redact_header(header_name: &str) -> bool {
    let lower = header_name.to_lowercase();
    matches!(
        lower.as_str(),
        "authorization"
            | "x-api-key"
            | "x-access-token"
            | "x-auth-token"
            | "api-key"
            | "api_key"
            | "token"
            | "secret"
            | "password"
            | "x-secret-token"
            | "x-webhook-secret"
    )
}

/// Logs an outbound wire request.
pub fn log_request(request: &WireRequest) {
    info!(
        target: "reqchain::executor",
        "→ {} {}",
        request.method.as_str().to_uppercase(),
        request.url
    );

    debug!(target: "reqchain::executor", "Request headers:");
    for (name, value) in &request.headers {
        let display_value = if should_redact_header(name) {
            "[REDACTED]"
        } else {
            value.as_str()
        };
        debug!(target: "reqchain::executor", "  {}: {}", name, display_value);
    }
}

/// Logs an inbound wire response.
pub fn log_response(response: &WireResponse, duration_ms: u128, max_body_len: usize) {
    info!(
        target: "reqchain::executor",
        "← {} ({}ms)",
        response.status,
        duration_ms
    );

    debug!(target: "reqchain::executor", "Response headers:");
    for (name, value) in &response.headers {
        let display_value = if should_redact_header(name) {
            "[REDACTED]"
        } else {
            value.as_str()
        };
        debug!(target: "reqchain::executor", "  {}: {}", name, display_value);
    }

    let body = response.text();
    if body.len() > max_body_len {
        trace!(
            target: "reqchain::executor",
            "Response body: {} (truncated at {} chars)",
            &body[..max_body_len],
            max_body_len
        );
    } else if !body.is_empty() {
        trace!(target: "reqchain::executor", "Response body: {}", body);
    }
}

/// Gets the maximum logged body length from `REQCHAIN_LOG_MAX_BODY`.
#[must_use]
pub fn get_max_body_len() -> usize {
    std::env::var("REQCHAIN_LOG_MAX_BODY")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_redact_header_authorization() {
        assert!(should_redact_header("Authorization"));
        assert!(should_redact_header("AUTHORIZATION"));
        assert!(should_redact_header("authorization"));
    }

    #[test]
    fn test_should_redact_header_api_key_variants() {
        assert!(should_redact_header("X-API-Key"));
        assert!(should_redact_header("api-key"));
        assert!(should_redact_header("api_key"));
    }

    #[test]
    fn test_should_not_redact_regular_header() {
        assert!(!should_redact_header("Content-Type"));
        assert!(!should_redact_header("User-Agent"));
        assert!(!should_redact_header("Accept"));
    }

    #[test]
    fn test_get_max_body_len_default() {
        std::env::remove_var("REQCHAIN_LOG_MAX_BODY");
        assert_eq!(get_max_body_len(), 1000);
    }
}
