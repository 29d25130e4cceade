//! Invocation chain links.
//!
//! A chain is the ordered `[client, resource..., request]` sequence that
//! participates in building and interpreting a call. Links are plain trait
//! objects; optional hooks are default methods, so a link participates in a
//! hook simply by overriding it.

use crate::error::Error;
use crate::transport::WireRequest;
use serde_json::{Map, Value};
use std::time::Duration;

/// One link of the invocation chain. Hook order is always outermost
/// (client) first; the request itself is the innermost link.
pub trait ChainLink: Send + Sync {
    fn name(&self) -> &str;

    /// Query parameters this link contributes. Inner links win on key
    /// collision.
    fn query_params(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Extra headers this link contributes.
    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Timeout suggestion; the request-level override still wins.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Invoked on the fully built wire request before it is sent.
    fn before_send(&self, _request: &mut WireRequest) -> Result<(), Error> {
        Ok(())
    }

    /// Reshapes the decoded JSON payload.
    fn transform(&self, value: Value) -> Result<Value, Error> {
        Ok(value)
    }

    /// Asserts correctness of the (already transformed) payload. Returning
    /// [`Error::RetryRequested`] consumes an attempt instead of failing.
    fn validate(&self, _value: &Value) -> Result<(), Error> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn ChainLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainLink").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct PlainResource;

    impl ChainLink for PlainResource {
        fn name(&self) -> &str {
            "plain"
        }
    }

    #[test]
    fn default_hooks_are_identity() {
        let link = PlainResource;
        let value = json!({"id": 7});
        assert_eq!(link.transform(value.clone()).unwrap(), value);
        assert!(link.validate(&value).is_ok());
        assert!(link.query_params().is_empty());
        assert!(link.timeout().is_none());
    }
}
