//! Request trait and the per-call invocation wrapper.

use crate::declaration::RequestDeclaration;
use crate::error::Error;
use crate::response::{ClientResponse, Resolved};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// A declared API request. The value itself is plain serializable data; all
/// static metadata lives on the [`RequestDeclaration`] and per-call state on
/// the [`Invocation`] wrapper.
///
/// Every hook has an identity default, so a request type participates in a
/// hook simply by overriding it.
pub trait ApiRequest: Serialize + Send + Sync + 'static {
    /// Declared result type; `serde_json::Value` keeps a request untyped.
    type Output: DeserializeOwned + Serialize + Send + Sync + 'static;

    /// Static metadata, built once per type.
    fn declaration() -> &'static RequestDeclaration;

    /// TTL computed from the actual instance state; overrides the declared
    /// static TTL.
    fn cache_ttl(&self) -> Option<Duration> {
        None
    }

    /// Dynamic tags computed from instance fields, e.g. `user:123`. Unioned
    /// with the declared static tags.
    fn cache_tags(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether this particular resolved value may be written to cache.
    /// Files are rejected upstream regardless.
    fn should_cache(&self, _resolved: &Resolved<Self::Output>) -> bool {
        true
    }

    /// Innermost transform hook, applied after the chain's.
    fn transform(&self, value: Value) -> Result<Value, Error> {
        Ok(value)
    }

    /// Innermost validate hook. Returning [`Error::RetryRequested`] consumes
    /// an attempt instead of failing the call.
    fn validate(&self, _value: &Value) -> Result<(), Error> {
        Ok(())
    }

    /// Per-element mapping for `collection_of` construction.
    fn map_element(&self, value: Value) -> Result<Value, Error> {
        Ok(value)
    }

    /// Side-effecting hook run once after successful resolution, including
    /// cache hits.
    fn post_process(&self, _resolved: &mut Resolved<Self::Output>) {}

    /// Final hook on the assembled envelope, just before it is returned.
    fn before_return(&self, _response: &mut ClientResponse<Self::Output>) {}
}

/// Instance-level cache control for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheDirective {
    /// No explicit directive; declared and client-wide policy decide.
    #[default]
    Inherit,
    /// Never read from cache for this call.
    Skip,
    /// Always call remote, then (re)write the cache entry.
    ForceRefresh,
}

impl CacheDirective {
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        !matches!(self, Self::Inherit)
    }
}

/// One invocation of a request: the caller-supplied field values plus
/// per-call flags. Created per call; the request value stays untouched.
#[derive(Debug)]
pub struct Invocation<R: ApiRequest> {
    request: R,
    cache: CacheDirective,
    timeout: Option<Duration>,
}

impl<R: ApiRequest> Invocation<R> {
    #[must_use]
    pub fn new(request: R) -> Self {
        Self {
            request,
            cache: CacheDirective::Inherit,
            timeout: None,
        }
    }

    /// Never read from cache for this call. Whether a write is still
    /// permitted is governed by the client's `write_on_skip` setting.
    #[must_use]
    pub fn skip_cache(mut self) -> Self {
        self.cache = CacheDirective::Skip;
        self
    }

    /// Bypass the cache read but force a fresh call plus a cache write.
    #[must_use]
    pub fn force_refresh(mut self) -> Self {
        self.cache = CacheDirective::ForceRefresh;
        self
    }

    /// Per-call timeout override, winning over the declaration and client.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn request(&self) -> &R {
        &self.request
    }

    #[must_use]
    pub fn cache_directive(&self) -> CacheDirective {
        self.cache
    }

    #[must_use]
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }
}

impl<R: ApiRequest> From<R> for Invocation<R> {
    fn from(request: R) -> Self {
        Self::new(request)
    }
}
