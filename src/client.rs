//! Client-wide configuration.

use crate::error::Error;
use crate::transport::BodyFormat;
use std::time::Duration;

/// What a cache entry stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// The raw wire body; hits re-run the full resolution pipeline.
    Raw,
    /// The resolved payload; hits revive the typed value directly.
    #[default]
    Typed,
}

/// Client-wide cache behaviour. Per-type declarations and per-call
/// directives layer on top of these defaults.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Master switch. `false` still allows force-refresh writes.
    pub enabled: bool,
    /// Fallback TTL when neither the instance nor the declaration sets one.
    /// `None` means entries never expire on their own.
    pub default_ttl: Option<Duration>,
    /// Whether POST endpoints participate in caching at all.
    pub post_idempotent: bool,
    /// Whether a skip-cache call still writes the fresh result back.
    pub write_on_skip: bool,
    pub mode: CacheMode,
    /// Upper bound on a serialized entry; larger results are not written.
    pub max_payload_bytes: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: None,
            post_idempotent: false,
            write_on_skip: false,
            mode: CacheMode::Typed,
            max_payload_bytes: None,
        }
    }
}

/// Static configuration of one client: base URL, defaults for the wire
/// layer, cache settings, and diagnostic switches.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub body_format: BodyFormat,
    pub cache: CacheSettings,
    /// Attach structured diagnostics to error envelopes.
    pub debug: bool,
    /// Rethrow unclassified faults instead of enveloping them. Only
    /// consulted when `debug` is on.
    pub debug_rethrow: bool,
}

impl ClientConfig {
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty or non-HTTP base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let base_url: String = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base URL must be absolute http(s), got `{base_url}`"
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            body_format: BodyFormat::default(),
            cache: CacheSettings::default(),
            debug: false,
            debug_rethrow: false,
        })
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn body_format(mut self, format: BodyFormat) -> Self {
        self.body_format = format;
        self
    }

    #[must_use]
    pub fn cache(mut self, settings: CacheSettings) -> Self {
        self.cache = settings;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn debug_rethrow(mut self, rethrow: bool) -> Self {
        self.debug_rethrow = rethrow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_validated_and_normalized() {
        let config = ClientConfig::new("https://api.example.com/").unwrap();
        assert_eq!(config.base_url, "https://api.example.com");

        let err = ClientConfig::new("ftp://files.example.com").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn cache_defaults_are_conservative() {
        let settings = CacheSettings::default();
        assert!(settings.enabled);
        assert!(!settings.post_idempotent);
        assert!(!settings.write_on_skip);
        assert_eq!(settings.mode, CacheMode::Typed);
        assert!(settings.default_ttl.is_none());
    }
}
