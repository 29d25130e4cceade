//! Cache policy cascade.
//!
//! Whether a call reads from and writes to cache is decided once, up front,
//! by layering four sources in priority order: the per-call directive, the
//! type declaration, the POST idempotency opt-in, and the client-wide flag.
//! The first explicit layer wins.

use crate::client::CacheSettings;
use crate::declaration::RequestDeclaration;
use crate::request::CacheDirective;
use std::time::Duration;

/// Outcome of the cascade for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicyDecision {
    /// Consult the store before dispatching.
    pub read: bool,
    /// Write the resolved result back after a successful live call.
    pub write: bool,
    /// Effective TTL; `None` means unbounded.
    pub ttl: Option<Duration>,
    /// Effective tag set, static declaration tags unioned with instance tags.
    pub tags: Vec<String>,
}

impl CachePolicyDecision {
    /// True when the call touches the cache in no way.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        !self.read && !self.write
    }
}

pub struct CachePolicyResolver;

impl CachePolicyResolver {
    /// Runs the cascade. `instance_ttl` and `instance_tags` come from the
    /// request instance hooks and outrank the declared values.
    #[must_use]
    pub fn resolve(
        settings: &CacheSettings,
        decl: &RequestDeclaration,
        directive: CacheDirective,
        instance_ttl: Option<Duration>,
        instance_tags: &[String],
    ) -> CachePolicyDecision {
        let ttl = instance_ttl.or(decl.cache.ttl).or(settings.default_ttl);
        let tags = merged_tags(decl, instance_tags);

        // Cacheable by declaration/method/client, ignoring per-call flags.
        let declared = match decl.cache.enabled {
            Some(enabled) => enabled,
            None => settings.enabled && (!decl.method.is_post() || settings.post_idempotent),
        };

        match directive {
            // Highest priority: the caller demanded a fresh call plus a
            // write, even when the client has caching off. A type-level
            // disablement still holds.
            CacheDirective::ForceRefresh => CachePolicyDecision {
                read: false,
                write: decl.cache.enabled != Some(false),
                ttl,
                tags,
            },
            // A declaration opting in still needs the client master
            // switch on; opting out is final either way.
            CacheDirective::Skip => CachePolicyDecision {
                read: false,
                write: settings.write_on_skip && declared && settings.enabled,
                ttl,
                tags,
            },
            CacheDirective::Inherit => {
                let cacheable = declared && settings.enabled;
                CachePolicyDecision {
                    read: cacheable,
                    write: cacheable,
                    ttl,
                    tags,
                }
            }
        }
    }

    /// Write-size guard: entries above the configured bound are dropped
    /// rather than stored.
    #[must_use]
    pub fn within_size_limit(settings: &CacheSettings, payload_size: usize) -> bool {
        settings
            .max_payload_bytes
            .is_none_or(|limit| payload_size <= limit)
    }
}

fn merged_tags(decl: &RequestDeclaration, instance_tags: &[String]) -> Vec<String> {
    let mut tags = decl.cache.tags.clone();
    for tag in instance_tags {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}
