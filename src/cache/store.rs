//! Cache backends and the fault-isolating store facade.
//!
//! The executor only ever talks to [`CacheStore`]. Backend faults never
//! propagate: a failed read behaves as a miss, a failed write or
//! invalidation as a no-op, each logged at warn level. A degraded cache must
//! never degrade the call itself.

use crate::cache::entry::CacheEntry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache entry codec failure: {0}")]
    Codec(String),
}

/// Storage capability behind the cache. TTL and tag bookkeeping are the
/// backend's job; the store only decides whether and what to write.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, BackendError>;

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry,
        ttl: Option<Duration>,
        tags: &[String],
    ) -> Result<(), BackendError>;

    /// Removes every entry carrying at least one of `tags`, returning the
    /// number of removed entries.
    async fn remove_tags(&self, tags: &[String]) -> Result<u64, BackendError>;

    async fn clear(&self) -> Result<(), BackendError>;

    /// Backends without tag support are invalidated wholesale instead.
    fn supports_tags(&self) -> bool {
        false
    }
}

/// Fault-isolating facade over an optional backend.
#[derive(Clone, Default)]
pub struct CacheStore {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl CacheStore {
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A store with no backend; every operation is a no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Reads an entry; backend faults surface as a miss.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let backend = self.backend.as_ref()?;
        match backend.get(key).await {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(
                    target: "reqchain::cache",
                    key,
                    %error,
                    "cache read failed, treating as miss"
                );
                None
            }
        }
    }

    /// Writes an entry; backend faults are swallowed.
    pub async fn put(&self, key: &str, entry: CacheEntry, ttl: Option<Duration>, tags: &[String]) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if let Err(error) = backend.set(key, entry, ttl, tags).await {
            tracing::warn!(
                target: "reqchain::cache",
                key,
                %error,
                "cache write failed, result not stored"
            );
        }
    }

    /// Invalidates by tag, degrading to a full clear on backends without
    /// tag support.
    pub async fn invalidate_tags(&self, tags: &[String]) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let result = if backend.supports_tags() {
            backend.remove_tags(tags).await.map(|removed| {
                tracing::debug!(
                    target: "reqchain::cache",
                    ?tags,
                    removed,
                    "invalidated tagged entries"
                );
            })
        } else {
            tracing::warn!(
                target: "reqchain::cache",
                ?tags,
                "backend lacks tag support, clearing everything"
            );
            backend.clear().await
        };
        if let Err(error) = result {
            tracing::warn!(target: "reqchain::cache", %error, "cache invalidation failed");
        }
    }

    pub async fn invalidate_all(&self) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if let Err(error) = backend.clear().await {
            tracing::warn!(target: "reqchain::cache", %error, "cache clear failed");
        }
    }
}

struct StoredEntry {
    entry: CacheEntry,
    expires_at: Option<Instant>,
    tags: Vec<String>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process backend backed by a `HashMap`, suitable for tests and
/// single-process deployments.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, BackendError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(stored) if !stored.is_expired() => return Ok(Some(stored.entry.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired entry: drop it lazily.
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry,
        ttl: Option<Duration>,
        tags: &[String],
    ) -> Result<(), BackendError> {
        let stored = StoredEntry {
            entry,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
            tags: tags.to_vec(),
        };
        self.entries.write().await.insert(key.to_string(), stored);
        Ok(())
    }

    async fn remove_tags(&self, tags: &[String]) -> Result<u64, BackendError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| !stored.tags.iter().any(|tag| tags.contains(tag)));
        Ok((before - entries.len()) as u64)
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.entries.write().await.clear();
        Ok(())
    }

    fn supports_tags(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }

        async fn set(
            &self,
            _key: &str,
            _entry: CacheEntry,
            _ttl: Option<Duration>,
            _tags: &[String],
        ) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }

        async fn remove_tags(&self, _tags: &[String]) -> Result<u64, BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }

        async fn clear(&self) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn memory_backend_round_trips_entries() {
        let backend = MemoryBackend::new();
        backend
            .set("k1", CacheEntry::typed(json!({"id": 1})), None, &[])
            .await
            .unwrap();
        let entry = backend.get("k1").await.unwrap().unwrap();
        assert_eq!(entry.payload["id"], 1);
        assert!(backend.get("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let backend = MemoryBackend::new();
        backend
            .set(
                "k1",
                CacheEntry::typed(json!(1)),
                Some(Duration::ZERO),
                &[],
            )
            .await
            .unwrap();
        assert!(backend.get("k1").await.unwrap().is_none());
        // The lazy drop also removed the entry itself.
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn remove_tags_only_touches_tagged_entries() {
        let backend = MemoryBackend::new();
        backend
            .set("a", CacheEntry::typed(json!(1)), None, &["users".into()])
            .await
            .unwrap();
        backend
            .set("b", CacheEntry::typed(json!(2)), None, &["orders".into()])
            .await
            .unwrap();
        let removed = backend.remove_tags(&["users".to_string()]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(backend.get("a").await.unwrap().is_none());
        assert!(backend.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn store_swallows_backend_faults() {
        let store = CacheStore::new(Arc::new(FailingBackend));
        assert!(store.get("k1").await.is_none());
        store
            .put("k1", CacheEntry::typed(json!(1)), None, &[])
            .await;
        store.invalidate_tags(&["users".to_string()]).await;
        store.invalidate_all().await;
    }

    #[tokio::test]
    async fn disabled_store_is_a_no_op() {
        let store = CacheStore::disabled();
        assert!(!store.is_configured());
        assert!(store.get("k1").await.is_none());
    }
}
