//! Execution orchestration.
//!
//! One call runs through a fixed sequence: chain resolution, wire plan
//! construction, the cache policy cascade, an optional cache read, the
//! dispatch attempt loop, response resolution, an optional cache write, and
//! envelope assembly. Classified failures always come back as an error
//! envelope; only unclassified faults may be rethrown, and only when the
//! client runs in debug-rethrow mode.

use crate::cache::{CacheBackend, CacheEntry, CacheKeyBuilder, CachePolicyResolver, CacheStore};
use crate::chain::ChainLink;
use crate::client::{CacheMode, ClientConfig};
use crate::constants;
use crate::dispatch::{build_plan, DispatchOutcome, RequestDispatcher, WirePlan};
use crate::error::Error;
use crate::logging;
use crate::registry::ResourceRegistry;
use crate::request::{ApiRequest, Invocation};
use crate::resolve::ResponseResolver;
use crate::response::{ClientResponse, Resolved};
use crate::transport::{ReqwestTransport, Transport, WireResponse};
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Builder for [`Executor`]. The transport defaults to reqwest; the cache
/// store defaults to disabled.
pub struct ExecutorBuilder {
    config: ClientConfig,
    registry: ResourceRegistry,
    transport: Option<Arc<dyn Transport>>,
    backend: Option<Arc<dyn CacheBackend>>,
    client_link: Option<Arc<dyn ChainLink>>,
}

impl ExecutorBuilder {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            registry: ResourceRegistry::new(),
            transport: None,
            backend: None,
            client_link: None,
        }
    }

    #[must_use]
    pub fn registry(mut self, registry: ResourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Outermost chain link, applied to every request of this client.
    #[must_use]
    pub fn client_link(mut self, link: Arc<dyn ChainLink>) -> Self {
        self.client_link = Some(link);
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the default transport cannot be
    /// constructed.
    pub fn build(self) -> Result<Executor, Error> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.config.connect_timeout)?),
        };
        let store = match self.backend {
            Some(backend) => CacheStore::new(backend),
            None => CacheStore::disabled(),
        };
        Ok(Executor {
            config: self.config,
            registry: Mutex::new(self.registry),
            dispatcher: RequestDispatcher::new(transport),
            store,
            client_link: self.client_link,
        })
    }
}

/// Executes declared requests against one remote API.
pub struct Executor {
    config: ClientConfig,
    registry: Mutex<ResourceRegistry>,
    dispatcher: RequestDispatcher,
    store: CacheStore,
    client_link: Option<Arc<dyn ChainLink>>,
}

impl Executor {
    #[must_use]
    pub fn builder(config: ClientConfig) -> ExecutorBuilder {
        ExecutorBuilder::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Registers the resource path for a request type after construction.
    pub async fn register<R: ApiRequest>(&self, resources: Vec<Arc<dyn ChainLink>>) {
        self.registry.lock().await.register::<R>(resources);
    }

    /// Executes one invocation and assembles the result envelope.
    ///
    /// # Errors
    ///
    /// Classified failures are returned as an error envelope, not as `Err`.
    /// Only unclassified faults escape, and only when both `debug` and
    /// `debug_rethrow` are enabled.
    pub async fn execute<R: ApiRequest>(
        &self,
        invocation: impl Into<Invocation<R>>,
    ) -> Result<ClientResponse<R::Output>, Error> {
        let invocation = invocation.into();
        match self.run(&invocation).await {
            Ok(mut response) => {
                invocation.request().before_return(&mut response);
                Ok(response)
            }
            Err(error) => {
                if !error.is_classified() && self.config.debug && self.config.debug_rethrow {
                    return Err(error);
                }
                tracing::error!(
                    target: "reqchain::executor",
                    request = R::declaration().type_name,
                    status = error.status(),
                    %error,
                    "execution failed"
                );
                let details = self.config.debug.then(|| error.details());
                let mut response =
                    ClientResponse::failure(error.status(), error.public_message(), details);
                invocation.request().before_return(&mut response);
                Ok(response)
            }
        }
    }

    /// Executes a homogeneous group of invocations concurrently. Each member
    /// runs the full pipeline, including its own cache decision; member
    /// failures envelope individually and never abort the group.
    ///
    /// # Errors
    ///
    /// Propagates a member's unclassified fault under debug-rethrow, as
    /// [`Executor::execute`] does.
    pub async fn execute_grouped<R: ApiRequest>(
        &self,
        invocations: Vec<Invocation<R>>,
    ) -> Result<Vec<ClientResponse<R::Output>>, Error> {
        let futures = invocations
            .into_iter()
            .map(|invocation| self.execute(invocation));
        futures::future::join_all(futures)
            .await
            .into_iter()
            .collect()
    }

    /// Removes every cache entry carrying one of `tags`.
    pub async fn invalidate_tags(&self, tags: &[String]) {
        self.store.invalidate_tags(tags).await;
    }

    /// Removes every cache entry of this client.
    pub async fn invalidate_all(&self) {
        self.store.invalidate_all().await;
    }

    /// Drops all registered resource paths; a configured rescan hook
    /// repopulates them on the next lookup.
    pub async fn invalidate_registry(&self) {
        self.registry.lock().await.invalidate();
    }

    async fn run<R: ApiRequest>(
        &self,
        invocation: &Invocation<R>,
    ) -> Result<ClientResponse<R::Output>, Error> {
        let decl = R::declaration();
        let request = invocation.request();

        let mut chain: Vec<Arc<dyn ChainLink>> = Vec::new();
        if let Some(link) = &self.client_link {
            chain.push(link.clone());
        }
        chain.extend(self.registry.lock().await.resolve::<R>()?);

        let plan = build_plan(&self.config, &chain, invocation)?;

        let policy = CachePolicyResolver::resolve(
            &self.config.cache,
            decl,
            invocation.cache_directive(),
            request.cache_ttl(),
            &request.cache_tags(),
        );
        let key = CacheKeyBuilder::build(
            decl.type_name,
            decl.method.as_str(),
            plan.wire.url.split('?').next().unwrap_or(&plan.wire.url),
            &plan.query_params,
            &plan.body_params,
        );

        if policy.read {
            if let Some(response) = self.revive(request, &chain, &key).await {
                return Ok(response);
            }
        }

        let started = Instant::now();
        logging::log_request(&plan.wire);
        let outcome = self
            .dispatcher
            .dispatch(&plan, decl.attempts, decl.attempt_delay, |response| {
                ResponseResolver::resolve(request, &chain, response)
            })
            .await?;

        let (mut resolved, response) = match outcome {
            DispatchOutcome::Resolved { value, response } => (value, response),
            // Attempts ran out while validation kept requesting retries:
            // the last response comes back with its natural status, not
            // escalated to a fatal error.
            DispatchOutcome::Exhausted { response, message } => {
                tracing::warn!(
                    target: "reqchain::executor",
                    request = decl.type_name,
                    status = response.status,
                    reason = %message,
                    "attempt budget exhausted"
                );
                let raw = Some(response.text());
                return Ok(
                    ClientResponse::failure(response.status, &message, None).with_raw(raw)
                );
            }
        };
        logging::log_response(&response, started.elapsed().as_millis(), logging::get_max_body_len());

        request.post_process(&mut resolved);

        if policy.write {
            self.write_back(request, &resolved, &response, &key, policy.ttl, &policy.tags)
                .await;
        }

        let raw = Some(response.text());
        let envelope =
            ClientResponse::success(resolved, constants::MSG_SUCCESSFUL, response.status, raw)
                .with_debug(self.debug_payload(&plan, &key, false));
        Ok(envelope)
    }

    /// Attempts a cache hit. Every fault on this path degrades to a miss.
    async fn revive<R: ApiRequest>(
        &self,
        request: &R,
        chain: &[Arc<dyn ChainLink>],
        key: &str,
    ) -> Option<ClientResponse<R::Output>> {
        let entry = self.store.get(key).await?;

        let (resolved, raw) = if entry.is_raw {
            let raw = entry.raw.clone()?;
            let synthesized = synthesize_response(&raw);
            match ResponseResolver::resolve(request, chain, &synthesized) {
                Ok(resolved) => (resolved, Some(raw)),
                Err(error) => {
                    tracing::warn!(
                        target: "reqchain::cache",
                        key,
                        %error,
                        "stale raw entry failed to resolve, treating as miss"
                    );
                    return None;
                }
            }
        } else {
            let raw = entry.raw.clone();
            (revive_typed::<R>(&entry)?, raw)
        };

        tracing::debug!(target: "reqchain::cache", key, "cache hit");
        let mut resolved = resolved;
        request.post_process(&mut resolved);
        Some(
            ClientResponse::success(resolved, constants::MSG_SUCCESSFUL_CACHED, 200, raw)
                .with_debug(self.config.debug.then(|| json!({"cache": {"hit": true, "key": key}}))),
        )
    }

    async fn write_back<R: ApiRequest>(
        &self,
        request: &R,
        resolved: &Resolved<R::Output>,
        response: &WireResponse,
        key: &str,
        ttl: Option<std::time::Duration>,
        tags: &[String],
    ) {
        if resolved.is_file() || !request.should_cache(resolved) {
            return;
        }
        let entry = match self.config.cache.mode {
            CacheMode::Raw => CacheEntry::raw(response.text()),
            CacheMode::Typed => match resolved.cache_payload() {
                // Null results are never stored.
                Some(payload) if !payload.is_null() => {
                    CacheEntry::typed(payload).with_raw(response.text())
                }
                _ => return,
            },
        };
        if !CachePolicyResolver::within_size_limit(&self.config.cache, entry.payload_size()) {
            tracing::debug!(target: "reqchain::cache", key, "entry over size limit, not stored");
            return;
        }
        self.store.put(key, entry, ttl, tags).await;
    }

    fn debug_payload(&self, plan: &WirePlan, key: &str, hit: bool) -> Option<Value> {
        self.config.debug.then(|| {
            json!({
                "method": plan.wire.method.as_str(),
                "url": plan.wire.url,
                "cache": {"hit": hit, "key": key},
            })
        })
    }
}

/// Rebuilds a wire response from a stored raw body, so a raw-mode hit runs
/// the identical resolution pipeline as a live call.
fn synthesize_response(raw: &str) -> WireResponse {
    let content_type = if serde_json::from_str::<Value>(raw).is_ok() {
        constants::CONTENT_TYPE_JSON
    } else {
        constants::CONTENT_TYPE_TEXT
    };
    let mut headers = HashMap::new();
    headers.insert(
        constants::HEADER_CONTENT_TYPE.to_string(),
        content_type.to_string(),
    );
    WireResponse {
        status: 200,
        headers,
        body: Bytes::copy_from_slice(raw.as_bytes()),
    }
}

/// Revives a typed-mode entry. A payload that no longer matches the declared
/// type reads as a miss, not a failure.
fn revive_typed<R: ApiRequest>(entry: &CacheEntry) -> Option<Resolved<R::Output>> {
    match serde_json::from_value::<R::Output>(entry.payload.clone()) {
        Ok(value) => Some(Resolved::Typed(value)),
        Err(_) => match &entry.payload {
            Value::String(text) => Some(Resolved::Text(text.clone())),
            _ => None,
        },
    }
}
