//! Wire plan construction and the attempt loop.
//!
//! `build_plan` turns an invocation plus its chain into one concrete wire
//! call: placeholders substituted, query accumulated across the chain, body
//! encoded, headers merged, timeout settled. The dispatcher then drives the
//! attempt loop over the transport, re-attempting on connection-level
//! failures and on retry-requested interpretation results until the budget
//! runs out.

use crate::chain::ChainLink;
use crate::client::ClientConfig;
use crate::constants;
use crate::error::Error;
use crate::params::{serialize_fields, ParamContext, ParameterResolver};
use crate::request::{ApiRequest, Invocation};
use crate::transport::{BodyFormat, BodyPayload, Transport, WireRequest, WireResponse};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// A fully built call, plus the canonical parameter maps the cache key is
/// derived from.
#[derive(Debug, Clone)]
pub struct WirePlan {
    pub wire: WireRequest,
    pub query_params: Map<String, Value>,
    pub body_params: Map<String, Value>,
}

/// Builds the wire plan for one invocation.
///
/// # Errors
///
/// Returns [`Error::MissingPathParameter`] when a URI placeholder has no
/// matching field, or an error from a `before_send` hook.
pub fn build_plan<R: ApiRequest>(
    config: &ClientConfig,
    chain: &[Arc<dyn ChainLink>],
    invocation: &Invocation<R>,
) -> Result<WirePlan, Error> {
    let decl = R::declaration();
    let request = invocation.request();
    let fields = serialize_fields(request);

    let (path, consumed) = substitute_placeholders(decl.uri, &fields)?;

    // Outer links first, inner values win on key collision; the request's
    // own parameters are the innermost contribution.
    let mut query_params = Map::new();
    for link in chain {
        for (key, value) in link.query_params() {
            query_params.insert(key, value);
        }
    }
    for (key, value) in ParameterResolver::resolve(request, ParamContext::Query) {
        query_params.insert(key, value);
    }
    query_params.retain(|key, _| !consumed.contains(key));

    let mut body_params = Map::new();
    if decl.method.is_post() {
        body_params = ParameterResolver::resolve(request, ParamContext::Body);
        body_params.retain(|key, _| !consumed.contains(key));
    }

    let mut url = format!("{}{}", config.base_url, path);
    let query_string = encode_query(&query_params);
    if !query_string.is_empty() {
        url.push('?');
        url.push_str(&query_string);
    }

    let mut wire = WireRequest {
        method: decl.method,
        url,
        headers: vec![
            (constants::HEADER_USER_AGENT.into(), constants::USER_AGENT.into()),
            (constants::HEADER_ACCEPT.into(), constants::CONTENT_TYPE_JSON.into()),
        ],
        body: encode_body(decl.body_format.unwrap_or(config.body_format), &body_params),
        timeout: effective_timeout(config, chain, invocation),
    };
    for link in chain {
        for (name, value) in link.headers() {
            wire.set_header(&name, value);
        }
    }

    for link in chain {
        link.before_send(&mut wire)?;
    }

    Ok(WirePlan {
        wire,
        query_params,
        body_params,
    })
}

/// Substitutes `{name}` tokens from the serialized fields, returning the
/// substituted path and the set of consumed field names.
fn substitute_placeholders(
    uri: &str,
    fields: &Map<String, Value>,
) -> Result<(String, Vec<String>), Error> {
    let mut path = String::with_capacity(uri.len());
    let mut consumed = Vec::new();
    let mut rest = uri;

    while let Some(open) = rest.find('{') {
        path.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('}') else {
            path.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let name = &rest[open + 1..open + close];
        let value = fields
            .get(name)
            .and_then(scalar_string)
            .ok_or_else(|| Error::MissingPathParameter {
                name: name.to_string(),
            })?;
        path.push_str(&urlencoding::encode(&value));
        consumed.push(name.to_string());
        rest = &rest[open + close + 1..];
    }
    path.push_str(rest);

    Ok((path, consumed))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Encodes the query string: nulls dropped, arrays comma-joined, keys and
/// values percent-encoded.
fn encode_query(params: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        let encoded = match value {
            Value::Null => continue,
            Value::Array(items) => items
                .iter()
                .filter_map(scalar_string)
                .collect::<Vec<_>>()
                .join(","),
            other => match scalar_string(other) {
                Some(s) => s,
                None => continue,
            },
        };
        pairs.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(&encoded)
        ));
    }
    pairs.join("&")
}

fn encode_body(format: BodyFormat, params: &Map<String, Value>) -> BodyPayload {
    if params.is_empty() {
        return BodyPayload::None;
    }
    match format {
        BodyFormat::Json => BodyPayload::Json(Value::Object(params.clone())),
        BodyFormat::Form => BodyPayload::Form(flatten_pairs(params)),
        BodyFormat::Multipart => BodyPayload::Multipart(flatten_pairs(params)),
    }
}

fn flatten_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::Array(items) => items
                    .iter()
                    .filter_map(scalar_string)
                    .collect::<Vec<_>>()
                    .join(","),
                other => scalar_string(other)?,
            };
            Some((key.clone(), text))
        })
        .collect()
}

/// Most specific timeout wins: per-call override, then the declaration,
/// then the innermost chain suggestion, then the client default.
fn effective_timeout<R: ApiRequest>(
    config: &ClientConfig,
    chain: &[Arc<dyn ChainLink>],
    invocation: &Invocation<R>,
) -> Duration {
    invocation
        .timeout_override()
        .or(R::declaration().timeout)
        .or_else(|| chain.iter().rev().find_map(|link| link.timeout()))
        .unwrap_or(config.timeout)
}

/// Attempt bookkeeping for one dispatch.
#[derive(Debug, Clone, Copy)]
pub struct AttemptState {
    attempt: u32,
    budget: u32,
    delay: Duration,
}

impl AttemptState {
    #[must_use]
    pub fn new(budget: u32, delay: Duration) -> Self {
        Self {
            attempt: 1,
            budget: budget.max(1),
            delay,
        }
    }

    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.attempt >= self.budget
    }

    /// Waits the inter-attempt delay and advances the counter.
    pub async fn next(&mut self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.attempt += 1;
    }
}

/// What a finished dispatch produced.
#[derive(Debug)]
pub enum DispatchOutcome<T> {
    /// A response arrived and interpretation succeeded.
    Resolved { value: T, response: WireResponse },
    /// Every attempt asked for a retry; the last response is kept for
    /// diagnostics.
    Exhausted { response: WireResponse, message: String },
}

/// Drives the attempt loop over a transport.
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
}

impl RequestDispatcher {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Sends the planned call, interpreting each response with `interpret`.
    ///
    /// Connection-level failures and [`Error::RetryRequested`] results
    /// consume an attempt; any other interpretation error fails the dispatch
    /// immediately, as does a non-success HTTP status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the final attempt fails at the
    /// connection level, [`Error::HttpStatus`] for non-2xx responses, or the
    /// interpretation error.
    pub async fn dispatch<T>(
        &self,
        plan: &WirePlan,
        attempts: u32,
        delay: Duration,
        mut interpret: impl FnMut(&WireResponse) -> Result<T, Error>,
    ) -> Result<DispatchOutcome<T>, Error> {
        let mut state = AttemptState::new(attempts, delay);

        loop {
            tracing::debug!(
                target: "reqchain::dispatch",
                method = plan.wire.method.as_str(),
                url = %plan.wire.url,
                attempt = state.attempt(),
                "dispatching"
            );

            let response = match self.transport.send(&plan.wire).await {
                Ok(response) => response,
                Err(error) if error.is_retryable() && !state.is_last() => {
                    tracing::warn!(
                        target: "reqchain::dispatch",
                        attempt = state.attempt(),
                        %error,
                        "transport failure, retrying"
                    );
                    state.next().await;
                    continue;
                }
                Err(error) => return Err(Error::Transport(error)),
            };

            if !response.is_success() {
                return Err(Error::HttpStatus {
                    status: response.status,
                    body: response.text(),
                });
            }

            match interpret(&response) {
                Ok(value) => return Ok(DispatchOutcome::Resolved { value, response }),
                Err(Error::RetryRequested { message }) if !state.is_last() => {
                    tracing::warn!(
                        target: "reqchain::dispatch",
                        attempt = state.attempt(),
                        reason = %message,
                        "retry requested by validation"
                    );
                    state.next().await;
                }
                Err(Error::RetryRequested { message }) => {
                    return Ok(DispatchOutcome::Exhausted { response, message });
                }
                Err(error) => return Err(error),
            }
        }
    }
}
