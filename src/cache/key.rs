//! Deterministic cache key derivation.
//!
//! Two invocations that would produce the same wire call must produce the
//! same key, independent of field declaration order or map iteration order.
//! Canonicalization sorts every object level, formats date/time strings to a
//! fixed layout, and drops an empty body component entirely, so `None` and
//! `{}` hash identically.

use crate::constants;
use chrono::DateTime;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Key for one request invocation.
    #[must_use]
    pub fn build(
        request_class: &str,
        method: &str,
        url: &str,
        query_params: &Map<String, Value>,
        body_params: &Map<String, Value>,
    ) -> String {
        let mut components = Map::new();
        components.insert("request_class".into(), Value::String(request_class.into()));
        components.insert("method".into(), Value::String(method.into()));
        components.insert("url".into(), Value::String(url.into()));
        components.insert(
            "query_params".into(),
            canonicalize(Value::Object(query_params.clone())),
        );
        if !body_params.is_empty() {
            components.insert(
                "body_params".into(),
                canonicalize(Value::Object(body_params.clone())),
            );
        }
        format!(
            "{}{}",
            constants::CACHE_PREFIX_REQUEST,
            hash(&Value::Object(components))
        )
    }

    /// Key for a grouped (batch) execution, derived from the group's
    /// identifying properties rather than a single wire call.
    #[must_use]
    pub fn build_grouped(group_class: &str, properties: &Map<String, Value>) -> String {
        let mut components = Map::new();
        components.insert("request_class".into(), Value::String(group_class.into()));
        components.insert("method".into(), Value::String("grouped".into()));
        components.insert(
            "properties".into(),
            canonicalize(Value::Object(properties.clone())),
        );
        format!(
            "{}{}",
            constants::CACHE_PREFIX_GROUPED,
            hash(&Value::Object(components))
        )
    }
}

fn hash(components: &Value) -> String {
    // serde_json::Map preserves insertion order, so a canonicalized value
    // always serializes identically.
    let serialized = components.to_string();
    let digest = Sha256::digest(serialized.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Recursively sorts object keys and normalizes scalar values.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::String(text) => Value::String(normalize_datetime(&text)),
        other => other,
    }
}

/// Date/time strings enter the key in one fixed format, so the same instant
/// expressed with different offsets or precision hashes identically.
fn normalize_datetime(text: &str) -> String {
    match DateTime::parse_from_rfc3339(text) {
        Ok(instant) => instant
            .to_utc()
            .format(constants::CACHE_KEY_DATETIME_FORMAT)
            .to_string(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn key_is_independent_of_parameter_order() {
        let a = params(json!({"page": 1, "query": "ada"}));
        let b = params(json!({"query": "ada", "page": 1}));
        let key_a = CacheKeyBuilder::build("ListUsers", "get", "/users", &a, &Map::new());
        let key_b = CacheKeyBuilder::build("ListUsers", "get", "/users", &b, &Map::new());
        assert_eq!(key_a, key_b);
        assert!(key_a.starts_with(constants::CACHE_PREFIX_REQUEST));
    }

    #[test]
    fn differing_values_produce_differing_keys() {
        let a = params(json!({"page": 1}));
        let b = params(json!({"page": 2}));
        assert_ne!(
            CacheKeyBuilder::build("ListUsers", "get", "/users", &a, &Map::new()),
            CacheKeyBuilder::build("ListUsers", "get", "/users", &b, &Map::new()),
        );
    }

    #[test]
    fn empty_body_is_omitted_from_the_key() {
        let query = params(json!({"page": 1}));
        let with_empty =
            CacheKeyBuilder::build("ListUsers", "get", "/users", &query, &Map::new());
        // A request that never had body params must hash like one whose
        // body resolved to nothing.
        let also_empty =
            CacheKeyBuilder::build("ListUsers", "get", "/users", &query, &params(json!({})));
        assert_eq!(with_empty, also_empty);
    }

    #[test]
    fn equivalent_datetimes_normalize_to_one_key() {
        let utc = params(json!({"since": "2026-03-01T10:00:00Z"}));
        let offset = params(json!({"since": "2026-03-01T12:00:00+02:00"}));
        assert_eq!(
            CacheKeyBuilder::build("ListEvents", "get", "/events", &utc, &Map::new()),
            CacheKeyBuilder::build("ListEvents", "get", "/events", &offset, &Map::new()),
        );
    }

    #[test]
    fn nested_objects_are_sorted_recursively() {
        let a = params(json!({"filter": {"b": 2, "a": 1}}));
        let b = params(json!({"filter": {"a": 1, "b": 2}}));
        assert_eq!(
            CacheKeyBuilder::build("Search", "post", "/search", &Map::new(), &a),
            CacheKeyBuilder::build("Search", "post", "/search", &Map::new(), &b),
        );
    }

    #[test]
    fn grouped_keys_use_their_own_prefix() {
        let props = params(json!({"ids": [1, 2, 3]}));
        let key = CacheKeyBuilder::build_grouped("UserBatch", &props);
        assert!(key.starts_with(constants::CACHE_PREFIX_GROUPED));
    }
}
