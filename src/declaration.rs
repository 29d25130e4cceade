//! Static, per-type request metadata.
//!
//! A [`RequestDeclaration`] is built once per request *type* (typically in a
//! `LazyLock`) and describes everything the runtime needs that does not vary
//! per call: URI template, method, retry budget, cache policy, field
//! visibility rules, and the declared result shape. This replaces any
//! per-call introspection of the request value.

use crate::transport::BodyFormat;
use std::time::Duration;

/// HTTP method of a declared endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
        }
    }

    #[must_use]
    pub fn is_post(&self) -> bool {
        matches!(self, Self::Post)
    }
}

/// Output-value override for one case of a closed enumeration field.
/// `case_value` is the case's serialized form; `output` replaces it on the
/// wire.
#[derive(Debug, Clone, Copy)]
pub struct EnumOutput {
    pub case_value: &'static str,
    pub output: &'static str,
}

/// Visibility and remapping rules for one public field of a request type.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub hide_from_query: bool,
    pub hide_from_body: bool,
    pub enum_outputs: Vec<EnumOutput>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            hide_from_query: false,
            hide_from_body: false,
            enum_outputs: Vec::new(),
        }
    }

    #[must_use]
    pub fn hide_from_query(mut self) -> Self {
        self.hide_from_query = true;
        self
    }

    #[must_use]
    pub fn hide_from_body(mut self) -> Self {
        self.hide_from_body = true;
        self
    }

    /// Remaps one enum case to an explicit wire value.
    #[must_use]
    pub fn enum_output(mut self, case_value: &'static str, output: &'static str) -> Self {
        self.enum_outputs.push(EnumOutput { case_value, output });
        self
    }
}

/// Declared cache policy of a request type. `enabled: None` means the type
/// says nothing and method/client defaults decide.
#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    pub enabled: Option<bool>,
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
}

/// Sub-field selection for collection results: the JSON payload (after
/// extraction) holds the element array either at the top level or under
/// `field`.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub field: Option<&'static str>,
}

/// How the wire payload maps onto the declared result type.
#[derive(Debug, Clone, Default)]
pub struct ResultShape {
    /// Envelope field the payload is wrapped in; descended into before
    /// typed construction.
    pub wrapped: Option<&'static str>,
    /// The result is a collection of elements, each individually mapped and
    /// constructed.
    pub collection_of: Option<CollectionSpec>,
    /// Dotted path descended into before construction; must resolve to a
    /// collection.
    pub extract_from: Option<&'static str>,
}

/// Immutable description of one endpoint, constructed once per request type.
#[derive(Debug, Clone)]
pub struct RequestDeclaration {
    pub type_name: &'static str,
    pub method: Method,
    /// URI template relative to the client base URL, with `{placeholder}`
    /// tokens substituted from instance fields.
    pub uri: &'static str,
    pub attempts: u32,
    pub attempt_delay: Duration,
    pub cache: CachePolicy,
    pub fields: Vec<FieldSpec>,
    pub shape: ResultShape,
    /// Body encoding override; falls back to the client default.
    pub body_format: Option<BodyFormat>,
    /// Timeout override; falls back to the client default.
    pub timeout: Option<Duration>,
    /// Whether a non-JSON body is a protocol violation for this endpoint.
    pub expects_json: bool,
}

impl RequestDeclaration {
    #[must_use]
    pub fn new(type_name: &'static str, method: Method, uri: &'static str) -> Self {
        Self {
            type_name,
            method,
            uri,
            attempts: 1,
            attempt_delay: Duration::from_millis(1000),
            cache: CachePolicy::default(),
            fields: Vec::new(),
            shape: ResultShape::default(),
            body_format: None,
            timeout: None,
            expects_json: false,
        }
    }

    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn attempt_delay(mut self, delay: Duration) -> Self {
        self.attempt_delay = delay;
        self
    }

    /// Declares the type cacheable, optionally with a static TTL and tags.
    #[must_use]
    pub fn cacheable(mut self, ttl: Option<Duration>, tags: &[&str]) -> Self {
        self.cache.enabled = Some(true);
        self.cache.ttl = ttl;
        self.cache.tags = tags.iter().map(ToString::to_string).collect();
        self
    }

    /// Declares caching explicitly disabled for this type.
    #[must_use]
    pub fn cache_disabled(mut self) -> Self {
        self.cache.enabled = Some(false);
        self
    }

    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    #[must_use]
    pub fn wrapped(mut self, envelope_field: &'static str) -> Self {
        self.shape.wrapped = Some(envelope_field);
        self
    }

    #[must_use]
    pub fn collection_of(mut self, field: Option<&'static str>) -> Self {
        self.shape.collection_of = Some(CollectionSpec { field });
        self
    }

    #[must_use]
    pub fn extract_from(mut self, dotted_path: &'static str) -> Self {
        self.shape.extract_from = Some(dotted_path);
        self
    }

    #[must_use]
    pub fn body_format(mut self, format: BodyFormat) -> Self {
        self.body_format = Some(format);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn expects_json(mut self) -> Self {
        self.expects_json = true;
        self
    }

    #[must_use]
    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_single_attempt() {
        let decl = RequestDeclaration::new("ListUsers", Method::Get, "/users");
        assert_eq!(decl.attempts, 1);
        assert_eq!(decl.attempt_delay, Duration::from_millis(1000));
        assert!(decl.cache.enabled.is_none());
        assert!(!decl.expects_json);
    }

    #[test]
    fn attempts_are_clamped_to_at_least_one() {
        let decl = RequestDeclaration::new("GetUser", Method::Get, "/users/{id}").attempts(0);
        assert_eq!(decl.attempts, 1);
    }

    #[test]
    fn cacheable_records_ttl_and_tags() {
        let decl = RequestDeclaration::new("ListUsers", Method::Get, "/users")
            .cacheable(Some(Duration::from_secs(1800)), &["users", "list"]);
        assert_eq!(decl.cache.enabled, Some(true));
        assert_eq!(decl.cache.ttl, Some(Duration::from_secs(1800)));
        assert_eq!(decl.cache.tags, vec!["users", "list"]);
    }

    #[test]
    fn field_specs_are_found_by_name() {
        let decl = RequestDeclaration::new("Search", Method::Get, "/search")
            .field(FieldSpec::new("api_key").hide_from_query())
            .field(FieldSpec::new("sort").enum_output("newest", "created_desc"));
        assert!(decl.field_spec("api_key").is_some_and(|f| f.hide_from_query));
        assert!(decl.field_spec("missing").is_none());
    }
}
