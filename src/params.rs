//! Outbound parameter resolution.
//!
//! Derives the query or body parameter set for a request instance from its
//! serialized public fields, applying the per-type visibility rules and enum
//! output overrides declared on the [`RequestDeclaration`].

use crate::declaration::RequestDeclaration;
use crate::request::ApiRequest;
use serde_json::{Map, Value};

/// Which parameter set is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamContext {
    Query,
    Body,
}

pub struct ParameterResolver;

impl ParameterResolver {
    /// Resolves the parameter map for one context. Unsupported field values
    /// degrade to `null` rather than failing the call.
    #[must_use]
    pub fn resolve<R: ApiRequest>(request: &R, context: ParamContext) -> Map<String, Value> {
        let decl = R::declaration();
        let fields = serialize_fields(request);
        resolve_fields(&fields, decl, context)
    }
}

/// Serialized public-field snapshot of the request instance.
pub(crate) fn serialize_fields<R: ApiRequest>(request: &R) -> Map<String, Value> {
    match serde_json::to_value(request) {
        Ok(Value::Object(map)) => map,
        // Unit structs and exotic shapes carry no parameters.
        _ => Map::new(),
    }
}

fn resolve_fields(
    fields: &Map<String, Value>,
    decl: &RequestDeclaration,
    context: ParamContext,
) -> Map<String, Value> {
    let mut out = Map::new();
    let mut overrides = Map::new();

    for (name, value) in fields {
        let spec = decl.field_spec(name);

        let hidden = spec.is_some_and(|s| match context {
            ParamContext::Query => s.hide_from_query,
            ParamContext::Body => s.hide_from_body,
        });
        if hidden {
            continue;
        }

        if let Some(spec) = spec {
            if let Some(mapped) = value.as_str().and_then(|case| {
                spec.enum_outputs
                    .iter()
                    .find(|eo| eo.case_value == case)
                    .map(|eo| eo.output)
            }) {
                overrides.insert(name.clone(), Value::String(mapped.to_string()));
            }
        }

        out.insert(name.clone(), value.clone());
    }

    // Overrides merge after the base serialization so they win.
    for (name, value) in overrides {
        out.insert(name, value);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{FieldSpec, Method};
    use serde::Serialize;
    use std::sync::LazyLock;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "snake_case")]
    enum Sort {
        Newest,
        #[allow(dead_code)]
        Oldest,
    }

    #[derive(Debug, Serialize)]
    struct SearchUsers {
        query: String,
        page: u32,
        sort: Sort,
        api_token: String,
        callback_url: Option<String>,
    }

    static SEARCH_USERS: LazyLock<RequestDeclaration> = LazyLock::new(|| {
        RequestDeclaration::new("SearchUsers", Method::Get, "/users/search")
            .field(FieldSpec::new("api_token").hide_from_query().hide_from_body())
            .field(FieldSpec::new("callback_url").hide_from_query())
            .field(FieldSpec::new("sort").enum_output("newest", "created_desc"))
    });

    impl ApiRequest for SearchUsers {
        type Output = Value;

        fn declaration() -> &'static RequestDeclaration {
            &SEARCH_USERS
        }
    }

    fn request() -> SearchUsers {
        SearchUsers {
            query: "ada".into(),
            page: 1,
            sort: Sort::Newest,
            api_token: "secret".into(),
            callback_url: Some("https://callback.example".into()),
        }
    }

    #[test]
    fn hidden_fields_are_excluded_per_context() {
        let query = ParameterResolver::resolve(&request(), ParamContext::Query);
        assert!(!query.contains_key("api_token"));
        assert!(!query.contains_key("callback_url"));
        assert_eq!(query["query"], "ada");

        let body = ParameterResolver::resolve(&request(), ParamContext::Body);
        assert!(!body.contains_key("api_token"));
        assert_eq!(body["callback_url"], "https://callback.example");
    }

    #[test]
    fn enum_output_override_wins_over_serialized_case() {
        let query = ParameterResolver::resolve(&request(), ParamContext::Query);
        assert_eq!(query["sort"], "created_desc");
    }

    #[test]
    fn cases_without_override_keep_their_serialized_value() {
        let mut req = request();
        req.sort = Sort::Oldest;
        let query = ParameterResolver::resolve(&req, ParamContext::Query);
        assert_eq!(query["sort"], "oldest");
    }

    #[test]
    fn none_fields_emit_null() {
        let mut req = request();
        req.callback_url = None;
        let body = ParameterResolver::resolve(&req, ParamContext::Body);
        assert_eq!(body["callback_url"], Value::Null);
    }
}
