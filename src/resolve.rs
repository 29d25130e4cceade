//! Response interpretation.
//!
//! A wire response is interpreted through a fixed cascade: attachment/binary
//! detection first, then JSON decoding (including JSON served under text
//! content types), then the hook pipeline (chain transforms and validations,
//! outermost first, the request's own last), then structural extraction and
//! typed construction per the declared result shape.

use crate::chain::ChainLink;
use crate::constants;
use crate::error::Error;
use crate::mime;
use crate::request::ApiRequest;
use crate::response::{FileHandle, Resolved};
use crate::transport::WireResponse;
use serde_json::Value;
use std::sync::Arc;

pub struct ResponseResolver;

impl ResponseResolver {
    /// Resolves a successful wire response into the declared result.
    ///
    /// # Errors
    ///
    /// Propagates hook errors, [`Error::ExtractPath`] for a broken
    /// extraction path, [`Error::DtoValidation`] when typed construction
    /// fails, and [`Error::UnexpectedData`] for non-JSON bodies on endpoints
    /// declared JSON-only.
    pub fn resolve<R: ApiRequest>(
        request: &R,
        chain: &[Arc<dyn ChainLink>],
        response: &WireResponse,
    ) -> Result<Resolved<R::Output>, Error> {
        if let Some(file) = detect_file(response) {
            return Ok(Resolved::File(file));
        }

        let Some(value) = try_get_json(response, R::declaration().expects_json)? else {
            return Ok(Resolved::Text(response.text()));
        };

        let value = run_hooks(request, chain, value)?;
        construct::<R>(request, value)
    }
}

/// Attachment dispositions and binary media types resolve to a file,
/// skipping the JSON pipeline entirely.
fn detect_file(response: &WireResponse) -> Option<FileHandle> {
    let disposition_name = response
        .header(constants::HEADER_CONTENT_DISPOSITION)
        .and_then(mime::attachment_file_name);

    let content_type = response.content_type().to_string();
    if disposition_name.is_none() && !mime::is_binary(&content_type) {
        return None;
    }

    Some(FileHandle {
        file_name: disposition_name.filter(|name| !name.is_empty()),
        content_type,
        bytes: response.body.clone(),
    })
}

/// Decodes the body as JSON when the content type says so, or when a
/// text-ish body parses as JSON anyway. `Ok(None)` means plain text.
fn try_get_json(response: &WireResponse, expects_json: bool) -> Result<Option<Value>, Error> {
    let content_type = response.content_type();
    let declared_json = content_type.starts_with(constants::CONTENT_TYPE_JSON)
        || content_type
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().ends_with("+json"));

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(value) => Ok(Some(value)),
        Err(error) if declared_json || expects_json => Err(Error::UnexpectedData {
            reason: format!("body is not valid JSON: {error}"),
        }),
        Err(_) => Ok(None),
    }
}

/// Runs transform hooks outermost-first, then validations in the same
/// order, the request's own hooks last in each phase.
fn run_hooks<R: ApiRequest>(
    request: &R,
    chain: &[Arc<dyn ChainLink>],
    mut value: Value,
) -> Result<Value, Error> {
    for link in chain {
        value = link.transform(value)?;
    }
    value = request.transform(value)?;

    for link in chain {
        link.validate(&value)?;
    }
    request.validate(&value)?;

    Ok(value)
}

/// Applies the declared result shape and constructs the typed output.
fn construct<R: ApiRequest>(request: &R, value: Value) -> Result<Resolved<R::Output>, Error> {
    let decl = R::declaration();
    let mut value = value;

    if let Some(path) = decl.shape.extract_from {
        value = extract_path(value, path, decl.type_name)?;
    }

    if let Some(field) = decl.shape.wrapped {
        value = value
            .get_mut(field)
            .map(Value::take)
            .ok_or_else(|| Error::UnexpectedData {
                reason: format!("envelope field `{field}` missing for `{}`", decl.type_name),
            })?;
    }

    if let Some(collection) = &decl.shape.collection_of {
        if let Some(field) = collection.field {
            value = value
                .get_mut(field)
                .map(Value::take)
                .ok_or_else(|| Error::UnexpectedData {
                    reason: format!(
                        "collection field `{field}` missing for `{}`",
                        decl.type_name
                    ),
                })?;
        }
        let Value::Array(items) = value else {
            return Err(Error::UnexpectedData {
                reason: format!("expected a collection for `{}`", decl.type_name),
            });
        };
        let mapped = items
            .into_iter()
            .map(|item| request.map_element(item))
            .collect::<Result<Vec<_>, _>>()?;
        value = Value::Array(mapped);
    }

    let typed = serde_json::from_value::<R::Output>(value)
        .map_err(|error| Error::dto_validation(std::any::type_name::<R::Output>(), &error))?;
    Ok(Resolved::Typed(typed))
}

/// Descends a dotted path; the result must be a collection (array or
/// object).
fn extract_path(mut value: Value, path: &str, type_name: &str) -> Result<Value, Error> {
    let broken = || Error::ExtractPath {
        path: path.to_string(),
        type_name: type_name.to_string(),
    };

    for segment in path.split('.') {
        value = match &mut value {
            Value::Object(map) => map.get_mut(segment).map(Value::take).ok_or_else(broken)?,
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index).map(Value::take))
                .ok_or_else(broken)?,
            _ => return Err(broken()),
        };
    }

    if value.is_array() || value.is_object() {
        Ok(value)
    } else {
        Err(broken())
    }
}
