//! Envelope rules of the verbose OData format
//!
//! Responses arrive wrapped as `{ "d": { "results": [...] } }` for
//! collections and `{ "d": { ... } }` for single objects. Written items carry
//! their URI and version tag in `d.__metadata`.

use serde_json::{json, Map, Value};

use crate::constants::{
    CAML_QUERY_TYPE, ENVELOPE_DATA, ENVELOPE_METADATA, ENVELOPE_RESULTS, SPACE_ENCODING,
};
use crate::errors::{Result, SpError};
use crate::types::{ConcurrencyTag, WriteOutcome};

/// Unwrap a read response: `d.results`, else `d`, else the body unchanged.
#[must_use]
pub fn unwrap_read_envelope(body: Value) -> Value {
    let has_data = body.get(ENVELOPE_DATA).is_some_and(|d| !d.is_null());
    match body {
        Value::Object(mut root) if has_data => match root.remove(ENVELOPE_DATA) {
            Some(Value::Object(mut data)) => match data.remove(ENVELOPE_RESULTS) {
                Some(results) if !results.is_null() => results,
                _ => Value::Object(data),
            },
            Some(other) => other,
            None => Value::Object(root),
        },
        other => other,
    }
}

/// Unwrap a write response: item with metadata, else results, else raw body.
#[must_use]
pub fn unwrap_write_envelope(body: Value) -> WriteOutcome {
    let data = body.get(ENVELOPE_DATA).and_then(Value::as_object);

    if let Some(data) = data {
        if let Some(metadata) = data.get(ENVELOPE_METADATA).filter(|m| m.is_object()) {
            let uri = metadata.get("uri").and_then(Value::as_str).map(str::to_string);
            let etag = metadata.get("etag").and_then(Value::as_str).map(ConcurrencyTag::new);
            return WriteOutcome::Item { record: Value::Object(data.clone()), uri, etag };
        }
        if let Some(Value::Array(results)) = data.get(ENVELOPE_RESULTS) {
            return WriteOutcome::Results(results.clone());
        }
    }
    WriteOutcome::Raw(body)
}

/// Update/delete URL of an item read from the platform.
#[must_use]
pub fn item_uri(item: &Value) -> Option<&str> {
    item.get(ENVELOPE_METADATA)?.get("uri")?.as_str()
}

/// Version tag of an item read from the platform.
#[must_use]
pub fn etag(item: &Value) -> Option<ConcurrencyTag> {
    item.get(ENVELOPE_METADATA)?
        .get("etag")?
        .as_str()
        .filter(|tag| !tag.is_empty())
        .map(ConcurrencyTag::new)
}

/// Entity type name the platform requires on items of a list.
///
/// Whitespace becomes `_x0020_` and the first letter is upper-cased:
/// `"project tasks"` → `SP.Data.Project_x0020_tasksListItem`.
///
/// # Errors
/// Returns [`SpError::InvalidInput`] for an empty list name.
pub fn list_item_type(list_name: &str) -> Result<String> {
    let encoded: String = list_name
        .chars()
        .map(|c| if c.is_whitespace() { SPACE_ENCODING.to_string() } else { c.to_string() })
        .collect();

    let mut chars = encoded.chars();
    let Some(first) = chars.next() else {
        return Err(SpError::InvalidInput("No list name provided".into()));
    };
    let name: String = first.to_uppercase().chain(chars).collect();
    Ok(format!("SP.Data.{name}ListItem"))
}

/// Prepend the `__metadata.type` discriminator to an item payload.
#[must_use]
pub fn with_item_type(item_type: &str, payload: Map<String, Value>) -> Value {
    let mut data = Map::new();
    data.insert(ENVELOPE_METADATA.to_string(), json!({ "type": item_type }));
    for (name, value) in payload {
        // A caller-supplied __metadata overrides the computed one
        data.insert(name, value);
    }
    Value::Object(data)
}

/// Body posted to a list's `getitems` endpoint.
#[must_use]
pub fn caml_query_payload(view_xml: &str) -> Value {
    json!({
        "query": {
            ENVELOPE_METADATA: { "type": CAML_QUERY_TYPE },
            "ViewXml": view_xml
        }
    })
}

/// Pull the write token out of a context-info response.
///
/// Both historical shapes are accepted:
/// `d.GetContextWebInformation.FormDigestValue` and a top-level
/// `FormDigestValue`.
#[must_use]
pub fn context_token(body: &Value) -> Option<String> {
    body.get(ENVELOPE_DATA)
        .and_then(|d| d.get("GetContextWebInformation"))
        .and_then(|info| info.get("FormDigestValue"))
        .or_else(|| body.get("FormDigestValue"))
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Site user id from an ensure-user response (`Id` or `d.Id`).
#[must_use]
pub fn site_user_id(body: &Value) -> Option<i64> {
    body.get("Id")
        .or_else(|| body.get(ENVELOPE_DATA).and_then(|d| d.get("Id")))
        .and_then(Value::as_i64)
}
