//! Conversion of dispatch failures into [`NormalizedError`].
//!
//! Every failure path (no response, rejected token, validation, other
//! server errors) funnels through [`from_transport`] or [`from_response`]
//! exactly once, at the client boundary.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{ErrorKind, NormalizedError, TransportError};
use crate::types::Response;

/// Message used when the server could not be reached.
pub const NO_RESPONSE_MESSAGE: &str = "No response from server. Check your network connection.";

/// Key under which list-shaped and object-level validation errors are reported.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Display labels for the fields the server validates.
const FIELD_LABELS: &[(&str, &str)] = &[
    ("location", "Location"),
    ("object_instance", "Object"),
    ("status", "Status"),
    ("brigade", "Brigade number"),
    ("identifier", "Identifier"),
    (NON_FIELD_ERRORS, "General error"),
];

/// Returns the display label for a server field name.
///
/// Unknown fields are shown verbatim.
pub fn field_label(field: &str) -> &str {
    FIELD_LABELS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, label)| *label)
        .unwrap_or(field)
}

/// Normalize a request that never received a response.
pub fn from_transport(err: &TransportError) -> NormalizedError {
    let message = match err {
        TransportError::Timeout { .. } => format!("{} ({})", NO_RESPONSE_MESSAGE, err),
        _ => NO_RESPONSE_MESSAGE.to_string(),
    };
    NormalizedError::network(message)
}

/// Normalize a non-success response.
pub fn from_response(response: &Response) -> NormalizedError {
    let status = response.status();
    let text = response.text().trim();

    let parsed = if text.is_empty() {
        None
    } else {
        serde_json::from_str::<Value>(text).ok()
    };

    let Some(payload) = parsed else {
        let message = if text.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, text)
        };
        return NormalizedError::new(ErrorKind::from_status(status), status, message);
    };

    if let Some(fields) = payload.get("errors").and_then(field_errors) {
        let message = compose_message(&fields);
        return NormalizedError::new(ErrorKind::Validation, status, message)
            .with_field_errors(fields)
            .with_payload(payload);
    }

    let message = match payload.get("detail") {
        Some(Value::String(detail)) => detail.clone(),
        _ => payload.to_string(),
    };

    NormalizedError::new(ErrorKind::from_status(status), status, message).with_payload(payload)
}

/// Extract per-field messages from an `errors` payload.
fn field_errors(errors: &Value) -> Option<BTreeMap<String, Vec<String>>> {
    match errors {
        Value::Object(map) => Some(object_field_errors(map)),
        Value::Array(items) => {
            let mut fields = BTreeMap::new();
            fields.insert(NON_FIELD_ERRORS.to_string(), items.iter().map(message_of).collect());
            Some(fields)
        }
        _ => None,
    }
}

fn object_field_errors(map: &Map<String, Value>) -> BTreeMap<String, Vec<String>> {
    map.iter()
        .map(|(field, value)| {
            let messages = match value {
                Value::Array(items) => items.iter().map(message_of).collect(),
                other => vec![message_of(other)],
            };
            (field.clone(), messages)
        })
        .collect()
}

fn message_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One line per field, `"<label>: <msg>, <msg>"`.
///
/// Lines follow the map's order, sorted by the server's field key rather
/// than by the translated label or the order the server sent them in.
fn compose_message(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field_label(field), messages.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}
