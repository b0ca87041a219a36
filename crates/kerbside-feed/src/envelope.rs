//! API Gateway proxy envelopes.
//!
//! Depending on how the backend is deployed, the bays endpoint answers with
//! the bare JSON array or with the Lambda proxy shape
//! `{"statusCode": 200, "headers": {...}, "body": ...}` where `body` is
//! either JSON or a JSON-encoded string.

use serde_json::Value;

use crate::error::FeedError;

/// Returns the payload inside an envelope, or `value` itself if it is not one.
///
/// Any object carrying `body` or `statusCode` counts as an envelope. A string
/// body is decoded as JSON; if that fails the string is returned unchanged so
/// the caller can report the shape it actually got.
#[must_use]
pub fn unwrap_body(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    if !map.contains_key("body") && !map.contains_key("statusCode") {
        return Value::Object(map);
    }

    match map.remove("body") {
        Some(Value::String(text)) => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        Some(body) => body,
        None => Value::Null,
    }
}

/// The status code carried inside an envelope, if any.
#[must_use]
pub fn envelope_status(value: &Value) -> Option<u16> {
    value
        .get("statusCode")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
}

/// Unwraps `value` and returns the JSON objects in its array payload.
///
/// Elements that are not objects are skipped with a warning. `url` is only
/// used in errors and logs.
///
/// # Errors
///
/// [`FeedError::UnexpectedStatus`] for an envelope carrying a 4xx/5xx
/// `statusCode`, [`FeedError::UnexpectedShape`] if the payload is not an
/// array.
pub fn payload_objects(value: Value, url: &str) -> Result<Vec<Value>, FeedError> {
    if let Some(status) = envelope_status(&value).filter(|s| *s >= 400) {
        return Err(FeedError::UnexpectedStatus {
            status,
            url: url.to_owned(),
        });
    }

    let items = match unwrap_body(value) {
        Value::Array(items) => items,
        other => {
            return Err(FeedError::UnexpectedShape {
                url: url.to_owned(),
                found: json_kind(&other).to_owned(),
            })
        }
    };

    let total = items.len();
    let objects: Vec<Value> = items.into_iter().filter(Value::is_object).collect();
    if objects.len() < total {
        tracing::warn!(url, skipped = total - objects.len(), "skipping non-object entries in payload");
    }
    Ok(objects)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
