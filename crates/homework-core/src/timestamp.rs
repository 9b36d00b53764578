//! Millisecond timestamps and lenient decoding of timestamp/id fields.
//!
//! Records written by older clients and rows returned by the remote service
//! do not agree on representation: timestamps arrive as integers, floats,
//! numeric strings or RFC 3339 strings, and ids as strings or numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Current instant in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Coerce a JSON value into epoch milliseconds.
///
/// Returns `None` for `null`, booleans, and strings that are neither numeric
/// nor RFC 3339.
pub fn coerce(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                Some(n)
            } else if let Ok(f) = s.parse::<f64>() {
                f.is_finite().then(|| f.trunc() as i64)
            } else {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
            }
        }
        _ => None,
    }
}

/// Serde helper: optional timestamp in any of the accepted encodings.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce))
}

/// Serde helper: id given as a string or a number, normalized to a string.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
