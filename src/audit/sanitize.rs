//! Redaction of secrets before anything reaches the audit log.
//!
//! Applied to request params and to result data: a login result carries a
//! session token and a hash result carries a stored credential record.

use serde_json::{Map, Value};

/// Substrings that mark a key as sensitive. Matching is case-insensitive.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "record",
    "token",
    "digest",
    "salt",
    "secret",
    "credential",
    "key",
    "auth",
];

const REDACTED: &str = "[REDACTED]";

/// Strings longer than this are replaced with their length.
const MAX_STRING_LENGTH: usize = 1024;

/// Return a copy of `value` with sensitive keys redacted and oversized
/// strings truncated. Nested objects and arrays are walked.
pub fn sanitize_params(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = Map::with_capacity(map.len());
            for (key, val) in map {
                let lower = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                    sanitized.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    sanitized.insert(key.clone(), sanitize_params(val));
                }
            }
            Value::Object(sanitized)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_params).collect()),
        Value::String(s) if s.len() > MAX_STRING_LENGTH => {
            Value::String(format!("[TRUNCATED - {} bytes]", s.len()))
        }
        _ => value.clone(),
    }
}
