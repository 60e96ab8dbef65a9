//! Secret redaction for payloads leaving the process boundary.
//!
//! The audit channel ships arbitrary structured data to an external sink;
//! everything passes through [`sanitize`] first so no full credential ever
//! leaves the process.

use serde_json::Value;

/// Marker inserted between the kept head and tail of a long secret.
const ELISION_MARKER: &str = "[...]";

/// Replacement for secrets too short to partially reveal.
const REDACTED_MARKER: &str = "[REDACTED]";

/// Number of characters kept from each end of a long secret.
const KEEP_CHARS: usize = 5;

/// Object keys whose string values carry credentials.
const SENSITIVE_KEYS: [&str; 2] = ["token", "authorization"];

/// Returns a sanitized deep copy of `payload`.
///
/// Any object field whose key case-insensitively matches a
/// credential-carrying name has its string value redacted: values longer
/// than 10 characters keep the first and last 5 characters around an
/// elision marker, shorter ones are replaced wholesale. The input is never
/// mutated, and the output never contains more than 5 contiguous
/// characters of the original secret from either end.
pub fn sanitize(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                if is_sensitive_key(key) {
                    if let Value::String(secret) = value {
                        out.insert(key.clone(), Value::String(redact(secret)));
                        continue;
                    }
                }
                out.insert(key.clone(), sanitize(value));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| key.eq_ignore_ascii_case(sensitive))
}

fn redact(secret: &str) -> String {
    if secret.chars().count() > 2 * KEEP_CHARS {
        let head: String = secret.chars().take(KEEP_CHARS).collect();
        let tail_start = secret.chars().count() - KEEP_CHARS;
        let tail: String = secret.chars().skip(tail_start).collect();
        format!("{head}{ELISION_MARKER}{tail}")
    } else {
        REDACTED_MARKER.to_string()
    }
}
