//! Mock bearer token introspection
//!
//! Trust boundary: the gateway performs NO signature validation. The token is
//! an opaque string whose only local use is extracting a display name; it is
//! otherwise forwarded verbatim to the backend account API, which is the
//! authority that accepts or rejects it (HTTP 401). A token that fails to
//! parse still opens an authenticated session here and simply greets the
//! caller as "Guest".

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

const GUEST_NAME: &str = "Guest";

/// Derive the caller's display name from a bearer token.
///
/// Accepted shapes, tried in order:
/// - base64 of a JSON object with a `name` (or `user_name`) string field;
/// - a JWT-style `a.b.c` string whose middle segment base64-decodes to such
///   an object (unpadded base64url tolerated).
pub fn introspect_token(token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return GUEST_NAME.to_string();
    };

    if let Some(name) = decode_payload(token) {
        return name;
    }

    if let Some(middle) = token.split('.').nth(1) {
        if let Some(name) = decode_payload(middle) {
            return name;
        }
    }

    tracing::debug!("Token payload not introspectable, using guest name");
    GUEST_NAME.to_string()
}

fn decode_payload(segment: &str) -> Option<String> {
    let bytes = decode_base64_lenient(segment)?;
    let value: Value = serde_json::from_slice(&bytes).ok()?;
    value
        .get("name")
        .or_else(|| value.get("user_name"))
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .map(|n| n.trim().to_string())
}

fn decode_base64_lenient(segment: &str) -> Option<Vec<u8>> {
    // Token mints vary between standard and url-safe alphabets, with and
    // without padding.
    let normalized: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padded = match normalized.len() % 4 {
        0 => normalized,
        n => format!("{}{}", normalized, "=".repeat(4 - n)),
    };
    BASE64.decode(padded).ok()
}
