//! Masking of sensitive values before they reach a log line.

use serde_json::Value;

/// Replacement for masked values.
pub const REDACTED: &str = "[REDACTED]";

/// Key fragments treated as sensitive, matched case-insensitively.
pub const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "secret",
    "token",
    "authorization",
    "api_key",
    "apikey",
    "cookie",
];

/// Returns `true` if an object key names a sensitive value.
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|fragment| key.contains(fragment))
}

/// Returns a copy of `value` with every sensitive member masked, at any depth.
///
/// # Example
///
/// ```
/// use daedalus_telemetry::redact::{redact, REDACTED};
/// use serde_json::json;
///
/// let masked = redact(&json!({ "email": "a@b.io", "password": "hunter2" }));
/// assert_eq!(masked["password"], REDACTED);
/// assert_eq!(masked["email"], "a@b.io");
/// ```
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, child)| {
                    let child = if is_sensitive_key(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(child)
                    };
                    (key.clone(), child)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_values_are_masked() {
        let input = json!({
            "user": { "name": "ada", "newPassword": "x" },
            "items": [{ "accessToken": "t" }, { "id": 1 }],
        });
        let masked = redact(&input);
        assert_eq!(masked["user"]["name"], "ada");
        assert_eq!(masked["user"]["newPassword"], REDACTED);
        assert_eq!(masked["items"][0]["accessToken"], REDACTED);
        assert_eq!(masked["items"][1]["id"], 1);
    }

    #[test]
    fn test_sensitive_key_matching() {
        assert!(is_sensitive_key("Authorization"));
        assert!(is_sensitive_key("client_secret"));
        assert!(!is_sensitive_key("email"));
    }
}
