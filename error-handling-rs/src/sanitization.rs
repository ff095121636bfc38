//! # Error Sanitization
//!
//! Removes credentials and personal data from error text before it reaches a
//! client response or a log file.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Error;

/// Upper bound on the length of a message returned to API clients
pub const MAX_CLIENT_MESSAGE_CHARS: usize = 200;

// (pattern, replacement) pairs applied in order
static SENSITIVE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // key=value style credentials, including `?key=` query parameters
        (
            Regex::new(r#"(?i)\b(api[_-]?key|token|secret|password|key)\b(["']?\s*[=:]\s*["']?)[^"'\s&,]+"#).unwrap(),
            "${1}${2}[REDACTED]",
        ),
        // OAuth 2.0 bearer tokens
        (Regex::new(r"(?i)\bbearer\s+[a-z0-9._\-]+").unwrap(), "Bearer [REDACTED]"),
        // Provider key formats
        (Regex::new(r"\bgsk_[A-Za-z0-9]{8,}").unwrap(), "[REDACTED]"),
        (Regex::new(r"\bAIza[0-9A-Za-z_\-]{20,}").unwrap(), "[REDACTED]"),
        // JWTs
        (
            Regex::new(r"eyJ[a-zA-Z0-9\-_]+\.eyJ[a-zA-Z0-9\-_]+\.[a-zA-Z0-9\-_]+").unwrap(),
            "[REDACTED]",
        ),
        // Email addresses
        (
            Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
            "[REDACTED]",
        ),
        // IP addresses
        (Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap(), "[REDACTED]"),
    ]
});

// Context keys whose values are dropped entirely
static SENSITIVE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["password", "secret", "token", "key", "credential", "auth", "cookie"]
        .into_iter()
        .collect()
});

/// Removes sensitive fragments from a message
pub fn sanitize_message(message: &str) -> String {
    SENSITIVE_PATTERNS
        .iter()
        .fold(message.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

/// Sanitized, single-line, length-bounded message suitable for a response body
pub fn client_message(message: &str) -> String {
    let sanitized = sanitize_message(message);
    let first_line = sanitized.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "internal error".to_string();
    }
    truncate_chars(first_line, MAX_CLIENT_MESSAGE_CHARS)
}

/// Truncates on character boundaries, appending `...` when text was cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Copy of `error` with a sanitized message and context
pub fn sanitize_error(error: &Error) -> Error {
    let mut sanitized = error.clone();
    sanitized.message = sanitize_message(&error.message);
    sanitized.context = error
        .context
        .iter()
        .filter(|(key, _)| !is_sensitive_key(key))
        .map(|(key, value)| {
            let value = match value.as_str() {
                Some(text) => serde_json::Value::String(sanitize_message(text)),
                None => value.clone(),
            };
            (key.clone(), value)
        })
        .collect();
    sanitized
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|sensitive| key_lower.contains(sensitive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_sanitize_message() {
        let sanitized = sanitize_message("Failed to connect with API key=abc123xyz");
        assert_eq!(sanitized, "Failed to connect with API key=[REDACTED]");

        let bearer = sanitize_message("Authorization: Bearer gsk_live_0123456789");
        assert_eq!(bearer, "Authorization: Bearer [REDACTED]");
    }

    #[test]
    fn test_query_parameter_key_is_redacted() {
        let url = "error sending request for url (https://example.test/v1beta/models/gemini-pro:generateContent?key=AIzaSyD-secret)";
        let sanitized = sanitize_message(url);
        assert!(!sanitized.contains("AIzaSyD-secret"));
        assert!(sanitized.contains("key=[REDACTED]"));
    }

    #[test]
    fn test_provider_keys_and_addresses() {
        let sanitized = sanitize_message("gsk_abcdefgh12345678 from 10.0.0.12 for ops@example.com");
        assert_eq!(sanitized, "[REDACTED] from [REDACTED] for [REDACTED]");
    }

    #[test]
    fn test_client_message_is_single_line_and_bounded() {
        let long = format!("first line {}\nsecond line", "x".repeat(500));
        let message = client_message(&long);
        assert!(!message.contains("second line"));
        assert!(message.ends_with("..."));
        assert_eq!(message.chars().count(), MAX_CLIENT_MESSAGE_CHARS + 3);

        assert_eq!(client_message("  \n"), "internal error");
    }

    #[test]
    fn test_truncate_chars_respects_multibyte_text() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_sanitize_error() {
        let error = Error::new(ErrorKind::Authentication, "rejected token=abc123")
            .context("provider", "groq")
            .context("api_key", "gsk_secret")
            .context("url", "http://10.1.1.1/v1");

        let sanitized = sanitize_error(&error);

        assert_eq!(sanitized.id, error.id);
        assert_eq!(sanitized.message, "rejected token=[REDACTED]");
        assert!(!sanitized.context.contains_key("api_key"));
        assert_eq!(sanitized.context.get("provider"), Some(&serde_json::json!("groq")));
        assert_eq!(sanitized.context.get("url"), Some(&serde_json::json!("http://[REDACTED]/v1")));
    }
}
