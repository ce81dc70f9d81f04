//! Input screening: a blocklist scan over every string field of an
//! inbound message, plus nickname sanitization.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Patterns that mark a message as hostile no matter which field they
/// appear in. Matched case-insensitively against every string value.
static DANGEROUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<script",
        r"(?i)javascript:",
        r"(?i)\bon\w+\s*=",
        r"(?i)eval\s*\(",
        r"(?i)document\.",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid blocklist pattern {p:?}: {e}")))
    .collect()
});

/// Where and what a blocklist scan tripped on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Dotted path of the offending field, e.g. `"content"` or
    /// `"payload.sdp"`.
    pub field: String,
    /// The offending value, truncated for logging.
    pub value: String,
}

/// Scans every string value in `message`, recursively through objects
/// and arrays. Returns the first hit, or `None` if the message is
/// clean.
pub fn scan_for_dangerous_input(message: &Value) -> Option<Rejection> {
    scan_value(message, String::new())
}

fn scan_value(value: &Value, path: String) -> Option<Rejection> {
    match value {
        Value::String(s) => {
            for pattern in DANGEROUS_PATTERNS.iter() {
                if pattern.is_match(s) {
                    let mut shown: String = s.chars().take(100).collect();
                    if s.chars().count() > 100 {
                        shown.push_str("...");
                    }
                    tracing::warn!(
                        field = %path,
                        pattern = %pattern.as_str(),
                        value = %shown,
                        "dangerous input rejected"
                    );
                    return Some(Rejection {
                        field: path,
                        value: shown,
                    });
                }
            }
            None
        }
        Value::Object(map) => map.iter().find_map(|(key, child)| {
            let child_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };
            scan_value(child, child_path)
        }),
        Value::Array(items) => items.iter().enumerate().find_map(|(i, child)| {
            scan_value(child, format!("{path}[{i}]"))
        }),
        _ => None,
    }
}

/// Reduces a requested nickname to its allowed characters and trims
/// surrounding whitespace, capped at `max_len`. Returns `None` if
/// nothing usable remains.
///
/// Allowed characters: ASCII alphanumerics, space, `-`, `_`, `.`
pub fn sanitize_nickname(requested: &str, max_len: usize) -> Option<String> {
    let kept: String = requested
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();

    let trimmed: String = kept.trim().chars().take(max_len).collect();
    let trimmed = trimmed.trim_end().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
