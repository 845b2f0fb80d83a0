//! Helpers for turning freeform oracle text into JSON.

use super::OracleError;

/// Remove one pair of Markdown code fences enclosing the whole text, with or
/// without an info string. Anything else, including text that merely starts
/// with a fenced block, is only trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```").and_then(|rest| rest.strip_suffix("```")) else {
        return trimmed.to_string();
    };
    // Drop the info string (```json) up to the first newline.
    let body = match inner.find('\n') {
        Some(idx) => &inner[idx + 1..],
        None => inner.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    };
    if body.lines().any(|line| line.trim_start().starts_with("```")) {
        return trimmed.to_string();
    }
    body.trim().to_string()
}

/// Parse oracle output as JSON.
///
/// Tries the fence-stripped text first, then the slice between the first
/// opening bracket and the matching last closing bracket of the same kind.
pub fn extract_json(text: &str) -> Result<serde_json::Value, OracleError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    let first_err = match serde_json::from_str::<serde_json::Value>(&cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let start = cleaned.find(['{', '[']);
    if let Some(start) = start {
        let close = if cleaned[start..].starts_with('{') { '}' } else { ']' };
        if let Some(end) = cleaned.rfind(close) {
            if end > start {
                if let Ok(value) = serde_json::from_str(&cleaned[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    Err(OracleError::ResponseParsing(first_err.to_string()))
}
