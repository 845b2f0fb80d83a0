// Sanitize a raw writing request before it is embedded in an oracle prompt.
// Removes invisible Unicode, drops role-marker lines, normalizes whitespace.

/// Maximum request length sent to the oracle (characters).
pub const MAX_REQUEST_CHARS: usize = 20_000;

/// Sanitize a request for prompt embedding.
///
/// Logs the number of dropped lines, never their content.
pub fn sanitize_request(raw: &str) -> String {
    let cleaned = remove_invisible_chars(raw);
    let (kept, removed) = remove_role_markers(&cleaned);

    if removed > 0 {
        tracing::warn!(removed_lines = removed, "Role-marker lines removed from request");
    }

    let normalized = normalize_whitespace(&kept);
    truncate_chars(&normalized, MAX_REQUEST_CHARS)
}

/// Remove zero-width, bidi-control and other control characters.
/// Preserves space, newline and tab.
fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t') {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}

fn is_role_marker(lower: &str) -> bool {
    const MARKERS: &[&str] = &[
        "system:",
        "assistant:",
        "[system]",
        "[assistant]",
        "[inst]",
        "[/inst]",
        "<<sys>>",
        "<system",
        "</system",
        "<request",
        "</request",
        "ignore previous instructions",
        "ignore all instructions",
        "이전 지시를 무시",
    ];
    MARKERS.iter().any(|m| lower.starts_with(m))
}

/// Drop lines that try to impersonate a chat role or close the prompt's
/// delimiter tags. Returns (kept_text, removed_line_count).
fn remove_role_markers(text: &str) -> (String, usize) {
    let mut kept: Vec<&str> = Vec::new();
    let mut removed = 0usize;
    for line in text.lines() {
        if is_role_marker(&line.trim().to_lowercase()) {
            removed += 1;
        } else {
            kept.push(line);
        }
    }
    (kept.join("\n"), removed)
}

/// Collapse runs of blank lines and trim trailing whitespace per line.
/// Leading indentation is kept because it can carry list nesting.
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut prev_blank = false;

    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            if !prev_blank {
                lines.push("");
                prev_blank = true;
            }
        } else {
            lines.push(trimmed);
            prev_blank = false;
        }
    }

    while lines.first() == Some(&"") {
        lines.remove(0);
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

/// Truncate to at most `max_chars` characters, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let head = &text[..byte_idx];
            match head.rfind(char::is_whitespace) {
                Some(pos) if pos > 0 => head[..pos].to_string(),
                _ => head.to_string(),
            }
        }
    }
}
