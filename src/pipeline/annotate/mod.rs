//! Stage 2: turn styling instructions into annotated segments over the
//! literal text. Never fails; falls back to one plain segment.

pub mod parser;
pub mod prompt;

use serde::Serialize;

use super::oracle::{extract_json, SharedOracle};
use super::types::Segment;
use parser::parse_segments;
use prompt::build_annotate_prompt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotateOutcome {
    pub segments: Vec<Segment>,
    /// The oracle output was rejected and a single plain segment was used.
    pub fallback: bool,
    /// At least one segment carries a style.
    pub formatted: bool,
    pub message: String,
}

impl AnnotateOutcome {
    fn plain(result_text: &str, fallback: bool, message: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::plain(result_text)],
            fallback,
            formatted: false,
            message: message.into(),
        }
    }
}

pub struct SpanAnnotator {
    oracle: SharedOracle,
}

impl SpanAnnotator {
    pub fn new(oracle: SharedOracle) -> Self {
        Self { oracle }
    }

    pub fn annotate(&self, format_instructions: &str, result_text: &str) -> AnnotateOutcome {
        if format_instructions.trim().is_empty() {
            return AnnotateOutcome::plain(result_text, false, "No formatting requested");
        }
        if result_text.is_empty() {
            return AnnotateOutcome::plain(result_text, false, "No text to format");
        }

        let prompt = build_annotate_prompt(format_instructions, result_text);
        let raw = match self.oracle.invoke(&prompt) {
            Ok(raw) => raw,
            Err(e) => return fallback(result_text, e.to_string()),
        };
        let value = match extract_json(&raw) {
            Ok(value) => value,
            Err(e) => return fallback(result_text, e.to_string()),
        };

        match parse_segments(&value, result_text) {
            Ok(segments) => {
                let formatted = segments.iter().any(|s| !s.annotations.is_plain());
                tracing::debug!(segments = segments.len(), formatted, "Annotation accepted");
                AnnotateOutcome {
                    message: format!("{} segments created", segments.len()),
                    segments,
                    fallback: false,
                    formatted,
                }
            }
            Err(rejection) => fallback(result_text, rejection.to_string()),
        }
    }
}

fn fallback(result_text: &str, reason: String) -> AnnotateOutcome {
    tracing::warn!(reason = %reason, "Annotation rejected, using plain text");
    AnnotateOutcome::plain(result_text, true, reason)
}
