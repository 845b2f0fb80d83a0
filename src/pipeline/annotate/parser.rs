use serde_json::Value;
use thiserror::Error;

use crate::pipeline::synthesize::url::is_absolute_http_url;
use crate::pipeline::types::{concat_segments, Annotations, Color, Segment};

/// Reasons an oracle segment list is rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentRejection {
    #[error("response is not a JSON array")]
    NotAnArray,

    #[error("segment {index} is invalid: {reason}")]
    BadElement { index: usize, reason: String },

    #[error("segments cover {actual_len} chars but the text has {expected_len}")]
    CoverageMismatch { expected_len: usize, actual_len: usize },
}

/// Convert an oracle JSON value into segments covering `result_text`.
///
/// Empty segments are dropped before coverage is checked.
pub fn parse_segments(value: &Value, result_text: &str) -> Result<Vec<Segment>, SegmentRejection> {
    let items = value.as_array().ok_or(SegmentRejection::NotAnArray)?;

    let mut segments = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let segment = parse_segment(item)
            .map_err(|reason| SegmentRejection::BadElement { index, reason })?;
        if !segment.content.is_empty() {
            segments.push(segment);
        }
    }

    let joined = concat_segments(&segments);
    if joined != result_text {
        return Err(SegmentRejection::CoverageMismatch {
            expected_len: result_text.chars().count(),
            actual_len: joined.chars().count(),
        });
    }
    Ok(segments)
}

/// Accepts the flat shape `{"content", "bold", ..., "color", "link_url"}` and
/// the rich-text shape `{"type": "text", "text": {"content", "link"}, "annotations"}`.
fn parse_segment(item: &Value) -> Result<Segment, String> {
    let object = item.as_object().ok_or_else(|| "not an object".to_string())?;

    if let Some(text) = object.get("text").and_then(Value::as_object) {
        let content = text
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing text.content".to_string())?;
        let mut annotations = match object.get("annotations") {
            Some(raw) => serde_json::from_value::<Annotations>(raw.clone()).map_err(|e| e.to_string())?,
            None => Annotations::default(),
        };
        annotations.link = link_target(text.get("link"));
        return Ok(Segment::new(content, annotations));
    }

    let content = object
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing content".to_string())?;
    let flag = |key: &str| object.get(key).and_then(Value::as_bool).unwrap_or(false);
    let annotations = Annotations {
        bold: flag("bold"),
        italic: flag("italic"),
        underline: flag("underline"),
        strikethrough: flag("strikethrough"),
        code: flag("code"),
        color: object
            .get("color")
            .and_then(Value::as_str)
            .and_then(Color::parse)
            .unwrap_or_default(),
        link: link_target(object.get("link_url").or_else(|| object.get("link"))),
    };
    Ok(Segment::new(content, annotations))
}

/// A link is either a bare URL string or `{"url": "..."}`. Targets that are
/// not absolute http(s) URLs are dropped and the text is kept unlinked.
fn link_target(raw: Option<&Value>) -> Option<String> {
    let url = match raw? {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("url")?.as_str()?,
        _ => return None,
    };
    let url = url.trim();
    if !is_absolute_http_url(url) {
        if !url.is_empty() {
            tracing::debug!(len = url.len(), "Dropping non-http link target");
        }
        return None;
    }
    Some(url.to_string())
}
