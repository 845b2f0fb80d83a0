//! Marker detection per line and grouping of lines into sections.

use std::sync::LazyLock;

use regex::Regex;

use super::lines::{drop_leading_chars, trim_pieces, Line};
use super::url::{inspect_line, UrlLine};
use crate::pipeline::types::Segment;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```\s*([^`\s]*)").expect("valid regex"));
static DIVIDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").expect("valid regex"));
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*(#{1,6})\s+)\S").expect("valid regex"));
static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*>\s?)").expect("valid regex"));
static TODO_BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*(?:[-*+]\s+)?\[([ xX])\]\s+)").expect("valid regex"));
static TODO_GLYPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*([□☐☑☒✅])\s*)").expect("valid regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*[-*•+]\s+)\S").expect("valid regex"));
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*\d{1,3}[.)]\s+)\S").expect("valid regex"));

/// Longest line still considered a standalone title.
pub const MAX_TITLE_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Blank,
    Fence { info: String },
    Divider,
    Heading { level: u8, marker_chars: usize },
    Quote { marker_chars: usize },
    Todo { checked: bool, marker_chars: usize },
    Bullet { marker_chars: usize },
    Numbered { marker_chars: usize },
    Url,
    Text,
}

fn char_len(text: &str, byte_end: usize) -> usize {
    text[..byte_end].chars().count()
}

pub fn line_kind(text: &str) -> LineKind {
    if text.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(c) = FENCE_RE.captures(text) {
        return LineKind::Fence {
            info: c[1].to_string(),
        };
    }
    if DIVIDER_RE.is_match(text) {
        return LineKind::Divider;
    }
    if let Some(c) = HEADING_RE.captures(text) {
        let level = c[2].len().min(3) as u8;
        return LineKind::Heading {
            level,
            marker_chars: char_len(text, c[1].len()),
        };
    }
    if let Some(c) = QUOTE_RE.captures(text) {
        return LineKind::Quote {
            marker_chars: char_len(text, c[1].len()),
        };
    }
    if let Some(c) = TODO_BRACKET_RE.captures(text) {
        return LineKind::Todo {
            checked: !c[2].trim().is_empty(),
            marker_chars: char_len(text, c[1].len()),
        };
    }
    if let Some(c) = TODO_GLYPH_RE.captures(text) {
        return LineKind::Todo {
            checked: matches!(&c[2], "☑" | "☒" | "✅"),
            marker_chars: char_len(text, c[1].len()),
        };
    }
    if let Some(c) = BULLET_RE.captures(text) {
        return LineKind::Bullet {
            marker_chars: char_len(text, c[1].len()),
        };
    }
    if let Some(c) = NUMBERED_RE.captures(text) {
        return LineKind::Numbered {
            marker_chars: char_len(text, c[1].len()),
        };
    }
    if matches!(inspect_line(text), UrlLine::Single { .. }) {
        return LineKind::Url;
    }
    LineKind::Text
}

/// Short line without terminal punctuation that reads like a title.
pub fn is_title_like(text: &str) -> bool {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count == 0 || count > MAX_TITLE_CHARS {
        return false;
    }
    if !trimmed.chars().any(char::is_alphabetic) {
        return false;
    }
    let last = trimmed.chars().last().unwrap_or(' ');
    !matches!(
        last,
        '.' | '!' | '?' | '。' | '！' | '？' | ':' | '：' | ',' | ';' | '…' | '"' | '”' | '\'' | ')' | '」'
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Code { info: String, lines: Vec<Line> },
    Divider,
    Heading { level: u8, pieces: Vec<Segment> },
    Quote { lines: Vec<Vec<Segment>> },
    Todo { checked: bool, pieces: Vec<Segment> },
    Bullet { pieces: Vec<Segment> },
    Numbered { pieces: Vec<Segment> },
    Url { line: Line },
    /// Unmarked lines; classified later.
    Text { lines: Vec<Line> },
}

fn marked(line: &Line, marker_chars: usize) -> Vec<Segment> {
    trim_pieces(&drop_leading_chars(&line.pieces, marker_chars))
}

/// Group lines into sections. Blank lines, fences, marker lines, URL lines
/// and a title line directly above prose all end the current text group.
pub fn sectionize(lines: &[Line]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut text_group: Vec<Line> = Vec::new();
    let mut quote_group: Vec<Vec<Segment>> = Vec::new();
    let mut fence: Option<(String, Vec<Line>)> = None;

    fn flush(sections: &mut Vec<Section>, text: &mut Vec<Line>, quote: &mut Vec<Vec<Segment>>) {
        if !text.is_empty() {
            sections.push(Section::Text {
                lines: std::mem::take(text),
            });
        }
        if !quote.is_empty() {
            sections.push(Section::Quote {
                lines: std::mem::take(quote),
            });
        }
    }

    for line in lines {
        let text = line.text();

        if let Some((info, body)) = fence.as_mut() {
            if matches!(line_kind(&text), LineKind::Fence { .. }) && text.trim() == "```" {
                sections.push(Section::Code {
                    info: std::mem::take(info),
                    lines: std::mem::take(body),
                });
                fence = None;
            } else {
                body.push(line.clone());
            }
            continue;
        }

        let kind = line_kind(&text);
        if !matches!(kind, LineKind::Quote { .. }) && !quote_group.is_empty() {
            flush(&mut sections, &mut text_group, &mut quote_group);
        }

        match kind {
            LineKind::Blank => flush(&mut sections, &mut text_group, &mut quote_group),
            LineKind::Fence { info } => {
                flush(&mut sections, &mut text_group, &mut quote_group);
                fence = Some((info, Vec::new()));
            }
            LineKind::Divider => {
                flush(&mut sections, &mut text_group, &mut quote_group);
                sections.push(Section::Divider);
            }
            LineKind::Heading { level, marker_chars } => {
                flush(&mut sections, &mut text_group, &mut quote_group);
                sections.push(Section::Heading {
                    level,
                    pieces: marked(line, marker_chars),
                });
            }
            LineKind::Quote { marker_chars } => {
                if !text_group.is_empty() {
                    flush(&mut sections, &mut text_group, &mut quote_group);
                }
                quote_group.push(marked(line, marker_chars));
            }
            LineKind::Todo { checked, marker_chars } => {
                flush(&mut sections, &mut text_group, &mut quote_group);
                sections.push(Section::Todo {
                    checked,
                    pieces: marked(line, marker_chars),
                });
            }
            LineKind::Bullet { marker_chars } => {
                flush(&mut sections, &mut text_group, &mut quote_group);
                sections.push(Section::Bullet {
                    pieces: marked(line, marker_chars),
                });
            }
            LineKind::Numbered { marker_chars } => {
                flush(&mut sections, &mut text_group, &mut quote_group);
                sections.push(Section::Numbered {
                    pieces: marked(line, marker_chars),
                });
            }
            LineKind::Url => {
                flush(&mut sections, &mut text_group, &mut quote_group);
                sections.push(Section::Url { line: line.clone() });
            }
            LineKind::Text => {
                // A title line followed by prose becomes its own section.
                if text_group.len() == 1 && is_title_like(&text_group[0].text()) && !is_title_like(&text) {
                    flush(&mut sections, &mut text_group, &mut quote_group);
                }
                text_group.push(line.clone());
            }
        }
    }

    if let Some((info, body)) = fence {
        sections.push(Section::Code { info, lines: body });
    }
    flush(&mut sections, &mut text_group, &mut quote_group);
    sections
}
