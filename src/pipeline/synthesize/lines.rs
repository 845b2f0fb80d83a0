//! Segment-level text surgery: split at newlines, drop marker characters,
//! merge neighbours. Only whole characters are ever removed.

use crate::pipeline::types::{concat_segments, Segment};

/// One line of the annotated text, keeping the pieces of every segment it spans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub pieces: Vec<Segment>,
}

impl Line {
    pub fn text(&self) -> String {
        concat_segments(&self.pieces)
    }

    pub fn is_blank(&self) -> bool {
        self.pieces.iter().all(|p| p.content.trim().is_empty())
    }
}

/// Split a segment stream at `\n`. A trailing `\r` is treated as part of the
/// line break.
pub fn split_lines(segments: &[Segment]) -> Vec<Line> {
    let mut lines = vec![Line::default()];
    for segment in segments {
        for (i, part) in segment.content.split('\n').enumerate() {
            if i > 0 {
                lines.push(Line::default());
            }
            if !part.is_empty() {
                if let Some(line) = lines.last_mut() {
                    line.pieces.push(Segment::new(part, segment.annotations.clone()));
                }
            }
        }
    }
    for line in &mut lines {
        if line.text().ends_with('\r') {
            line.pieces = drop_trailing_chars(&line.pieces, 1);
        }
    }
    lines
}

/// Remove the first `n` characters across pieces.
pub fn drop_leading_chars(pieces: &[Segment], n: usize) -> Vec<Segment> {
    let mut remaining = n;
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if remaining == 0 {
            out.push(piece.clone());
            continue;
        }
        let count = piece.content.chars().count();
        if remaining >= count {
            remaining -= count;
            continue;
        }
        let rest: String = piece.content.chars().skip(remaining).collect();
        remaining = 0;
        out.push(Segment::new(rest, piece.annotations.clone()));
    }
    out
}

/// Remove the last `n` characters across pieces.
pub fn drop_trailing_chars(pieces: &[Segment], n: usize) -> Vec<Segment> {
    let mut remaining = n;
    let mut out: Vec<Segment> = Vec::with_capacity(pieces.len());
    for piece in pieces.iter().rev() {
        if remaining == 0 {
            out.push(piece.clone());
            continue;
        }
        let count = piece.content.chars().count();
        if remaining >= count {
            remaining -= count;
            continue;
        }
        let keep: String = piece.content.chars().take(count - remaining).collect();
        remaining = 0;
        out.push(Segment::new(keep, piece.annotations.clone()));
    }
    out.reverse();
    out
}

/// Trim leading and trailing whitespace across pieces.
pub fn trim_pieces(pieces: &[Segment]) -> Vec<Segment> {
    let text = concat_segments(pieces);
    let leading = text.chars().take_while(|c| c.is_whitespace()).count();
    let total = text.chars().count();
    if leading == total {
        return Vec::new();
    }
    let trailing = text.chars().rev().take_while(|c| c.is_whitespace()).count();
    drop_trailing_chars(&drop_leading_chars(pieces, leading), trailing)
}

/// Join lines into one piece list with `\n` between them.
pub fn join_lines(lines: &[Vec<Segment>]) -> Vec<Segment> {
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push(Segment::plain("\n"));
        }
        out.extend(line.iter().cloned());
    }
    out
}

/// Merge adjacent pieces with identical annotations and drop empty ones.
pub fn coalesce(pieces: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if piece.content.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.annotations == piece.annotations => last.content.push_str(&piece.content),
            _ => out.push(piece),
        }
    }
    out
}
