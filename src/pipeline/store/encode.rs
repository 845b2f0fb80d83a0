//! Block → Notion block JSON.
//!
//! Pure and deterministic: the same `Block` always yields the same value.

use serde_json::{json, Map, Value};

use crate::pipeline::types::{Block, Segment};

/// Notion caps a single text object at 2000 characters.
pub const MAX_TEXT_CHARS: usize = 2000;

/// How a block's body is laid out under its type key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    RichText,
    RichTextWithIcon,
    RichTextWithChecked,
    RichTextWithLanguage,
    Empty,
    Expression,
    TableRows,
    ExternalFile,
    UrlWithCaption,
    LinkedParagraph,
}

/// Internal kind → (external type, layout). Headings resolve their type by level.
const BLOCK_MAPPING: &[(&str, &str, Layout)] = &[
    ("heading", "heading_1", Layout::RichText),
    ("paragraph", "paragraph", Layout::RichText),
    ("callout", "callout", Layout::RichTextWithIcon),
    ("quote", "quote", Layout::RichText),
    ("todo", "to_do", Layout::RichTextWithChecked),
    ("bulleted_item", "bulleted_list_item", Layout::RichText),
    ("numbered_item", "numbered_list_item", Layout::RichText),
    ("code", "code", Layout::RichTextWithLanguage),
    ("toggle", "toggle", Layout::RichText),
    ("divider", "divider", Layout::Empty),
    ("table_of_contents", "table_of_contents", Layout::Empty),
    ("breadcrumb", "breadcrumb", Layout::Empty),
    ("equation", "equation", Layout::Expression),
    ("table", "table", Layout::TableRows),
    ("image", "image", Layout::ExternalFile),
    ("video", "video", Layout::ExternalFile),
    ("embed", "embed", Layout::UrlWithCaption),
    ("bookmark", "bookmark", Layout::UrlWithCaption),
    ("url_link", "paragraph", Layout::LinkedParagraph),
];

const HEADING_TYPES: [&str; 3] = ["heading_1", "heading_2", "heading_3"];

fn mapping(block: &Block) -> (&'static str, Layout) {
    let kind = block.kind_name();
    let (_, external, layout) = BLOCK_MAPPING
        .iter()
        .find(|(k, _, _)| *k == kind)
        .copied()
        .unwrap_or(("paragraph", "paragraph", Layout::RichText));
    match block {
        Block::Heading { level, .. } => {
            let index = usize::from((*level).clamp(1, 3)) - 1;
            (HEADING_TYPES[index], layout)
        }
        _ => (external, layout),
    }
}

/// External type name the block is sent as.
pub fn external_type(block: &Block) -> &'static str {
    mapping(block).0
}

fn text_object(content: &str, segment: &Segment) -> Value {
    let a = &segment.annotations;
    let link = a.link.as_ref().map_or(Value::Null, |url| json!({ "url": url }));
    json!({
        "type": "text",
        "text": { "content": content, "link": link },
        "annotations": {
            "bold": a.bold,
            "italic": a.italic,
            "strikethrough": a.strikethrough,
            "underline": a.underline,
            "code": a.code,
            "color": a.color.as_str(),
        },
    })
}

/// Segments as Notion rich text. Empty segments are omitted and long ones are
/// split into several runs with the same annotations.
pub fn encode_rich_text(segments: &[Segment]) -> Vec<Value> {
    let mut runs = Vec::with_capacity(segments.len());
    for segment in segments.iter().filter(|s| !s.content.is_empty()) {
        let chars: Vec<char> = segment.content.chars().collect();
        for chunk in chars.chunks(MAX_TEXT_CHARS) {
            let content: String = chunk.iter().collect();
            runs.push(text_object(&content, segment));
        }
    }
    runs
}

fn plain_rich_text(text: &str) -> Vec<Value> {
    encode_rich_text(&[Segment::plain(text)])
}

fn table_rows(width: usize, height: usize, labels: &[String]) -> Vec<Value> {
    (0..height)
        .map(|row| {
            let cells: Vec<Value> = (0..width)
                .map(|col| {
                    let label = if row == 0 { labels.get(col) } else { None };
                    Value::Array(label.map(|l| plain_rich_text(l)).unwrap_or_default())
                })
                .collect();
            json!({
                "object": "block",
                "type": "table_row",
                "table_row": { "cells": cells },
            })
        })
        .collect()
}

fn body(block: &Block, layout: Layout) -> Value {
    let segments = block.segments().unwrap_or(&[]);
    match (layout, block) {
        (Layout::RichTextWithIcon, Block::Callout { icon, .. }) => json!({
            "rich_text": encode_rich_text(segments),
            "icon": { "type": "emoji", "emoji": icon },
        }),
        (Layout::RichTextWithChecked, Block::Todo { checked, .. }) => json!({
            "rich_text": encode_rich_text(segments),
            "checked": checked,
        }),
        (Layout::RichTextWithLanguage, Block::Code { language, .. }) => json!({
            "rich_text": encode_rich_text(segments),
            "language": language,
        }),
        (Layout::Expression, Block::Equation { expression }) => json!({ "expression": expression }),
        (
            Layout::TableRows,
            Block::Table {
                width,
                height,
                has_column_header,
                has_row_header,
                column_labels,
            },
        ) => json!({
            "table_width": width,
            "has_column_header": has_column_header,
            "has_row_header": has_row_header,
            "children": table_rows(*width, *height, column_labels),
        }),
        (Layout::ExternalFile, Block::Image { url, caption } | Block::Video { url, caption }) => json!({
            "type": "external",
            "external": { "url": url },
            "caption": plain_rich_text(caption),
        }),
        (Layout::UrlWithCaption, Block::Embed { url, caption } | Block::Bookmark { url, caption }) => json!({
            "url": url,
            "caption": plain_rich_text(caption),
        }),
        (Layout::LinkedParagraph, Block::UrlLink { url, title }) => {
            let mut run = Segment::plain(title.as_deref().unwrap_or(url));
            run.annotations.link = Some(url.clone());
            json!({ "rich_text": encode_rich_text(&[run]) })
        }
        (Layout::Empty, _) => Value::Object(Map::new()),
        _ => json!({ "rich_text": encode_rich_text(segments) }),
    }
}

pub fn encode_block(block: &Block) -> Value {
    let (external, layout) = mapping(block);
    let mut object = Map::new();
    object.insert("object".into(), Value::from("block"));
    object.insert("type".into(), Value::from(external));
    object.insert(external.into(), body(block, layout));
    Value::Object(object)
}

pub fn encode_blocks(blocks: &[Block]) -> Vec<Value> {
    blocks.iter().map(encode_block).collect()
}
