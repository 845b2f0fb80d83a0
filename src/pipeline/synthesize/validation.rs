use super::url::is_absolute_http_url;
use crate::pipeline::types::Block;

/// Check one block against the store's structural limits.
pub fn validate_block(block: &Block) -> Result<(), String> {
    if let Some(segments) = block.segments() {
        if segments.is_empty() {
            return Err("text-bearing block has no segments".into());
        }
        if let Some(link) = segments.iter().find_map(|s| s.annotations.link.as_deref()) {
            if !is_absolute_http_url(link) {
                return Err(format!("link target is not an absolute http(s) URL: {link}"));
            }
        }
    }

    match block {
        Block::Heading { level, .. } if !(1..=3).contains(level) => {
            Err(format!("heading level {level} is outside 1..=3"))
        }
        Block::Callout { icon, .. } if icon.trim().is_empty() => Err("callout icon is empty".into()),
        Block::Code { language, .. } if language.trim().is_empty() => Err("code language is empty".into()),
        Block::Equation { expression } if expression.trim().is_empty() => {
            Err("equation expression is empty".into())
        }
        Block::Table { width, height, .. } if *width == 0 || *height == 0 => {
            Err(format!("table dimensions must be at least 1x1, got {height}x{width}"))
        }
        Block::Table {
            width, column_labels, ..
        } if column_labels.len() > *width => Err(format!(
            "{} column labels for a table {} wide",
            column_labels.len(),
            width
        )),
        Block::Image { url, .. }
        | Block::Video { url, .. }
        | Block::Embed { url, .. }
        | Block::UrlLink { url, .. }
        | Block::Bookmark { url, .. }
            if !is_absolute_http_url(url) =>
        {
            Err(format!("not an absolute http(s) URL: {url}"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Annotations, Segment};

    #[test]
    fn accepts_well_formed_blocks() {
        assert!(validate_block(&Block::heading(3, vec![Segment::plain("x")])).is_ok());
        assert!(validate_block(&Block::Divider).is_ok());
        assert!(validate_block(&Block::Image {
            url: "https://example.com/a.png".into(),
            caption: String::new()
        })
        .is_ok());
    }

    #[test]
    fn rejects_heading_level_out_of_range() {
        assert!(validate_block(&Block::heading(4, vec![Segment::plain("x")])).is_err());
        assert!(validate_block(&Block::heading(0, vec![Segment::plain("x")])).is_err());
    }

    #[test]
    fn rejects_empty_table_and_relative_media() {
        let table = Block::Table {
            width: 0,
            height: 4,
            has_column_header: false,
            has_row_header: false,
            column_labels: vec![],
        };
        assert!(validate_block(&table).is_err());
        let video = Block::Video {
            url: "/videos/intro.mp4".into(),
            caption: String::new(),
        };
        assert!(validate_block(&video).is_err());
        let ftp = Block::Bookmark {
            url: "ftp://example.com".into(),
            caption: String::new(),
        };
        assert!(validate_block(&ftp).is_err());
    }

    #[test]
    fn rejects_empty_equation_and_segments() {
        assert!(validate_block(&Block::Equation { expression: " ".into() }).is_err());
        assert!(validate_block(&Block::Quote { segments: vec![] }).is_err());
    }

    #[test]
    fn rejects_relative_link_annotation() {
        let segment = Segment::new(
            "docs",
            Annotations {
                link: Some("docs/index.html".into()),
                ..Default::default()
            },
        );
        assert!(validate_block(&Block::paragraph(vec![segment])).is_err());
    }
}
