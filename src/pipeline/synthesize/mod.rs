//! Block Synthesizer: turns annotated text plus `block_instructions` into an
//! ordered list of blocks.
//!
//! The pass is deterministic and makes no oracle calls:
//! 1. split the segment stream into lines (`lines`),
//! 2. group lines into sections at marker and blank-line boundaries (`section`),
//! 3. classify each section into a block (`classify`), guided by the
//!    structural cues read from the instructions (`cues`, `table`, `url`),
//! 4. place instruction-only blocks (breadcrumb, table of contents,
//!    dividers, an unplaced table),
//! 5. validate every block (`validation`).

pub mod classify;
pub mod cues;
pub mod lines;
pub mod section;
pub mod table;
pub mod url;
pub mod validation;

use classify::Classifier;
use cues::{Cues, DividerPlacement};
use lines::split_lines;
use section::sectionize;
use table::table_spec;
use validation::validate_block;

use crate::pipeline::types::{Block, Segment};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesizeError {
    #[error("no blocks produced")]
    NoBlocks,

    #[error("block {index} ({kind}) is invalid: {reason}")]
    InvalidBlock {
        index: usize,
        kind: &'static str,
        reason: String,
    },
}

/// Stateless; every call is independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockSynthesizer;

impl BlockSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(
        &self,
        block_instructions: &str,
        segments: &[Segment],
    ) -> Result<Vec<Block>, SynthesizeError> {
        let cues = Cues::parse(block_instructions);
        let lines = split_lines(segments);
        let sections = sectionize(&lines);
        let section_count = sections.len();

        let mut classifier = Classifier::new(&cues);
        let mut body: Vec<Block> = Vec::with_capacity(section_count + 4);
        for (i, section) in sections.into_iter().enumerate() {
            body.push(classifier.classify(section, i + 1 == section_count));
        }

        if !classifier.table_placed {
            if let Some(instructions) = &cues.table {
                body.push(table_spec(instructions).into_block());
            }
        }

        let body = place_dividers(body, cues.divider);

        let mut blocks = Vec::with_capacity(body.len() + 2);
        if cues.breadcrumb {
            blocks.push(Block::Breadcrumb);
        }
        if cues.table_of_contents {
            blocks.push(Block::TableOfContents);
        }
        blocks.extend(body);

        if blocks.is_empty() {
            return Err(SynthesizeError::NoBlocks);
        }

        for (index, block) in blocks.iter().enumerate() {
            validate_block(block).map_err(|reason| SynthesizeError::InvalidBlock {
                index,
                kind: block.kind_name(),
                reason,
            })?;
        }

        tracing::debug!(
            sections = section_count,
            blocks = blocks.len(),
            "Blocks synthesized"
        );
        Ok(blocks)
    }
}

fn place_dividers(body: Vec<Block>, placement: Option<DividerPlacement>) -> Vec<Block> {
    let Some(placement) = placement else {
        return body;
    };
    let headings = body.iter().filter(|b| matches!(b, Block::Heading { .. })).count();
    if placement == DividerPlacement::BetweenSections && headings >= 2 {
        let mut placed = Vec::with_capacity(body.len() + headings);
        let mut seen_heading = false;
        for block in body {
            if matches!(block, Block::Heading { .. }) {
                if seen_heading && !matches!(placed.last(), Some(Block::Divider)) {
                    placed.push(Block::Divider);
                }
                seen_heading = true;
            }
            placed.push(block);
        }
        return placed;
    }

    let mut body = body;
    if !body.iter().any(|b| matches!(b, Block::Divider)) {
        body.push(Block::Divider);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Annotations, Color};

    fn synthesize(instructions: &str, text: &str) -> Result<Vec<Block>, SynthesizeError> {
        BlockSynthesizer::new().synthesize(instructions, &[Segment::plain(text)])
    }

    fn kinds(blocks: &[Block]) -> Vec<&'static str> {
        blocks.iter().map(Block::kind_name).collect()
    }

    #[test]
    fn divider_instruction_without_text() {
        assert_eq!(synthesize("Add a divider", "").unwrap(), vec![Block::Divider]);
    }

    #[test]
    fn image_url_becomes_image_block() {
        assert_eq!(
            synthesize("", "https://example.com/image.png").unwrap(),
            vec![Block::Image {
                url: "https://example.com/image.png".into(),
                caption: String::new()
            }]
        );
    }

    #[test]
    fn table_from_instructions_only() {
        let blocks = synthesize("Add a table with 4 rows, 3 columns", "").unwrap();
        assert_eq!(
            blocks,
            vec![Block::Table {
                width: 3,
                height: 4,
                has_column_header: false,
                has_row_header: false,
                column_labels: vec![]
            }]
        );
    }

    #[test]
    fn table_replaces_dimension_section() {
        let blocks = synthesize(
            "Add a table with a header row",
            "학습 계획입니다.\n\n4 rows, 3 columns",
        )
        .unwrap();
        assert_eq!(kinds(&blocks), vec!["paragraph", "table"]);
        assert!(matches!(
            blocks[1],
            Block::Table {
                width: 3,
                height: 4,
                has_column_header: true,
                ..
            }
        ));
    }

    #[test]
    fn one_block_per_list_item() {
        let blocks = synthesize("", "- 사과\n- 배\n- 포도\n1. 첫째\n2. 둘째\n- [x] 완료").unwrap();
        assert_eq!(
            kinds(&blocks),
            vec![
                "bulleted_item",
                "bulleted_item",
                "bulleted_item",
                "numbered_item",
                "numbered_item",
                "todo"
            ]
        );
        assert_eq!(blocks[1].plain_text(), "배");
        assert!(matches!(blocks[5], Block::Todo { checked: true, .. }));
    }

    #[test]
    fn plain_segments_yield_unstyled_blocks() {
        let blocks = synthesize("", "# 소개\n\nRust는 시스템 언어입니다.\n\n- 안전성\n- 속도").unwrap();
        assert_eq!(kinds(&blocks), vec!["heading", "paragraph", "bulleted_item", "bulleted_item"]);
        for block in &blocks {
            for segment in block.segments().unwrap() {
                assert!(segment.annotations.is_plain());
            }
        }
    }

    #[test]
    fn dividers_between_headings() {
        let text = "# 첫 번째\n\n첫 섹션 내용입니다.\n\n# 두 번째\n\n둘째 섹션 내용입니다.\n\n# 세 번째\n\n마지막 내용입니다.";
        let blocks = synthesize("섹션 사이에 구분선을 넣어줘", text).unwrap();
        assert_eq!(
            kinds(&blocks),
            vec![
                "heading", "paragraph", "divider", "heading", "paragraph", "divider", "heading", "paragraph"
            ]
        );
    }

    #[test]
    fn between_cue_without_headings_appends_one_divider() {
        let blocks = synthesize("섹션 사이에 구분선", "한 문단입니다.").unwrap();
        assert_eq!(kinds(&blocks), vec!["paragraph", "divider"]);
    }

    #[test]
    fn existing_divider_is_not_duplicated() {
        let blocks = synthesize("Add a divider", "위 문단입니다.\n---\n아래 문단입니다.").unwrap();
        assert_eq!(kinds(&blocks), vec!["paragraph", "divider", "paragraph"]);
    }

    #[test]
    fn breadcrumb_then_table_of_contents_on_top() {
        let blocks = synthesize("Add a table of contents. Add a breadcrumb.", "본문입니다.").unwrap();
        assert_eq!(kinds(&blocks), vec!["breadcrumb", "table_of_contents", "paragraph"]);
    }

    #[test]
    fn empty_input_without_cues_fails() {
        assert_eq!(synthesize("", ""), Err(SynthesizeError::NoBlocks));
        assert_eq!(synthesize("", "\n\n  \n"), Err(SynthesizeError::NoBlocks));
        assert_eq!(
            SynthesizeError::NoBlocks.to_string(),
            "no blocks produced"
        );
    }

    #[test]
    fn fenced_code_keeps_body() {
        let blocks = synthesize("", "예제:\n\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```").unwrap();
        assert_eq!(
            blocks[1],
            Block::Code {
                segments: vec![Segment::plain("fn main() {\n    println!(\"hi\");\n}")],
                language: "rust".into()
            }
        );
    }

    #[test]
    fn annotations_survive_synthesis() {
        let red_bold = Annotations {
            bold: true,
            color: Color::Red,
            ..Default::default()
        };
        let segments = vec![
            Segment::new("Java", red_bold.clone()),
            Segment::plain(" is a language."),
        ];
        let blocks = BlockSynthesizer::new().synthesize("", &segments).unwrap();
        assert_eq!(blocks, vec![Block::paragraph(segments)]);
    }

    #[test]
    fn heading_titled_code_examples_stays_a_heading() {
        let blocks = synthesize("Heading 2: 'Code Examples'. Paragraph: intro", "Code Examples\n\nSome prose here.").unwrap();
        assert_eq!(
            blocks,
            vec![
                Block::heading(2, vec![Segment::plain("Code Examples")]),
                Block::paragraph(vec![Segment::plain("Some prose here.")]),
            ]
        );
    }
}
