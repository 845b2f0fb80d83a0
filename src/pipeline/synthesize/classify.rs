//! Section → block classification.

use std::sync::LazyLock;

use regex::Regex;

use super::cues::Cues;
use super::lines::{coalesce, drop_leading_chars, drop_trailing_chars, join_lines, trim_pieces, Line};
use super::section::{is_title_like, Section};
use super::table::{has_dimension_phrase, table_spec};
use super::url::{inspect_line, kind_from_url, kind_from_words, MediaKind, UrlLine};
use crate::pipeline::types::{concat_segments, non_empty_segments, Block, Segment};

pub const DEFAULT_CALLOUT_ICON: &str = "💡";
const CALLOUT_EMOJIS: &[&str] = &["💡", "⚠️", "⚠", "📌", "❗", "ℹ️", "ℹ", "🔥", "✨"];
const CALLOUT_PREFIXES: &[&str] = &[
    "중요:", "참고:", "주의:", "팁:", "note:", "important:", "tip:", "warning:",
];
const TOGGLE_MARKERS: &[char] = &['▶', '▸'];
const TOGGLE_TOKEN: &str = "[펼치기/접기]";
const MAX_EQUATION_CHARS: usize = 120;
const MATH_WORDS: &[&str] = &["sin", "cos", "tan", "log", "ln", "lim", "sqrt", "frac", "sum", "int", "exp", "max", "min"];
const MEDIA_LABELS: &[&str] = &[
    "image", "이미지", "사진", "video", "영상", "동영상", "유튜브", "youtube", "embed", "임베드",
    "bookmark", "북마크", "link", "링크", "url",
];

static DISPLAY_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*\$\$(.+?)\$\$\s*$").expect("valid regex"));
static INLINE_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\$([^$]+)\$\s*$").expect("valid regex"));
static WHOLLY_QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\s*["“「『].+["”」』]\s*(?:[-—–―]\s*\S.*)?$"#).expect("valid regex")
});
static ALPHA_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("valid regex"));

/// Map a fence info string or language name onto the store's vocabulary.
pub fn normalize_language(raw: &str) -> &'static str {
    match raw.trim().to_lowercase().as_str() {
        "js" | "javascript" | "node" | "jsx" => "javascript",
        "ts" | "typescript" | "tsx" => "typescript",
        "py" | "python" | "python3" => "python",
        "rs" | "rust" => "rust",
        "java" => "java",
        "kt" | "kotlin" => "kotlin",
        "go" | "golang" => "go",
        "c" => "c",
        "cpp" | "c++" | "cc" => "c++",
        "cs" | "csharp" | "c#" => "c#",
        "rb" | "ruby" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "sh" | "shell" | "zsh" => "shell",
        "bash" => "bash",
        "sql" => "sql",
        "html" => "html",
        "css" | "scss" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "md" | "markdown" => "markdown",
        "dockerfile" | "docker" => "docker",
        "r" => "r",
        "scala" => "scala",
        "dart" => "dart",
        "lua" => "lua",
        "latex" | "tex" => "latex",
        _ => "plain text",
    }
}

fn leading_marker_chars(text: &str, marker: &str) -> Option<usize> {
    let indent = text.chars().take_while(|c| c.is_whitespace()).count();
    let rest: String = text.chars().skip(indent).collect();
    let after = rest.strip_prefix(marker)?;
    let gap = after.chars().take_while(|c| c.is_whitespace()).count();
    Some(indent + marker.chars().count() + gap)
}

fn equation_expression(text: &str) -> Option<String> {
    let captured = DISPLAY_MATH_RE
        .captures(text)
        .or_else(|| INLINE_MATH_RE.captures(text))
        .map(|c| c[1].trim().to_string());
    if let Some(expression) = captured {
        return (!expression.is_empty()).then_some(expression);
    }

    let trimmed = text.trim();
    if trimmed.contains('\n') || trimmed.chars().count() > MAX_EQUATION_CHARS || !trimmed.contains('=') {
        return None;
    }
    let allowed = |c: char| {
        c.is_ascii_alphanumeric() || c.is_whitespace() || "+-*/^=().,_{}[]\\<>!|'√πΣ∫²³±×÷≤≥≠∞∑".contains(c)
    };
    let has_operator = trimmed.chars().any(|c| "+-*/^√Σ∫×÷∑".contains(c));
    let wordy = ALPHA_RUN_RE
        .find_iter(trimmed)
        .any(|m| m.as_str().len() > 3 && !MATH_WORDS.contains(&m.as_str().to_lowercase().as_str()));
    (trimmed.chars().all(allowed) && has_operator && !wordy).then(|| trimmed.to_string())
}

fn is_wholly_quoted(text: &str) -> bool {
    WHOLLY_QUOTED_RE.is_match(text)
}

/// Stateful classifier: at most one section becomes the requested table.
pub struct Classifier<'a> {
    cues: &'a Cues,
    pub table_placed: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(cues: &'a Cues) -> Self {
        Self {
            cues,
            table_placed: false,
        }
    }

    pub fn classify(&mut self, section: Section, is_last: bool) -> Block {
        match section {
            Section::Code { info, lines } => {
                let pieces: Vec<Vec<Segment>> = lines.into_iter().map(|l| l.pieces).collect();
                let language = if info.is_empty() {
                    self.cues
                        .default_code_language()
                        .unwrap_or_else(|| "plain text".to_string())
                } else {
                    normalize_language(&info).to_string()
                };
                Block::Code {
                    segments: non_empty_segments(coalesce(join_lines(&pieces))),
                    language,
                }
            }
            Section::Divider => Block::Divider,
            Section::Heading { level, pieces } => Block::heading(level, coalesce(pieces)),
            Section::Quote { lines } => Block::Quote {
                segments: non_empty_segments(coalesce(join_lines(&lines))),
            },
            Section::Todo { checked, pieces } => Block::Todo {
                segments: non_empty_segments(coalesce(pieces)),
                checked,
            },
            Section::Bullet { pieces } => Block::BulletedItem {
                segments: non_empty_segments(coalesce(pieces)),
            },
            Section::Numbered { pieces } => Block::NumberedItem {
                segments: non_empty_segments(coalesce(pieces)),
            },
            Section::Url { line } => self.classify_url(line),
            Section::Text { lines } => self.classify_text(lines, is_last),
        }
    }

    fn classify_url(&self, line: Line) -> Block {
        let text = line.text();
        let UrlLine::Single {
            url,
            title,
            markdown_image,
        } = inspect_line(&text)
        else {
            return Block::paragraph(coalesce(trim_pieces(&line.pieces)));
        };

        let kind = self
            .cues
            .media_kind_for(&url)
            .or(markdown_image.then_some(MediaKind::Image))
            .or_else(|| kind_from_url(&url))
            .or_else(|| title.as_deref().and_then(kind_from_words))
            .unwrap_or(if title.is_some() {
                MediaKind::Link
            } else {
                MediaKind::Bookmark
            });

        let caption = title
            .filter(|t| !MEDIA_LABELS.contains(&t.to_lowercase().as_str()))
            .unwrap_or_default();

        match kind {
            MediaKind::Image => Block::Image { url, caption },
            MediaKind::Video => Block::Video { url, caption },
            MediaKind::Embed => Block::Embed { url, caption },
            MediaKind::Bookmark => Block::Bookmark { url, caption },
            MediaKind::Link => Block::UrlLink {
                url,
                title: (!caption.is_empty()).then_some(caption),
            },
        }
    }

    fn classify_text(&mut self, lines: Vec<Line>, is_last: bool) -> Block {
        let line_pieces: Vec<Vec<Segment>> = lines.iter().map(|l| l.pieces.clone()).collect();
        let joined = trim_pieces(&join_lines(&line_pieces));
        let text = concat_segments(&joined);
        let single_line = lines.len() == 1;
        let named_level = single_line.then(|| self.cues.heading_level_for(&text)).flatten();

        if named_level.is_none() {
            if let Some(language) = self.cues.code_for(&text) {
                return Block::Code {
                    segments: non_empty_segments(coalesce(joined)),
                    language,
                };
            }
        }

        if is_wholly_quoted(&text) {
            return Block::Quote {
                segments: non_empty_segments(coalesce(joined)),
            };
        }

        if let Some(block) = self.callout(&joined, &text) {
            return block;
        }

        if !self.table_placed && has_dimension_phrase(&text) {
            if let Some(instructions) = &self.cues.table {
                self.table_placed = true;
                return table_spec(&format!("{instructions} {text}")).into_block();
            }
        }

        if let Some(block) = self.toggle(&joined, &text) {
            return block;
        }

        if let Some(expression) = equation_expression(&text) {
            return Block::Equation { expression };
        }

        if let Some(level) = named_level {
            return Block::heading(level, coalesce(joined));
        }
        if single_line {
            if is_title_like(&text) && !is_last {
                return Block::heading(1, coalesce(joined));
            }
        }

        Block::paragraph(coalesce(joined))
    }

    fn callout(&self, pieces: &[Segment], text: &str) -> Option<Block> {
        for emoji in CALLOUT_EMOJIS {
            if let Some(marker) = leading_marker_chars(text, emoji) {
                return Some(Block::Callout {
                    segments: non_empty_segments(coalesce(drop_leading_chars(pieces, marker))),
                    icon: emoji.to_string(),
                });
            }
        }

        let lower = text.trim_start().to_lowercase();
        let prefixed = CALLOUT_PREFIXES.iter().any(|p| lower.starts_with(p));
        let clause_icon = self.cues.callout_for(text);
        if !prefixed && clause_icon.is_none() {
            return None;
        }
        let icon = clause_icon
            .flatten()
            .unwrap_or_else(|| DEFAULT_CALLOUT_ICON.to_string());
        Some(Block::Callout {
            segments: non_empty_segments(coalesce(pieces.to_vec())),
            icon,
        })
    }

    fn toggle(&self, pieces: &[Segment], text: &str) -> Option<Block> {
        let trimmed = text.trim();
        let first = trimmed.chars().next()?;
        let segments = if TOGGLE_MARKERS.contains(&first) {
            let marker = leading_marker_chars(text, &first.to_string())?;
            drop_leading_chars(pieces, marker)
        } else if trimmed.starts_with(TOGGLE_TOKEN) {
            let marker = leading_marker_chars(text, TOGGLE_TOKEN)?;
            drop_leading_chars(pieces, marker)
        } else if trimmed.ends_with(TOGGLE_TOKEN) {
            trim_pieces(&drop_trailing_chars(pieces, TOGGLE_TOKEN.chars().count()))
        } else if self.cues.is_toggle(text) {
            pieces.to_vec()
        } else {
            return None;
        };
        Some(Block::Toggle {
            segments: non_empty_segments(coalesce(segments)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::synthesize::lines::split_lines;
    use crate::pipeline::types::{Annotations, Color};

    fn text_section(text: &str) -> Section {
        Section::Text {
            lines: split_lines(&[Segment::plain(text)]),
        }
    }

    fn classify(instructions: &str, section: Section, is_last: bool) -> Block {
        let cues = Cues::parse(instructions);
        Classifier::new(&cues).classify(section, is_last)
    }

    #[test]
    fn language_normalization() {
        assert_eq!(normalize_language("JS"), "javascript");
        assert_eq!(normalize_language("c++"), "c++");
        assert_eq!(normalize_language("yml"), "yaml");
        assert_eq!(normalize_language("brainfuck"), "plain text");
        assert_eq!(normalize_language(""), "plain text");
    }

    #[test]
    fn fence_without_info_uses_instruction_language() {
        let section = Section::Code {
            info: String::new(),
            lines: split_lines(&[Segment::plain("print(1)")]),
        };
        assert_eq!(
            classify("Code block in Python", section.clone(), false),
            Block::Code {
                segments: vec![Segment::plain("print(1)")],
                language: "python".into()
            }
        );
        assert!(matches!(classify("", section, false), Block::Code { language, .. } if language == "plain text"));
    }

    #[test]
    fn image_url_line() {
        let section = Section::Url {
            line: split_lines(&[Segment::plain("https://example.com/image.png")]).remove(0),
        };
        assert_eq!(
            classify("", section, true),
            Block::Image {
                url: "https://example.com/image.png".into(),
                caption: String::new()
            }
        );
    }

    #[test]
    fn url_kinds_by_title_and_cue() {
        let line = |t: &str| Section::Url {
            line: split_lines(&[Segment::plain(t)]).remove(0),
        };
        assert_eq!(
            classify("", line("Rust Book: https://doc.rust-lang.org/book/"), false),
            Block::UrlLink {
                url: "https://doc.rust-lang.org/book/".into(),
                title: Some("Rust Book".into())
            }
        );
        assert!(matches!(
            classify("", line("https://doc.rust-lang.org/book/"), false),
            Block::Bookmark { .. }
        ));
        assert!(matches!(
            classify("Add Embed block (https://codepen.io/pen/abc)", line("https://codepen.io/pen/abc"), false),
            Block::Embed { .. }
        ));
        assert!(matches!(
            classify("", line("유튜브: https://www.youtube.com/watch?v=UB1O30fR-EE"), false),
            Block::Video { caption, .. } if caption.is_empty()
        ));
        assert!(matches!(
            classify("", line("이미지: https://example.com/photo"), false),
            Block::Image { .. }
        ));
    }

    #[test]
    fn quoted_text_becomes_quote() {
        let block = classify("", text_section("\"Stay hungry, stay foolish.\" - Steve Jobs"), false);
        assert_eq!(block.kind_name(), "quote");
        assert_eq!(block.plain_text(), "\"Stay hungry, stay foolish.\" - Steve Jobs");
    }

    #[test]
    fn emoji_and_prefix_callouts() {
        let block = classify("", text_section("⚠️ 실행 전에 백업하세요."), false);
        assert_eq!(
            block,
            Block::Callout {
                segments: vec![Segment::plain("실행 전에 백업하세요.")],
                icon: "⚠️".into()
            }
        );
        let block = classify("", text_section("참고: 자세한 내용은 문서를 보세요."), false);
        assert!(matches!(block, Block::Callout { icon, .. } if icon == DEFAULT_CALLOUT_ICON));
        let block = classify("Callout 📌 for '마감'", text_section("마감은 금요일입니다."), false);
        assert!(matches!(block, Block::Callout { icon, .. } if icon == "📌"));
    }

    #[test]
    fn dimension_section_becomes_table_when_requested() {
        let cues = Cues::parse("Add a table with a header row");
        let mut classifier = Classifier::new(&cues);
        let block = classifier.classify(text_section("4 rows, 3 columns"), false);
        assert_eq!(
            block,
            Block::Table {
                width: 3,
                height: 4,
                has_column_header: true,
                has_row_header: false,
                column_labels: vec![]
            }
        );
        assert!(classifier.table_placed);
        let second = classifier.classify(text_section("2 rows, 2 columns"), true);
        assert_eq!(second.kind_name(), "paragraph");
    }

    #[test]
    fn dimension_text_without_table_cue_stays_text() {
        assert_eq!(classify("", text_section("The hall has 40 rows of seats."), false).kind_name(), "paragraph");
    }

    #[test]
    fn toggle_markers() {
        assert_eq!(
            classify("", text_section("▶ 자세히 보기"), false),
            Block::Toggle {
                segments: vec![Segment::plain("자세히 보기")]
            }
        );
        assert_eq!(
            classify("", text_section("FAQ [펼치기/접기]"), false),
            Block::Toggle {
                segments: vec![Segment::plain("FAQ")]
            }
        );
    }

    #[test]
    fn equations() {
        assert_eq!(
            classify("", text_section("$$E = mc^2$$"), false),
            Block::Equation {
                expression: "E = mc^2".into()
            }
        );
        assert_eq!(
            classify("", text_section("a^2 + b^2 = c^2"), false),
            Block::Equation {
                expression: "a^2 + b^2 = c^2".into()
            }
        );
        assert_eq!(classify("", text_section("Total cost = price + tax"), true).kind_name(), "paragraph");
        assert_eq!(equation_expression("x = y"), None);
    }

    #[test]
    fn title_like_line_becomes_heading_unless_last() {
        assert_eq!(
            classify("", text_section("웹 개발 가이드"), false),
            Block::heading(1, vec![Segment::plain("웹 개발 가이드")])
        );
        assert_eq!(classify("", text_section("Hello world"), true).kind_name(), "paragraph");
    }

    #[test]
    fn heading_level_from_clause() {
        let block = classify("Heading 2: 'Setup'", text_section("Setup"), true);
        assert_eq!(block, Block::heading(2, vec![Segment::plain("Setup")]));
    }

    #[test]
    fn multi_line_paragraph_keeps_newlines_and_annotations() {
        let bold = Annotations {
            bold: true,
            color: Color::Red,
            ..Default::default()
        };
        let section = Section::Text {
            lines: split_lines(&[
                Segment::new("Java", bold.clone()),
                Segment::plain(" is a language.\nIt runs on the JVM."),
            ]),
        };
        let block = classify("", section, false);
        assert_eq!(
            block,
            Block::Paragraph {
                segments: vec![
                    Segment::new("Java", bold),
                    Segment::plain(" is a language.\nIt runs on the JVM.")
                ]
            }
        );
    }

    #[test]
    fn code_cue_turns_matching_text_into_code() {
        let block = classify(
            "Add Code block (javascript) with console.log('Hello World')",
            text_section("console.log('Hello World')"),
            false,
        );
        assert_eq!(
            block,
            Block::Code {
                segments: vec![Segment::plain("console.log('Hello World')")],
                language: "javascript".into()
            }
        );
    }

    #[test]
    fn named_heading_wins_over_code_clause() {
        let block = classify(
            "Heading 2: 'Setup code'. Add Code block with Setup code",
            text_section("Setup code"),
            false,
        );
        assert_eq!(block, Block::heading(2, vec![Segment::plain("Setup code")]));
    }
}
