use serde::{Deserialize, Deserializer, Serialize};

/// Text color vocabulary shared with the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Default,
    Gray,
    Brown,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Red,
}

impl Color {
    /// Resolve an English or Korean color name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        let color = match lower.as_str() {
            "default" | "기본" | "기본색" => Color::Default,
            "gray" | "grey" | "회색" => Color::Gray,
            "brown" | "갈색" => Color::Brown,
            "orange" | "주황" | "주황색" => Color::Orange,
            "yellow" | "노랑" | "노란색" => Color::Yellow,
            "green" | "초록" | "초록색" | "녹색" => Color::Green,
            "blue" | "파랑" | "파란색" => Color::Blue,
            "purple" | "보라" | "보라색" => Color::Purple,
            "pink" | "분홍" | "분홍색" => Color::Pink,
            "red" | "빨강" | "빨간색" => Color::Red,
            _ => return None,
        };
        Some(color)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Default => "default",
            Color::Gray => "gray",
            Color::Brown => "brown",
            Color::Orange => "orange",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Pink => "pink",
            Color::Red => "red",
        }
    }
}

/// Unknown color names deserialize to `Color::Default` instead of failing.
impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(Color::parse).unwrap_or_default())
    }
}

/// Style flags applied to a run of text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        *self == Annotations::default()
    }

    /// Combine two annotation sets. Flags are OR-ed; a non-default color
    /// and an explicit link on `other` win.
    pub fn union(&self, other: &Annotations) -> Annotations {
        Annotations {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
            strikethrough: self.strikethrough || other.strikethrough,
            code: self.code || other.code,
            color: if other.color != Color::Default {
                other.color
            } else {
                self.color
            },
            link: other.link.clone().or_else(|| self.link.clone()),
        }
    }
}

/// A run of text with its annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub content: String,
    #[serde(default)]
    pub annotations: Annotations,
}

impl Segment {
    pub fn new(content: impl Into<String>, annotations: Annotations) -> Self {
        Self {
            content: content.into(),
            annotations,
        }
    }

    pub fn plain(content: impl Into<String>) -> Self {
        Self::new(content, Annotations::default())
    }
}

/// Concatenate segment contents in order.
pub fn concat_segments(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.content.as_str()).collect()
}

/// Guarantee the non-empty segment invariant of text-bearing blocks.
pub fn non_empty_segments(segments: Vec<Segment>) -> Vec<Segment> {
    if segments.is_empty() {
        vec![Segment::plain("")]
    } else {
        segments
    }
}

/// Output of the instruction splitter. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstructionTriple {
    pub block_instructions: String,
    pub format_instructions: String,
    pub result_text: String,
}

/// Identifier assigned to a block by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed document block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        segments: Vec<Segment>,
    },
    Paragraph {
        segments: Vec<Segment>,
    },
    Callout {
        segments: Vec<Segment>,
        icon: String,
    },
    Quote {
        segments: Vec<Segment>,
    },
    Todo {
        segments: Vec<Segment>,
        #[serde(default)]
        checked: bool,
    },
    BulletedItem {
        segments: Vec<Segment>,
    },
    NumberedItem {
        segments: Vec<Segment>,
    },
    Code {
        segments: Vec<Segment>,
        language: String,
    },
    Toggle {
        segments: Vec<Segment>,
    },
    Divider,
    TableOfContents,
    Breadcrumb,
    Equation {
        expression: String,
    },
    Table {
        width: usize,
        height: usize,
        #[serde(default)]
        has_column_header: bool,
        #[serde(default)]
        has_row_header: bool,
        #[serde(default)]
        column_labels: Vec<String>,
    },
    Image {
        url: String,
        #[serde(default)]
        caption: String,
    },
    Video {
        url: String,
        #[serde(default)]
        caption: String,
    },
    Embed {
        url: String,
        #[serde(default)]
        caption: String,
    },
    UrlLink {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
    Bookmark {
        url: String,
        #[serde(default)]
        caption: String,
    },
}

impl Block {
    pub fn paragraph(segments: Vec<Segment>) -> Self {
        Block::Paragraph {
            segments: non_empty_segments(segments),
        }
    }

    pub fn heading(level: u8, segments: Vec<Segment>) -> Self {
        Block::Heading {
            level,
            segments: non_empty_segments(segments),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::Callout { .. } => "callout",
            Block::Quote { .. } => "quote",
            Block::Todo { .. } => "todo",
            Block::BulletedItem { .. } => "bulleted_item",
            Block::NumberedItem { .. } => "numbered_item",
            Block::Code { .. } => "code",
            Block::Toggle { .. } => "toggle",
            Block::Divider => "divider",
            Block::TableOfContents => "table_of_contents",
            Block::Breadcrumb => "breadcrumb",
            Block::Equation { .. } => "equation",
            Block::Table { .. } => "table",
            Block::Image { .. } => "image",
            Block::Video { .. } => "video",
            Block::Embed { .. } => "embed",
            Block::UrlLink { .. } => "url_link",
            Block::Bookmark { .. } => "bookmark",
        }
    }

    /// Text segments of text-bearing variants; `None` for the rest.
    pub fn segments(&self) -> Option<&[Segment]> {
        match self {
            Block::Heading { segments, .. }
            | Block::Paragraph { segments }
            | Block::Callout { segments, .. }
            | Block::Quote { segments }
            | Block::Todo { segments, .. }
            | Block::BulletedItem { segments }
            | Block::NumberedItem { segments }
            | Block::Code { segments, .. }
            | Block::Toggle { segments } => Some(segments),
            _ => None,
        }
    }

    pub fn plain_text(&self) -> String {
        self.segments().map(concat_segments).unwrap_or_default()
    }
}
