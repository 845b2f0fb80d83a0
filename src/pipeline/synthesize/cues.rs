//! Structural cues read from `block_instructions`.

use std::sync::LazyLock;

use regex::Regex;

use super::classify::normalize_language;
use super::table::has_dimension_phrase;
use super::url::{find_urls, kind_from_words, short_host, MediaKind};

static CLAUSE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.;。]\s+|[.;。]$|\n").expect("valid regex"));
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'([^']+)'|"([^"]+)"|‘([^’]+)’|“([^”]+)”|「([^」]+)」|『([^』]+)』"#).expect("valid regex")
});
static HEADING_LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)heading[\s_-]*([1-3])|\bh([1-3])\b").expect("valid regex"));
static CODE_PAYLOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwith\s+(.+)$|[:：]\s*(.+)$").expect("valid regex"));
static LABELLED_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:heading[\s_-]*[1-3]|\bh[1-3]\b|소제목|제목|title|subtitle)\s*[:：]\s*(.+)$").expect("valid regex")
});

const NOTE_EMOJIS: &[&str] = &["💡", "⚠️", "⚠", "📌", "❗", "ℹ️", "ℹ", "🔥", "✨"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DividerPlacement {
    /// Before every heading except the first.
    BetweenSections,
    /// One divider after the last block.
    Append,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub text: String,
    pub lower: String,
    pub quoted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCue {
    pub phrase: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalloutCue {
    pub phrases: Vec<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaCue {
    /// Exact URLs and bare hosts mentioned by the clause.
    pub needles: Vec<String>,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeCue {
    /// Quoted phrases and the payload after `with` or a colon.
    pub targets: Vec<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cues {
    pub table_of_contents: bool,
    pub breadcrumb: bool,
    pub divider: Option<DividerPlacement>,
    /// Concatenated text of every table clause.
    pub table: Option<String>,
    pub headings: Vec<HeadingCue>,
    pub callouts: Vec<CalloutCue>,
    pub toggles: Vec<String>,
    pub media: Vec<MediaCue>,
    pub code: Vec<CodeCue>,
}

pub fn split_clauses(instructions: &str) -> Vec<Clause> {
    CLAUSE_SPLIT_RE
        .split(instructions)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|text| Clause {
            text: text.to_string(),
            lower: text.to_lowercase(),
            quoted: quoted_phrases(text),
        })
        .collect()
}

fn quoted_phrases(text: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(text)
        .filter_map(|c| c.iter().skip(1).flatten().next().map(|m| m.as_str().trim().to_string()))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Text after `with` or a colon, e.g. `Code block with print(1)`.
fn code_payload(text: &str) -> Option<String> {
    CODE_PAYLOAD_RE
        .captures(text)
        .and_then(|c| c.iter().skip(1).flatten().next().map(|m| m.as_str().trim().to_string()))
        .filter(|p| !p.is_empty())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn has_word(haystack: &str, word: &str) -> bool {
    haystack.split(|c: char| !c.is_alphanumeric()).any(|w| w == word)
}

/// `표` as a standalone noun, not as part of `목표`, `발표`, `표시` …
fn mentions_pyo(lower: &str) -> bool {
    const PARTICLES: &[char] = &['를', '로', '을', '가', '는', '에', '와', '도', '의'];
    let chars: Vec<char> = lower.chars().collect();
    chars.iter().enumerate().any(|(i, c)| {
        if *c != '표' {
            return false;
        }
        let prev_ok = i == 0 || !is_hangul(chars[i - 1]);
        let next_ok = chars
            .get(i + 1)
            .map_or(true, |n| !is_hangul(*n) || PARTICLES.contains(n));
        prev_ok && next_ok
    })
}

fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

fn is_table_clause(lower: &str) -> bool {
    let without_toc = lower.replace("table of contents", "");
    without_toc.contains("table")
        || lower.contains("테이블")
        || mentions_pyo(lower)
        || has_dimension_phrase(lower)
}

fn heading_level(lower: &str) -> u8 {
    if let Some(caps) = HEADING_LEVEL_RE.captures(lower) {
        if let Some(level) = caps.iter().skip(1).flatten().next() {
            return level.as_str().parse().unwrap_or(1);
        }
    }
    if contains_any(lower, &["소제목", "subheading", "subtitle", "sub-heading"]) {
        2
    } else {
        1
    }
}

fn is_heading_clause(lower: &str) -> bool {
    HEADING_LEVEL_RE.is_match(lower)
        || contains_any(lower, &["heading", "제목", "title", "헤딩"])
}

fn note_emoji(text: &str) -> Option<String> {
    NOTE_EMOJIS
        .iter()
        .find(|e| text.contains(**e))
        .map(|e| e.to_string())
}

impl Cues {
    pub fn parse(block_instructions: &str) -> Self {
        let mut cues = Cues::default();
        let mut table_text: Vec<String> = Vec::new();

        for clause in split_clauses(block_instructions) {
            let lower = clause.lower.as_str();

            if contains_any(lower, &["table of contents", "목차"]) || has_word(lower, "toc") {
                cues.table_of_contents = true;
            }
            if contains_any(lower, &["breadcrumb", "브레드크럼", "빵부스러기"]) {
                cues.breadcrumb = true;
            }
            if contains_any(lower, &["divider", "구분선", "separator", "horizontal rule"]) {
                let placement = if contains_any(lower, &["중간중간", "사이", "between", "each section"]) {
                    DividerPlacement::BetweenSections
                } else {
                    DividerPlacement::Append
                };
                cues.divider = match (cues.divider, placement) {
                    (Some(DividerPlacement::BetweenSections), _) => Some(DividerPlacement::BetweenSections),
                    (_, p) => Some(p),
                };
            }
            if is_table_clause(lower) {
                table_text.push(clause.text.clone());
            }
            if contains_any(lower, &["callout", "콜아웃", "강조 박스", "강조박스"]) {
                cues.callouts.push(CalloutCue {
                    phrases: clause.quoted.clone(),
                    icon: note_emoji(&clause.text),
                });
            }
            if contains_any(lower, &["toggle", "토글", "펼치기", "접기"]) {
                cues.toggles.extend(clause.quoted.iter().cloned());
            }
            if is_heading_clause(lower) && !contains_any(lower, &["table of contents", "목차"]) {
                let level = heading_level(lower);
                let mut phrases = clause.quoted.clone();
                if phrases.is_empty() {
                    if let Some(caps) = LABELLED_HEADING_RE.captures(&clause.text) {
                        phrases.push(caps[1].trim().to_string());
                    }
                }
                cues.headings.extend(phrases.into_iter().map(|phrase| HeadingCue { phrase, level }));
            }

            let urls = find_urls(&clause.text);
            if !urls.is_empty() {
                if let Some(kind) = kind_from_words(&strip_urls(&clause.text, &urls)) {
                    let mut needles = urls.clone();
                    needles.extend(urls.iter().filter_map(|u| short_host(u)));
                    cues.media.push(MediaCue { needles, kind });
                }
            }

            // A quoted title such as 'Code Examples' does not ask for a code block.
            let unquoted = QUOTED_RE.replace_all(lower, " ");
            if contains_any(&unquoted, &["code", "코드"]) {
                let mut targets = clause.quoted.clone();
                targets.extend(code_payload(&clause.text));
                cues.code.push(CodeCue {
                    targets,
                    language: language_in(&unquoted),
                });
            }
        }

        if !table_text.is_empty() {
            cues.table = Some(table_text.join(" "));
        }
        cues
    }

    pub fn heading_level_for(&self, text: &str) -> Option<u8> {
        let text = text.trim().to_lowercase();
        self.headings
            .iter()
            .find(|h| h.phrase.trim().trim_matches(['\'', '"']).to_lowercase() == text)
            .map(|h| h.level)
    }

    /// Callout icon when a callout clause quotes a phrase present in `text`.
    pub fn callout_for(&self, text: &str) -> Option<Option<String>> {
        self.callouts
            .iter()
            .find(|c| c.phrases.iter().any(|p| text.contains(p.as_str())))
            .map(|c| c.icon.clone())
    }

    pub fn is_toggle(&self, text: &str) -> bool {
        self.toggles.iter().any(|p| text.contains(p.as_str()))
    }

    /// Media kind requested for `url` by an instruction clause.
    pub fn media_kind_for(&self, url: &str) -> Option<MediaKind> {
        let host = short_host(url);
        self.media
            .iter()
            .find(|cue| {
                cue.needles.iter().any(|n| {
                    n == url || url.starts_with(n.trim_end_matches("...").trim_end_matches('…'))
                        || host.as_deref() == Some(n.as_str())
                })
            })
            .map(|cue| cue.kind)
    }

    /// Language of a code clause whose quoted phrase or payload contains `text`.
    pub fn code_for(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.chars().count() < 4 {
            return None;
        }
        self.code
            .iter()
            .find(|c| c.targets.iter().any(|t| t.contains(text)))
            .map(|c| c.language.clone().unwrap_or_else(|| "plain text".to_string()))
    }

    /// Language named by any code clause, used for fences without an info string.
    pub fn default_code_language(&self) -> Option<String> {
        self.code.iter().find_map(|c| c.language.clone())
    }
}

fn strip_urls(text: &str, urls: &[String]) -> String {
    urls.iter().fold(text.to_string(), |acc, u| acc.replace(u.as_str(), " "))
}

fn language_in(lower: &str) -> Option<String> {
    lower
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|w| !w.is_empty() && *w != "code" && *w != "block")
        .find_map(|w| {
            let language = normalize_language(w);
            (language != "plain text").then(|| language.to_string())
        })
}
