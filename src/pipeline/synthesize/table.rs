//! Table dimension and header extraction from instruction text.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::Block;

pub const DEFAULT_TABLE_WIDTH: usize = 3;
pub const DEFAULT_TABLE_HEIGHT: usize = 4;
const MAX_TABLE_DIMENSION: usize = 100;
const MAX_LABEL_CHARS: usize = 40;

static ROWS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:rows?\b|행)").expect("valid regex"));
static COLS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:columns?\b|cols?\b|열|개\s*(?:의\s*)?(?:컬럼|칼럼|열))").expect("valid regex")
});
static COLS_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:컬럼|칼럼|열)\s*(\d+)\s*개").expect("valid regex"));
static GRID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[x×X]\s*(\d+)").expect("valid regex"));
static WEEKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*주(?:차|간)?").expect("valid regex"));
static LABELS_AFTER_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:columns?|headers?|컬럼명?|칼럼|열|헤더)\s*[:：]\s*([^.\n]+)").expect("valid regex")
});
static LABELS_IN_PARENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（]([^)）]*[,、][^)）]*)[)）]").expect("valid regex"));
static LABELS_AFTER_PER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"별로?\s+([^.\n]*[,、][^.\n]*)").expect("valid regex"));

/// Resolved table geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub width: usize,
    pub height: usize,
    pub has_column_header: bool,
    pub has_row_header: bool,
    pub column_labels: Vec<String>,
}

impl TableSpec {
    pub fn into_block(self) -> Block {
        Block::Table {
            width: self.width,
            height: self.height,
            has_column_header: self.has_column_header,
            has_row_header: self.has_row_header,
            column_labels: self.column_labels,
        }
    }
}

fn capture_number(re: &Regex, text: &str, group: usize) -> Option<usize> {
    re.captures(text)
        .and_then(|c| c.get(group))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|n| (1..=MAX_TABLE_DIMENSION).contains(n))
}

/// True when the text names explicit rows, columns or a grid size.
pub fn has_dimension_phrase(text: &str) -> bool {
    ROWS_RE.is_match(text) || COLS_RE.is_match(text) || COLS_COUNT_RE.is_match(text) || GRID_RE.is_match(text)
}

/// Derive the table from instruction text. `AxB` reads as rows × columns.
/// The height counts the header row.
pub fn table_spec(text: &str) -> TableSpec {
    let lower = text.to_lowercase();
    let grid = GRID_RE.captures(text).and_then(|c| {
        let rows = c.get(1)?.as_str().parse::<usize>().ok()?;
        let cols = c.get(2)?.as_str().parse::<usize>().ok()?;
        let valid = 1..=MAX_TABLE_DIMENSION;
        (valid.contains(&rows) && valid.contains(&cols)).then_some((rows, cols))
    });

    let rows = capture_number(&ROWS_RE, text, 1).or(grid.map(|g| g.0));
    let cols = capture_number(&COLS_RE, text, 1)
        .or_else(|| capture_number(&COLS_COUNT_RE, text, 1))
        .or(grid.map(|g| g.1));
    let weeks = capture_number(&WEEKS_RE, text, 1);

    let column_labels = extract_labels(text);
    let no_header = ["no header", "without header", "헤더 없이", "헤더없이"]
        .iter()
        .any(|w| lower.contains(w));
    let has_row_header = ["row header", "행 헤더", "행헤더", "row headers"]
        .iter()
        .any(|w| lower.contains(w));
    let header_words = ["header", "헤더", "컬럼명", "칼럼명", "column name", "제목 행", "머리글"]
        .iter()
        .any(|w| lower.replace("row header", "").replace("행 헤더", "").contains(w));
    let has_column_header = !no_header && (header_words || !column_labels.is_empty());

    let width = cols
        .or((!column_labels.is_empty()).then_some(column_labels.len()))
        .unwrap_or(DEFAULT_TABLE_WIDTH);
    let height = match (rows, weeks) {
        (Some(rows), _) => rows,
        (None, Some(weeks)) => weeks + usize::from(has_column_header),
        (None, None) => DEFAULT_TABLE_HEIGHT,
    };

    let mut column_labels = column_labels;
    column_labels.truncate(width);

    TableSpec {
        width,
        height,
        has_column_header,
        has_row_header,
        column_labels,
    }
}

fn extract_labels(text: &str) -> Vec<String> {
    let raw = LABELS_AFTER_KEY_RE
        .captures(text)
        .or_else(|| LABELS_IN_PARENS_RE.captures(text))
        .or_else(|| LABELS_AFTER_PER_RE.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let Some(raw) = raw else {
        return Vec::new();
    };

    let parts: Vec<&str> = raw.split([',', '、', '|', '/']).collect();
    let last = parts.len().saturating_sub(1);
    parts
        .iter()
        .enumerate()
        .filter_map(|(i, part)| {
            let mut label = part.trim();
            // The list often runs into the rest of the sentence ("완료여부를 포함한 표").
            if i == last {
                label = label.split_whitespace().next().unwrap_or("");
            }
            let label = strip_particle(label.trim_matches(|c: char| "'\"‘’“”`".contains(c)));
            let count = label.chars().count();
            (count > 0 && count <= MAX_LABEL_CHARS && !has_dimension_phrase(label)).then(|| label.to_string())
        })
        .collect()
}

fn strip_particle(label: &str) -> &str {
    for particle in ["으로", "를", "을", "로", "와", "과", "가", "이", "는", "은"] {
        if let Some(stripped) = label.strip_suffix(particle) {
            if stripped.chars().count() >= 2 {
                return stripped;
            }
        }
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_and_columns_in_english() {
        let spec = table_spec("Add a table with 4 rows, 3 columns");
        assert_eq!((spec.width, spec.height), (3, 4));
        assert!(!spec.has_column_header);
        assert!(spec.column_labels.is_empty());
    }

    #[test]
    fn header_cue_sets_column_header() {
        let spec = table_spec("Table: 4 rows, 3 columns with a header row");
        assert_eq!((spec.width, spec.height), (3, 4));
        assert!(spec.has_column_header);
        assert!(!spec.has_row_header);
    }

    #[test]
    fn korean_rows_and_columns() {
        let spec = table_spec("4행 3열 표를 만들어줘");
        assert_eq!((spec.width, spec.height), (3, 4));
    }

    #[test]
    fn grid_reads_rows_by_columns() {
        let spec = table_spec("5x2 테이블");
        assert_eq!((spec.width, spec.height), (2, 5));
    }

    #[test]
    fn column_count_phrase() {
        let spec = table_spec("컬럼 3개짜리 표");
        assert_eq!(spec.width, 3);
        assert_eq!(spec.height, DEFAULT_TABLE_HEIGHT);
    }

    #[test]
    fn weekly_plan_with_labels() {
        let spec = table_spec("4주 학습 계획 표, 주차별로 목표, 내용, 완료여부를 넣어줘");
        assert_eq!(spec.column_labels, vec!["목표", "내용", "완료여부"]);
        assert_eq!(spec.width, 3);
        assert!(spec.has_column_header);
        assert_eq!(spec.height, 5);
    }

    #[test]
    fn labels_after_key_and_in_parens() {
        let spec = table_spec("Table columns: Name, Role, Email");
        assert_eq!(spec.column_labels, vec!["Name", "Role", "Email"]);
        assert_eq!(spec.width, 3);

        let spec = table_spec("3 rows, 2 columns (Week, Goal)");
        assert_eq!(spec.column_labels, vec!["Week", "Goal"]);
        assert_eq!((spec.width, spec.height), (2, 3));
        assert!(spec.has_column_header);
    }

    #[test]
    fn defaults_without_dimensions() {
        let spec = table_spec("표를 하나 넣어줘");
        assert_eq!((spec.width, spec.height), (DEFAULT_TABLE_WIDTH, DEFAULT_TABLE_HEIGHT));
    }

    #[test]
    fn row_header_cue() {
        let spec = table_spec("2 rows, 2 columns, row header");
        assert!(spec.has_row_header);
        assert!(!spec.has_column_header);
    }

    #[test]
    fn dimension_phrase_detection() {
        assert!(has_dimension_phrase("4 rows, 3 columns"));
        assert!(has_dimension_phrase("4행 3열"));
        assert!(has_dimension_phrase("3x4"));
        assert!(!has_dimension_phrase("4주 학습 계획"));
        assert!(!has_dimension_phrase("Rows of text"));
    }
}
