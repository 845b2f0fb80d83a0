/// System text for the span annotator.
pub const ANNOTATE_PROMPT: &str = r#"You apply styling rules to exact phrases of a text and return rich-text segments.

Style vocabulary:
- 굵게, 볼드, bold → "bold": true
- 기울임, 이탤릭, italic → "italic": true
- 밑줄, underline → "underline": true
- 취소선, strikethrough → "strikethrough": true
- 코드, code → "code": true
- 빨간색/빨강 red, 파란색 blue, 초록색/녹색 green, 노란색 yellow, 보라색 purple,
  분홍색 pink, 회색 gray, 주황색 orange, 갈색 brown → "color": "<english name>"
- a link on a phrase → "link_url": "<absolute url>"

Rules:
1. Apply every rule in the styling instructions; several rules may hit the same phrase.
2. When rules overlap, the overlapping span carries all of their styles combined.
3. Cut the text into consecutive segments. Concatenating every "content" in order must
   reproduce the text exactly, including spaces, punctuation and line breaks.
4. Never add, drop, translate or reorder characters.
5. Table sizes and column lists ("4 rows, 3 columns", "4행 3열", "주차별 목표") stay plain.
6. Unstyled stretches are segments with every flag false and "color": "default".

Answer with a JSON array and nothing else, for example:
[{"content": "Java", "bold": true, "italic": false, "underline": false, "strikethrough": false, "code": false, "color": "red"},
 {"content": " is a language.", "bold": false, "italic": false, "underline": false, "strikethrough": false, "code": false, "color": "default"}]"#;

pub fn build_annotate_prompt(format_instructions: &str, result_text: &str) -> String {
    format!(
        "{ANNOTATE_PROMPT}\n\n<styling>\n{format_instructions}\n</styling>\n\n<text>\n{result_text}\n</text>\n"
    )
}
