/// Partition prompt: asks for the structural and stylistic halves of a request.
pub const PARTITION_PROMPT: &str = r#"You separate a document-writing request into two independent kinds of instruction.

BLOCK_INSTRUCTIONS describe structure only:
- headings (Heading 1/2/3, 제목, 소제목), paragraphs, bulleted or numbered lists, to-dos
- quotes, callouts, toggles, code blocks (with language), equations
- images, videos, embeds, bookmarks and links, always with the exact URL
- dividers (구분선), table of contents (목차), breadcrumbs, tables with their dimensions and column names
- order of sections from top to bottom, quoting the exact text each section holds
Never put colors, bold, italic, underline, strikethrough or inline code here.

FORMAT_INSTRUCTIONS describe styling only:
- bold, italic, underline, strikethrough, inline code
- text colors (red, blue, green, yellow, purple, pink, gray, orange, brown)
- links placed on text, with the link text and target URL
- each rule names the exact phrase it applies to; combined styles are allowed
Never put block types or document structure here.

Answer with this JSON object and nothing else:
{"block_instructions": "...", "format_instructions": "..."}
Use an empty string when a request carries no instruction of that kind.

Example request: 제목은 '안녕하세요'로 하고 console.log('Hello World') 코드를 넣어주세요. 중요한 부분은 빨간색으로 칠해주세요.
Example answer: {"block_instructions": "Heading 1: '안녕하세요'. Code block (javascript): console.log('Hello World').", "format_instructions": "'중요한' 부분을 빨간색으로."}"#;

/// Content prompt: asks for the literal text of the finished document.
pub const CONTENT_PROMPT: &str = r#"Write the literal text that belongs in the finished document for the request below.

Rules:
- Leave out every structural instruction (make a heading, add a divider, create a table).
- Leave out every styling instruction (make it bold, color it red).
- Keep titles, quoted sentences, code, URLs and list items exactly as the request gives them.
- Put each section on its own line, separate sections with a blank line, and start list items with "- " or "1. ".
- When the request asks a question or names a topic, write a complete, accurate answer.
- Replace vague placeholders such as "important points", "key concepts", "main features",
  "중요한 개념들", "핵심 내용", "주요 특징들" with the concrete items they stand for in this context.

Return only the document text, without commentary and without code fences around the whole answer."#;

/// Wrap a sanitized request in delimiter tags after the instruction text.
pub fn build_prompt(instructions: &str, request: &str) -> String {
    format!("{instructions}\n\n<request>\n{request}\n</request>\n")
}
