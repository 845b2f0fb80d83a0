//! Stage 1: split a raw request into structural intent, stylistic intent
//! and literal content.

pub mod prompt;

use thiserror::Error;

use super::oracle::{extract_json, strip_code_fences, OracleError, SharedOracle};
use super::sanitize::sanitize_request;
use super::types::InstructionTriple;
use prompt::{build_prompt, CONTENT_PROMPT, PARTITION_PROMPT};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("Request is empty")]
    EmptyRequest,

    #[error("Oracle failed during instruction split: {0}")]
    Oracle(#[from] OracleError),

    #[error("Malformed instruction split: {0}")]
    MalformedResponse(String),
}

/// Sampling temperature for the content-generation call.
pub const DEFAULT_CONTENT_TEMPERATURE: f32 = 0.3;

pub struct InstructionSplitter {
    oracle: SharedOracle,
    content_temperature: f32,
}

impl InstructionSplitter {
    pub fn new(oracle: SharedOracle) -> Self {
        Self {
            oracle,
            content_temperature: DEFAULT_CONTENT_TEMPERATURE,
        }
    }

    pub fn with_content_temperature(mut self, temperature: f32) -> Self {
        self.content_temperature = temperature;
        self
    }

    /// Produce the instruction triple for one request.
    ///
    /// The partition call is mandatory. The content call degrades to an
    /// empty `result_text` when the oracle fails.
    pub fn split(&self, raw_request: &str) -> Result<InstructionTriple, SplitError> {
        if raw_request.trim().is_empty() {
            return Err(SplitError::EmptyRequest);
        }
        let request = sanitize_request(raw_request);
        if request.is_empty() {
            return Err(SplitError::EmptyRequest);
        }

        let raw_partition = self.oracle.invoke(&build_prompt(PARTITION_PROMPT, &request))?;
        let (block_instructions, format_instructions) = parse_partition(&raw_partition)?;

        let content_prompt = build_prompt(CONTENT_PROMPT, &request);
        let result_text = match self.oracle.invoke_at(&content_prompt, self.content_temperature) {
            Ok(text) => strip_code_fences(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Content extraction failed, continuing with empty text");
                String::new()
            }
        };

        tracing::debug!(
            block_len = block_instructions.len(),
            format_len = format_instructions.len(),
            text_len = result_text.len(),
            "Instruction split complete"
        );

        Ok(InstructionTriple {
            block_instructions,
            format_instructions,
            result_text,
        })
    }
}

/// Validate the partition response: a JSON object with two string fields.
fn parse_partition(raw: &str) -> Result<(String, String), SplitError> {
    let value = extract_json(raw).map_err(|e| SplitError::MalformedResponse(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| SplitError::MalformedResponse("expected a JSON object".into()))?;

    let field = |key: &str| -> Result<String, SplitError> {
        match object.get(key) {
            Some(serde_json::Value::String(s)) => Ok(s.trim().to_string()),
            Some(_) => Err(SplitError::MalformedResponse(format!("`{key}` is not a string"))),
            None => Err(SplitError::MalformedResponse(format!("missing `{key}`"))),
        }
    };

    Ok((field("block_instructions")?, field("format_instructions")?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::oracle::MockOracle;

    fn splitter(mock: Arc<MockOracle>) -> InstructionSplitter {
        InstructionSplitter::new(mock)
    }

    #[test]
    fn splits_request_into_triple() {
        let mock = Arc::new(MockOracle::with_responses([
            r#"{"block_instructions": "Heading 1: '안녕하세요'", "format_instructions": "'안녕하세요'를 굵게"}"#,
            "안녕하세요",
        ]));
        let triple = splitter(mock.clone())
            .split("제목은 '안녕하세요'로 하고 굵게 해주세요")
            .unwrap();
        assert_eq!(triple.block_instructions, "Heading 1: '안녕하세요'");
        assert_eq!(triple.format_instructions, "'안녕하세요'를 굵게");
        assert_eq!(triple.result_text, "안녕하세요");

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("<request>"));
        assert!(prompts[1].starts_with(CONTENT_PROMPT));
        assert_eq!(mock.temperatures(), vec![None, Some(DEFAULT_CONTENT_TEMPERATURE)]);
    }

    #[test]
    fn empty_request_is_rejected_without_oracle_call() {
        let mock = Arc::new(MockOracle::new());
        assert_eq!(splitter(mock.clone()).split("   \n"), Err(SplitError::EmptyRequest));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn fenced_partition_is_accepted() {
        let mock = Arc::new(MockOracle::with_responses([
            "```json\n{\"block_instructions\": \"Add Divider\", \"format_instructions\": \"\"}\n```",
            "```\nbody text\n```",
        ]));
        let triple = splitter(mock).split("구분선").unwrap();
        assert_eq!(triple.block_instructions, "Add Divider");
        assert_eq!(triple.format_instructions, "");
        assert_eq!(triple.result_text, "body text");
    }

    #[test]
    fn content_starting_with_code_block_is_unchanged() {
        let content = "```html\n<h1>안녕</h1>\n```\n\nHTML은 구조를 만듭니다.";
        let response = format!("\n{content}\n");
        let mock = Arc::new(MockOracle::with_responses([
            r#"{"block_instructions": "Add Code block (html)", "format_instructions": ""}"#,
            response.as_str(),
        ]));
        let triple = splitter(mock).split("HTML 예제를 코드 블록으로").unwrap();
        assert_eq!(triple.result_text, content);
    }

    #[test]
    fn missing_key_is_malformed() {
        let mock = Arc::new(MockOracle::with_responses([r#"{"block_instructions": "x"}"#]));
        let err = splitter(mock).split("hello").unwrap_err();
        assert!(matches!(err, SplitError::MalformedResponse(m) if m.contains("format_instructions")));
    }

    #[test]
    fn non_string_value_is_malformed() {
        let mock = Arc::new(MockOracle::with_responses([
            r#"{"block_instructions": ["a"], "format_instructions": ""}"#,
        ]));
        assert!(matches!(
            splitter(mock).split("hello"),
            Err(SplitError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unparsable_partition_is_malformed() {
        let mock = Arc::new(MockOracle::with_responses(["I cannot help with that."]));
        assert!(matches!(
            splitter(mock).split("hello"),
            Err(SplitError::MalformedResponse(_))
        ));
    }

    #[test]
    fn partition_oracle_failure_propagates() {
        let mock = Arc::new(MockOracle::new());
        mock.push_error(OracleError::Timeout { secs: 5 });
        assert_eq!(
            splitter(mock).split("hello"),
            Err(SplitError::Oracle(OracleError::Timeout { secs: 5 }))
        );
    }

    #[test]
    fn content_failure_degrades_to_empty_text() {
        let mock = Arc::new(MockOracle::with_responses([
            r#"{"block_instructions": "Add Divider", "format_instructions": ""}"#,
        ]));
        mock.push_error(OracleError::EmptyResponse);
        let triple = splitter(mock).split("구분선 넣어줘").unwrap();
        assert_eq!(triple.result_text, "");
        assert_eq!(triple.block_instructions, "Add Divider");
    }
}
