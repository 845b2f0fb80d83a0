use serde::{Deserialize, Serialize};

use super::{map_transport_error, Oracle, OracleError};

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct OpenAiOracle {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiOracle {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OracleError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            client,
            timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_choice_content(response: ChatResponse) -> Result<String, OracleError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(OracleError::EmptyResponse)?;
    if content.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    Ok(content)
}

impl Oracle for OpenAiOracle {
    fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        self.invoke_at(prompt, self.temperature)
    }

    fn invoke_at(&self, prompt: &str, temperature: f32) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| map_transport_error(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;
        first_choice_content(parsed)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_base_url() {
        let oracle = OpenAiOracle::new("https://api.openai.com/v1/", "sk-test", "gpt-4o", 0.0, 30).unwrap();
        assert_eq!(oracle.base_url, "https://api.openai.com/v1");
        assert_eq!(oracle.model, "gpt-4o");
    }

    #[test]
    fn extracts_first_choice() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "안녕하세요"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_content(parsed).unwrap(), "안녕하세요");
    }

    #[test]
    fn missing_or_blank_content_is_empty_response() {
        let none: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(first_choice_content(none), Err(OracleError::EmptyResponse));

        let blank: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "  "}}]}"#).unwrap();
        assert_eq!(first_choice_content(blank), Err(OracleError::EmptyResponse));

        let null: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(first_choice_content(null), Err(OracleError::EmptyResponse));
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
