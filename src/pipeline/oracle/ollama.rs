use serde::{Deserialize, Serialize};

use super::{map_transport_error, Oracle, OracleError};

/// Ollama HTTP client for local inference.
pub struct OllamaOracle {
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaOracle {
    pub fn new(base_url: &str, model: &str, temperature: f32, timeout_secs: u64) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OracleError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            client,
            timeout_secs,
        })
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl Oracle for OllamaOracle {
    fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        self.invoke_at(prompt, self.temperature)
    }

    fn invoke_at(&self, prompt: &str, temperature: f32) -> Result<String, OracleError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };

        let response = self
            .client
            .post(&url)
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

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;

        if parsed.response.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let oracle = OllamaOracle::new("http://localhost:11434/", "llama3.1:8b", 0.0, 60).unwrap();
        assert_eq!(oracle.base_url, "http://localhost:11434");
        assert_eq!(oracle.timeout_secs, 60);
    }

    #[test]
    fn request_body_disables_streaming() {
        let body = GenerateRequest {
            model: "llama3.1:8b",
            prompt: "hi",
            stream: false,
            options: GenerateOptions { temperature: 0.3 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(json["model"], "llama3.1:8b");
    }

    #[test]
    fn unreachable_server_maps_to_connection_error() {
        // Port 9 (discard) is not expected to run an HTTP service.
        let oracle = OllamaOracle::new("http://127.0.0.1:9", "m", 0.0, 2).unwrap();
        let err = oracle.invoke("hello").unwrap_err();
        assert!(matches!(
            err,
            OracleError::Connection(_) | OracleError::Timeout { .. } | OracleError::HttpClient(_)
        ));
    }
}
