//! Natural-language oracle capability.
//!
//! Stages 1 and 2 talk to a language model through the `Oracle` trait only.
//! Concrete HTTP adapters live next to the trait together with a scripted
//! mock used by tests and offline runs.

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod response;

pub use mock::MockOracle;
pub use ollama::OllamaOracle;
pub use openai::OpenAiOracle;
pub use response::{extract_json, strip_code_fences};

use std::sync::Arc;

use thiserror::Error;

use crate::config::{OracleConfig, OracleProvider};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Oracle is not reachable at {0}")]
    Connection(String),

    #[error("Oracle request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Oracle returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Oracle returned an empty response")]
    EmptyResponse,

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),
}

/// "Given a prompt, return freeform text." Fallible and non-deterministic.
pub trait Oracle {
    /// Sample at the provider's configured temperature.
    fn invoke(&self, prompt: &str) -> Result<String, OracleError>;

    /// Sample at an explicit temperature.
    fn invoke_at(&self, prompt: &str, temperature: f32) -> Result<String, OracleError>;

    /// Short provider label for logs and the health endpoint.
    fn name(&self) -> &str;
}

pub type SharedOracle = Arc<dyn Oracle + Send + Sync>;

/// Build the oracle selected by configuration.
///
/// Must run outside the async runtime: the HTTP adapters own blocking clients.
pub fn build_oracle(config: &OracleConfig) -> Result<SharedOracle, OracleError> {
    let oracle: SharedOracle = match config.provider {
        OracleProvider::OpenAi => {
            let key = config.api_key.clone().ok_or_else(|| {
                OracleError::NotConfigured("OPENAI_API_KEY is not set".into())
            })?;
            Arc::new(OpenAiOracle::new(
                &config.base_url,
                &key,
                &config.model,
                config.temperature,
                config.timeout_secs,
            )?)
        }
        OracleProvider::Ollama => Arc::new(OllamaOracle::new(
            &config.base_url,
            &config.model,
            config.temperature,
            config.timeout_secs,
        )?),
        OracleProvider::Mock => Arc::new(MockOracle::new()),
    };
    tracing::info!(oracle = oracle.name(), model = %config.model, "Oracle configured");
    Ok(oracle)
}

/// Translate a transport error into the oracle taxonomy.
pub(crate) fn map_transport_error(err: reqwest::Error, base_url: &str, timeout_secs: u64) -> OracleError {
    if err.is_timeout() {
        OracleError::Timeout { secs: timeout_secs }
    } else if err.is_connect() {
        OracleError::Connection(base_url.to_string())
    } else {
        OracleError::HttpClient(err.to_string())
    }
}
