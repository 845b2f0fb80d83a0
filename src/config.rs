use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Pagesmith";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when neither `PAGESMITH_LOG` nor `RUST_LOG` is set.
pub fn default_log_filter() -> String {
    "pagesmith=info,tower_http=warn".to_string()
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which oracle backend serves the natural-language stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleProvider {
    OpenAi,
    Ollama,
    /// Offline provider with no scripted answers; every call fails.
    Mock,
}

/// How the store adapter ships a run's blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendMode {
    /// One remote call carrying every block, all-or-nothing.
    #[default]
    Batch,
    /// One remote call per block, stopping at the first rejection.
    PerBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Used for partition and styling calls.
    pub temperature: f32,
    /// Used for the content-generation call.
    pub content_temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// `None` disables stage 4; runs stop after block synthesis.
    pub api_key: Option<String>,
    pub base_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub append_mode: AppendMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub oracle: OracleConfig,
    pub store: StoreConfig,
    pub pipeline_timeout_secs: u64,
    pub dump_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = match get("PAGESMITH_HOST") {
            Some(raw) => raw.parse::<IpAddr>().map_err(|e| ConfigError::InvalidValue {
                key: "PAGESMITH_HOST",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let port = parse_number(get("PAGESMITH_PORT"), "PAGESMITH_PORT", 8000u16)?;

        let provider = match get("PAGESMITH_ORACLE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("openai") => OracleProvider::OpenAi,
            Some("ollama") => OracleProvider::Ollama,
            Some("mock") => OracleProvider::Mock,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "PAGESMITH_ORACLE",
                    value: other.to_string(),
                    reason: "expected openai, ollama or mock".into(),
                })
            }
        };
        let oracle_timeout = parse_number(
            get("PAGESMITH_ORACLE_TIMEOUT_SECS"),
            "PAGESMITH_ORACLE_TIMEOUT_SECS",
            120u64,
        )?;
        let temperature = parse_temperature(get("PAGESMITH_TEMPERATURE"), "PAGESMITH_TEMPERATURE", 0.0)?;
        let content_temperature = parse_temperature(
            get("PAGESMITH_CONTENT_TEMPERATURE"),
            "PAGESMITH_CONTENT_TEMPERATURE",
            0.3,
        )?;
        let oracle = match provider {
            OracleProvider::OpenAi => OracleConfig {
                provider,
                api_key: get("OPENAI_API_KEY"),
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: get("PAGESMITH_OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
                temperature,
                content_temperature,
                timeout_secs: oracle_timeout,
            },
            OracleProvider::Ollama => OracleConfig {
                provider,
                api_key: None,
                base_url: get("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                model: get("PAGESMITH_OLLAMA_MODEL").unwrap_or_else(|| "llama3.1:8b".to_string()),
                temperature,
                content_temperature,
                timeout_secs: oracle_timeout,
            },
            OracleProvider::Mock => OracleConfig {
                provider,
                api_key: None,
                base_url: String::new(),
                model: "mock".to_string(),
                temperature,
                content_temperature,
                timeout_secs: oracle_timeout,
            },
        };

        let append_mode = match get("PAGESMITH_APPEND_MODE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("batch") => AppendMode::Batch,
            Some("per_block") | Some("per-block") => AppendMode::PerBlock,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "PAGESMITH_APPEND_MODE",
                    value: other.to_string(),
                    reason: "expected batch or per_block".into(),
                })
            }
        };
        let store = StoreConfig {
            api_key: get("NOTION_API_KEY"),
            base_url: get("NOTION_BASE_URL").unwrap_or_else(|| "https://api.notion.com/v1".to_string()),
            api_version: get("NOTION_VERSION").unwrap_or_else(|| "2022-06-28".to_string()),
            timeout_secs: parse_number(
                get("PAGESMITH_STORE_TIMEOUT_SECS"),
                "PAGESMITH_STORE_TIMEOUT_SECS",
                60u64,
            )?,
            append_mode,
        };

        Ok(Self {
            host,
            port,
            oracle,
            store,
            pipeline_timeout_secs: parse_number(
                get("PAGESMITH_PIPELINE_TIMEOUT_SECS"),
                "PAGESMITH_PIPELINE_TIMEOUT_SECS",
                300u64,
            )?,
            dump_dir: get("PAGESMITH_DUMP_DIR").map(PathBuf::from),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_number<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_temperature(raw: Option<String>, key: &'static str, default: f32) -> Result<f32, ConfigError> {
    let value = parse_number(raw, key, default)?;
    if !(0.0..=2.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected a temperature between 0 and 2".into(),
        });
    }
    Ok(value)
}
