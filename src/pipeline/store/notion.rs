use serde::Deserialize;
use serde_json::{json, Value};

use super::{DocumentStore, StoreError};
use crate::pipeline::types::BlockId;

/// Notion REST client for `PATCH /blocks/{id}/children`.
pub struct NotionStore {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl NotionStore {
    pub fn new(base_url: &str, api_key: &str, api_version: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let bearer = reqwest::header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| StoreError::NotConfigured("NOTION_API_KEY contains invalid characters".into()))?;
        let version = reqwest::header::HeaderValue::from_str(api_version)
            .map_err(|_| StoreError::NotConfigured(format!("invalid Notion-Version {api_version:?}")))?;
        headers.insert(reqwest::header::AUTHORIZATION, bearer);
        headers.insert("Notion-Version", version);

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout {
                secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            StoreError::Connection(self.base_url.clone())
        } else {
            StoreError::HttpClient(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct AppendResponse {
    results: Vec<CreatedBlock>,
}

#[derive(Deserialize)]
struct CreatedBlock {
    id: String,
}

/// Notion error payload: `{"object":"error","status":400,"code":"validation_error","message":"..."}`.
#[derive(Deserialize)]
struct NotionError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Turn a non-success response into a store error. 400 validation failures
/// mean the blocks themselves were refused.
fn error_from_response(status: u16, body: String) -> StoreError {
    match serde_json::from_str::<NotionError>(&body) {
        Ok(err) if status == 400 && err.code == "validation_error" => StoreError::Rejected(err.message),
        Ok(err) if !err.message.is_empty() => StoreError::Status {
            status,
            body: format!("{}: {}", err.code, err.message),
        },
        _ => StoreError::Status { status, body },
    }
}

fn parse_ids(body: &str) -> Result<Vec<BlockId>, StoreError> {
    let parsed: AppendResponse =
        serde_json::from_str(body).map_err(|e| StoreError::ResponseParsing(e.to_string()))?;
    Ok(parsed.results.into_iter().map(|b| BlockId(b.id)).collect())
}

impl DocumentStore for NotionStore {
    fn append_children(&self, document_id: &str, children: &[Value]) -> Result<Vec<BlockId>, StoreError> {
        let url = format!("{}/blocks/{}/children", self.base_url, document_id);
        let response = self
            .client
            .patch(&url)
            .json(&json!({ "children": children }))
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.map_transport_error(e))?;
        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), body));
        }
        let ids = parse_ids(&body)?;
        tracing::debug!(requested = children.len(), created = ids.len(), "Notion append response");
        Ok(ids)
    }

    fn name(&self) -> &str {
        "notion"
    }
}
