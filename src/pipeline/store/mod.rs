//! Block Store Adapter: encodes blocks and appends them to a document.
//!
//! The remote side is hidden behind `DocumentStore`; `NotionStore` speaks the
//! Notion REST API and `MemoryStore` backs tests.

pub mod encode;
pub mod memory;
pub mod notion;

pub use encode::{encode_block, encode_blocks, encode_rich_text};
pub use memory::MemoryStore;
pub use notion::NotionStore;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::{AppendMode, StoreConfig};
use crate::pipeline::types::{Block, BlockId};
use crate::pipeline::CancelFlag;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Document store is not reachable at {0}")]
    Connection(String),

    #[error("Document store request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Document store returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Invalid document id: {0:?}")]
    InvalidDocumentId(String),

    #[error("Document store rejected the blocks: {0}")]
    Rejected(String),

    #[error("Run cancelled before all blocks were appended")]
    Cancelled,

    #[error("Document store not configured: {0}")]
    NotConfigured(String),
}

/// Failure of an append call, with what was committed before it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("appended {appended} of {requested} blocks: {source}")]
pub struct AppendError {
    pub requested: usize,
    pub appended: usize,
    pub block_ids: Vec<BlockId>,
    #[source]
    pub source: StoreError,
}

impl AppendError {
    fn before_any_call(requested: usize, source: StoreError) -> Self {
        Self {
            requested,
            appended: 0,
            block_ids: Vec::new(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppendSummary {
    pub requested: usize,
    pub appended: usize,
    pub block_ids: Vec<BlockId>,
}

/// Remote document that accepts children blocks in external encoding.
pub trait DocumentStore {
    /// Append `children` after the document's last block; all or nothing.
    fn append_children(&self, document_id: &str, children: &[Value]) -> Result<Vec<BlockId>, StoreError>;

    fn name(&self) -> &str;
}

pub type SharedStore = Arc<dyn DocumentStore + Send + Sync>;

/// Build the Notion store when an API key is configured.
///
/// Must run outside the async runtime: the client is blocking.
pub fn build_store(config: &StoreConfig) -> Result<Option<SharedStore>, StoreError> {
    let Some(key) = config.api_key.as_deref() else {
        tracing::info!("No NOTION_API_KEY set, append stage disabled");
        return Ok(None);
    };
    let store = NotionStore::new(&config.base_url, key, &config.api_version, config.timeout_secs)?;
    tracing::info!(store = store.name(), version = %config.api_version, "Document store configured");
    Ok(Some(Arc::new(store)))
}

pub struct BlockStoreAdapter {
    store: SharedStore,
    mode: AppendMode,
}

impl BlockStoreAdapter {
    pub fn new(store: SharedStore, mode: AppendMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> AppendMode {
        self.mode
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Append a single block.
    pub fn append(&self, document_id: &str, block: &Block) -> Result<BlockId, AppendError> {
        let document_id = checked_document_id(document_id).map_err(|e| AppendError::before_any_call(1, e))?;
        let payload = [encode_block(block)];
        let mut ids = self
            .store
            .append_children(document_id, &payload)
            .map_err(|e| AppendError::before_any_call(1, e))?;
        if ids.is_empty() {
            return Err(AppendError::before_any_call(
                1,
                StoreError::ResponseParsing("store returned no block id".into()),
            ));
        }
        Ok(ids.swap_remove(0))
    }

    /// Append every block in caller order, according to the configured mode.
    pub fn append_all(
        &self,
        document_id: &str,
        blocks: &[Block],
        cancel: &CancelFlag,
    ) -> Result<AppendSummary, AppendError> {
        let requested = blocks.len();
        let document_id =
            checked_document_id(document_id).map_err(|e| AppendError::before_any_call(requested, e))?;
        if requested == 0 {
            return Ok(AppendSummary {
                requested,
                appended: 0,
                block_ids: Vec::new(),
            });
        }

        match self.mode {
            AppendMode::Batch => {
                if cancel.is_cancelled() {
                    return Err(AppendError::before_any_call(requested, StoreError::Cancelled));
                }
                let payload = encode_blocks(blocks);
                let block_ids = self
                    .store
                    .append_children(document_id, &payload)
                    .map_err(|e| AppendError::before_any_call(requested, e))?;
                tracing::info!(requested, appended = block_ids.len(), mode = "batch", "Blocks appended");
                Ok(AppendSummary {
                    requested,
                    appended: block_ids.len(),
                    block_ids,
                })
            }
            AppendMode::PerBlock => {
                let failure = |source: StoreError, block_ids: Vec<BlockId>| AppendError {
                    requested,
                    appended: block_ids.len(),
                    block_ids,
                    source,
                };
                let mut block_ids = Vec::with_capacity(requested);
                for (index, block) in blocks.iter().enumerate() {
                    if cancel.is_cancelled() {
                        return Err(failure(StoreError::Cancelled, block_ids));
                    }
                    match self.store.append_children(document_id, &[encode_block(block)]) {
                        Ok(ids) => block_ids.extend(ids),
                        Err(e) => {
                            tracing::warn!(index, kind = block.kind_name(), error = %e, "Block append failed");
                            return Err(failure(e, block_ids));
                        }
                    }
                }
                tracing::info!(requested, appended = block_ids.len(), mode = "per_block", "Blocks appended");
                Ok(AppendSummary {
                    requested,
                    appended: block_ids.len(),
                    block_ids,
                })
            }
        }
    }
}

fn checked_document_id(document_id: &str) -> Result<&str, StoreError> {
    let trimmed = document_id.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidDocumentId(document_id.to_string()));
    }
    Ok(trimmed)
}
