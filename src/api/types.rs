//! Shared state and request bodies for the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::AppConfig;
use crate::pipeline::types::{Block, Segment};
use crate::pipeline::{CancelFlag, ContentPipeline};

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<ContentPipeline>,
    pub config: Arc<AppConfig>,
}

impl ApiContext {
    pub fn new(pipeline: Arc<ContentPipeline>, config: Arc<AppConfig>) -> Self {
        Self { pipeline, config }
    }

    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.config.pipeline_timeout_secs)
    }
}

/// Raises the run's cancel flag when the handler future is dropped,
/// e.g. because the client disconnected.
pub struct CancelOnDrop(pub CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[derive(Debug, Deserialize)]
pub struct SplitBody {
    pub raw_request: String,
}

#[derive(Debug, Deserialize)]
pub struct AnnotateBody {
    #[serde(default)]
    pub format_instructions: String,
    pub result_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeBody {
    #[serde(default)]
    pub block_instructions: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
pub struct EncodeBody {
    pub blocks: Vec<Block>,
}
