pub mod annotate;
pub mod diagnostic; // Per-run artifact dump (PAGESMITH_DUMP_DIR)
pub mod oracle;
pub mod orchestrator;
pub mod sanitize;
pub mod splitter;
pub mod store;
pub mod synthesize;
pub mod types;

pub use orchestrator::{ContentPipeline, PipelineOutcome, PipelineRequest, Stage};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation shared between the HTTP layer and a run.
/// Checked between stages and between per-block appends.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
