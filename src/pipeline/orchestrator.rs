//! Content pipeline orchestrator.
//!
//! Single entry point that drives one request through the stages:
//! split → annotate → synthesize → (append).
//!
//! Every collaborator is injected (oracle, document store), so the whole run
//! is testable with `MockOracle` and `MemoryStore`. `run` never panics and
//! never returns an error: failures become a tagged `PipelineOutcome`.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::annotate::{AnnotateOutcome, SpanAnnotator};
use super::diagnostic::{self, BLOCKS_FILE, ENCODED_FILE, INSTRUCTIONS_FILE, OUTCOME_FILE, SEGMENTS_FILE};
use super::oracle::{build_oracle, OracleError, SharedOracle};
use super::splitter::InstructionSplitter;
use super::store::{build_store, encode_blocks, AppendError, BlockStoreAdapter, StoreError};
use super::synthesize::BlockSynthesizer;
use super::types::{Block, BlockId, InstructionTriple};
use super::CancelFlag;
use crate::config::AppConfig;

#[derive(Error, Debug)]
pub enum PipelineBuildError {
    #[error("Oracle setup failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Document store setup failed: {0}")]
    Store(#[from] StoreError),
}

/// Stage tags reported in a failed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocessing,
    BlockCreation,
    Append,
    Cancelled,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preprocessing => "preprocessing",
            Stage::BlockCreation => "block_creation",
            Stage::Append => "append",
            Stage::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineRequest {
    #[serde(default)]
    pub document_id: Option<String>,
    pub raw_request: String,
    /// Defaults to `true` when a document id is given.
    #[serde(default)]
    pub append: Option<bool>,
}

impl PipelineRequest {
    pub fn wants_append(&self) -> bool {
        self.append.unwrap_or(self.document_id.is_some())
    }
}

/// Result envelope of one run. Keeps every artifact produced before a failure.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_failed: Option<Stage>,
    /// For cancelled runs, the stage that did not start or finish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_before: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub instructions: Option<InstructionTriple>,
    pub rich_text: Option<AnnotateOutcome>,
    pub blocks: Option<Vec<Block>>,
    /// External encoding, present when the run did not append.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded: Option<Vec<Value>>,
    pub appended: bool,
    pub blocks_requested: usize,
    pub blocks_appended: usize,
    pub block_ids: Vec<BlockId>,
}

impl PipelineOutcome {
    fn started(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            duration_ms: 0,
            success: false,
            stage_failed: None,
            stopped_before: None,
            error: None,
            instructions: None,
            rich_text: None,
            blocks: None,
            encoded: None,
            appended: false,
            blocks_requested: 0,
            blocks_appended: 0,
            block_ids: Vec::new(),
        }
    }

    fn fail(&mut self, stage: Stage, error: impl Into<String>) {
        self.success = false;
        self.stage_failed = Some(stage);
        self.error = Some(error.into());
    }

    fn cancel(&mut self, before: Stage) {
        self.fail(Stage::Cancelled, "run cancelled");
        self.stopped_before = Some(before);
    }

    fn record_append_error(&mut self, err: AppendError) {
        self.blocks_requested = err.requested;
        self.blocks_appended = err.appended;
        self.block_ids = err.block_ids.clone();
        if err.source == StoreError::Cancelled {
            self.cancel(Stage::Append);
        } else {
            self.fail(Stage::Append, err.to_string());
        }
    }
}

/// Orchestrates one request through every stage. `Send + Sync`; share via `Arc`.
pub struct ContentPipeline {
    oracle_name: String,
    splitter: InstructionSplitter,
    annotator: SpanAnnotator,
    synthesizer: BlockSynthesizer,
    adapter: Option<BlockStoreAdapter>,
    dump_dir: Option<PathBuf>,
}

impl ContentPipeline {
    pub fn new(oracle: SharedOracle, adapter: Option<BlockStoreAdapter>) -> Self {
        Self {
            oracle_name: oracle.name().to_string(),
            splitter: InstructionSplitter::new(oracle.clone()),
            annotator: SpanAnnotator::new(oracle),
            synthesizer: BlockSynthesizer::new(),
            adapter,
            dump_dir: None,
        }
    }

    pub fn with_dump_dir(mut self, dump_dir: Option<PathBuf>) -> Self {
        self.dump_dir = dump_dir;
        self
    }

    /// Build oracle and store clients from configuration.
    ///
    /// Must run outside the async runtime: both own blocking HTTP clients.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineBuildError> {
        let oracle = build_oracle(&config.oracle)?;
        let adapter = build_store(&config.store)?
            .map(|store| BlockStoreAdapter::new(store, config.store.append_mode));
        let mut pipeline = Self::new(oracle, adapter).with_dump_dir(config.dump_dir.clone());
        pipeline.splitter = pipeline
            .splitter
            .with_content_temperature(config.oracle.content_temperature);
        Ok(pipeline)
    }

    pub fn oracle_name(&self) -> &str {
        &self.oracle_name
    }

    pub fn store_configured(&self) -> bool {
        self.adapter.is_some()
    }

    pub fn splitter(&self) -> &InstructionSplitter {
        &self.splitter
    }

    pub fn annotator(&self) -> &SpanAnnotator {
        &self.annotator
    }

    pub fn synthesizer(&self) -> &BlockSynthesizer {
        &self.synthesizer
    }

    /// Run the full pipeline for one request.
    pub fn run(&self, request: &PipelineRequest, cancel: &CancelFlag) -> PipelineOutcome {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %run_id);
        let _guard = span.enter();

        let start = Instant::now();
        let mut outcome = PipelineOutcome::started(run_id);
        let dump = self
            .dump_dir
            .as_deref()
            .and_then(|base| diagnostic::dump_dir_for(base, &run_id));

        tracing::info!(
            request_chars = request.raw_request.chars().count(),
            append = request.wants_append(),
            "Pipeline run started"
        );

        self.run_stages(request, cancel, &mut outcome, dump.as_deref());

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        if let Some(dir) = dump.as_deref() {
            diagnostic::dump_json(dir, OUTCOME_FILE, &outcome);
        }
        match outcome.stage_failed {
            None => tracing::info!(
                blocks = outcome.blocks.as_ref().map_or(0, Vec::len),
                appended = outcome.blocks_appended,
                duration_ms = outcome.duration_ms,
                "Pipeline run finished"
            ),
            Some(stage) => tracing::warn!(
                stage = stage.as_str(),
                error = outcome.error.as_deref().unwrap_or(""),
                duration_ms = outcome.duration_ms,
                "Pipeline run failed"
            ),
        }
        outcome
    }

    fn run_stages(
        &self,
        request: &PipelineRequest,
        cancel: &CancelFlag,
        outcome: &mut PipelineOutcome,
        dump: Option<&std::path::Path>,
    ) {
        // Stage 1 + 2: preprocessing
        if cancel.is_cancelled() {
            return outcome.cancel(Stage::Preprocessing);
        }
        let triple = {
            let _stage = tracing::info_span!("stage", stage = "preprocessing").entered();
            match self.splitter.split(&request.raw_request) {
                Ok(triple) => triple,
                Err(e) => return outcome.fail(Stage::Preprocessing, e.to_string()),
            }
        };
        if let Some(dir) = dump {
            diagnostic::dump_json(dir, INSTRUCTIONS_FILE, &triple);
        }
        outcome.instructions = Some(triple.clone());

        if cancel.is_cancelled() {
            return outcome.cancel(Stage::Preprocessing);
        }
        let rich_text = {
            let _stage = tracing::info_span!("stage", stage = "annotation").entered();
            self.annotator
                .annotate(&triple.format_instructions, &triple.result_text)
        };
        if rich_text.fallback {
            tracing::warn!(reason = %rich_text.message, "Annotation fell back to plain text");
        }
        if let Some(dir) = dump {
            diagnostic::dump_json(dir, SEGMENTS_FILE, &rich_text);
        }
        let segments = rich_text.segments.clone();
        outcome.rich_text = Some(rich_text);

        // Stage 3: block creation
        if cancel.is_cancelled() {
            return outcome.cancel(Stage::BlockCreation);
        }
        let blocks = {
            let _stage = tracing::info_span!("stage", stage = "block_creation").entered();
            match self.synthesizer.synthesize(&triple.block_instructions, &segments) {
                Ok(blocks) => blocks,
                Err(e) => return outcome.fail(Stage::BlockCreation, e.to_string()),
            }
        };
        let encoded = encode_blocks(&blocks);
        if let Some(dir) = dump {
            diagnostic::dump_json(dir, BLOCKS_FILE, &blocks);
            diagnostic::dump_json(dir, ENCODED_FILE, &encoded);
        }
        outcome.blocks_requested = blocks.len();
        outcome.blocks = Some(blocks);

        if !request.wants_append() {
            outcome.encoded = Some(encoded);
            outcome.success = true;
            return;
        }

        // Stage 4: append
        if cancel.is_cancelled() {
            return outcome.cancel(Stage::Append);
        }
        let Some(adapter) = self.adapter.as_ref() else {
            let err = StoreError::NotConfigured("NOTION_API_KEY is not set".into());
            return outcome.fail(Stage::Append, err.to_string());
        };
        let Some(document_id) = request.document_id.as_deref() else {
            let err = StoreError::InvalidDocumentId(String::new());
            return outcome.fail(Stage::Append, err.to_string());
        };
        let _stage = tracing::info_span!("stage", stage = "append").entered();
        let blocks = outcome.blocks.as_deref().unwrap_or(&[]);
        match adapter.append_all(document_id, blocks, cancel) {
            Ok(summary) => {
                outcome.appended = true;
                outcome.blocks_requested = summary.requested;
                outcome.blocks_appended = summary.appended;
                outcome.block_ids = summary.block_ids;
                outcome.success = true;
            }
            Err(e) => outcome.record_append_error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AppendMode;
    use crate::pipeline::oracle::MockOracle;
    use crate::pipeline::store::MemoryStore;

    fn partition(block: &str, format: &str) -> String {
        serde_json::json!({ "block_instructions": block, "format_instructions": format }).to_string()
    }

    fn request(document_id: Option<&str>, raw: &str) -> PipelineRequest {
        PipelineRequest {
            document_id: document_id.map(str::to_string),
            raw_request: raw.to_string(),
            append: None,
        }
    }

    fn pipeline(oracle: MockOracle, store: Option<Arc<MemoryStore>>, mode: AppendMode) -> ContentPipeline {
        let adapter = store.map(|s| BlockStoreAdapter::new(s, mode));
        ContentPipeline::new(Arc::new(oracle), adapter)
    }

    #[test]
    fn full_run_appends_styled_blocks() {
        let oracle = MockOracle::with_responses([
            partition("", "make 'Java' bold and red"),
            "Java is a language.".to_string(),
            r#"[{"content":"Java","bold":true,"color":"red"},{"content":" is a language."}]"#.to_string(),
        ]);
        let store = Arc::new(MemoryStore::new());
        let outcome = pipeline(oracle, Some(store.clone()), AppendMode::Batch)
            .run(&request(Some("doc-1"), "Java 소개 문장을 쓰고 'Java'를 빨간 굵은 글씨로"), &CancelFlag::new());

        assert!(outcome.success, "{:?}", outcome.error);
        assert!(outcome.appended);
        assert_eq!(outcome.blocks_requested, 1);
        assert_eq!(outcome.blocks_appended, 1);
        let rich_text = outcome.rich_text.unwrap();
        assert!(!rich_text.fallback);
        assert_eq!(rich_text.segments.len(), 2);
        let children = store.children_of("doc-1");
        assert_eq!(children[0]["paragraph"]["rich_text"][0]["annotations"]["color"], "red");
        assert!(outcome.encoded.is_none());
    }

    #[test]
    fn dry_run_without_document_id_returns_encoding() {
        let oracle = MockOracle::with_responses([partition("Add a divider", ""), String::new()]);
        let outcome = pipeline(oracle, None, AppendMode::Batch).run(&request(None, "구분선 하나"), &CancelFlag::new());
        assert!(outcome.success);
        assert!(!outcome.appended);
        assert_eq!(outcome.blocks, Some(vec![Block::Divider]));
        assert_eq!(outcome.encoded.unwrap()[0]["type"], "divider");
    }

    #[test]
    fn empty_request_fails_in_preprocessing() {
        let outcome = pipeline(MockOracle::new(), None, AppendMode::Batch).run(&request(None, "  "), &CancelFlag::new());
        assert!(!outcome.success);
        assert_eq!(outcome.stage_failed, Some(Stage::Preprocessing));
        assert!(outcome.instructions.is_none());
    }

    #[test]
    fn no_blocks_fails_in_block_creation_and_keeps_artifacts() {
        let oracle = MockOracle::with_responses([partition("", ""), String::new()]);
        let outcome = pipeline(oracle, None, AppendMode::Batch).run(&request(None, "아무것도"), &CancelFlag::new());
        assert_eq!(outcome.stage_failed, Some(Stage::BlockCreation));
        assert_eq!(outcome.error.as_deref(), Some("no blocks produced"));
        assert!(outcome.instructions.is_some());
        assert!(outcome.rich_text.is_some());
        assert!(outcome.blocks.is_none());
    }

    #[test]
    fn malformed_annotation_falls_back_and_run_succeeds() {
        let oracle = MockOracle::with_responses([
            partition("", "bold the first word"),
            "Hello world".to_string(),
            "I cannot do that".to_string(),
        ]);
        let outcome = pipeline(oracle, None, AppendMode::Batch).run(&request(None, "hello"), &CancelFlag::new());
        assert!(outcome.success);
        let rich_text = outcome.rich_text.unwrap();
        assert!(rich_text.fallback);
        assert_eq!(rich_text.segments, vec![crate::pipeline::types::Segment::plain("Hello world")]);
    }

    #[test]
    fn unformatted_request_keeps_every_segment_plain() {
        let text = "웹 개발 가이드\n\nHTML은 구조를 만듭니다.\n\n- 하나\n- 둘";
        let oracle = Arc::new(MockOracle::with_responses([partition("", ""), text.to_string()]));
        let outcome = ContentPipeline::new(oracle.clone(), None).run(&request(None, "웹 개발 소개"), &CancelFlag::new());

        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(oracle.call_count(), 2);
        let rich_text = outcome.rich_text.unwrap();
        assert!(!rich_text.fallback);
        assert_eq!(rich_text.segments, vec![crate::pipeline::types::Segment::plain(text)]);

        let blocks = outcome.blocks.unwrap();
        assert_eq!(blocks.len(), 4);
        assert!(blocks
            .iter()
            .filter_map(Block::segments)
            .flatten()
            .all(|segment| segment.annotations.is_plain()));
    }

    #[test]
    fn invalid_link_from_annotator_does_not_fail_the_run() {
        let oracle = MockOracle::with_responses([
            partition("", "link 'docs' to the docs page"),
            "See docs here.".to_string(),
            r#"[{"content":"See "},{"content":"docs","link_url":"docs page"},{"content":" here."}]"#.to_string(),
        ]);
        let outcome = pipeline(oracle, None, AppendMode::Batch).run(&request(None, "문서 링크"), &CancelFlag::new());

        assert!(outcome.success, "{:?}", outcome.error);
        let blocks = outcome.blocks.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].plain_text(), "See docs here.");
        assert!(blocks[0].segments().unwrap().iter().all(|s| s.annotations.link.is_none()));
    }

    #[test]
    fn per_block_failure_reports_partial_append() {
        let oracle = MockOracle::with_responses([partition("", ""), "- 하나\n- 둘\n- 셋".to_string()]);
        let store = Arc::new(MemoryStore::new().reject_at(1, "bad block"));
        let outcome = pipeline(oracle, Some(store), AppendMode::PerBlock)
            .run(&request(Some("doc-1"), "세 항목 목록"), &CancelFlag::new());
        assert!(!outcome.success);
        assert_eq!(outcome.stage_failed, Some(Stage::Append));
        assert_eq!(outcome.blocks_requested, 3);
        assert_eq!(outcome.blocks_appended, 1);
        assert_eq!(outcome.block_ids.len(), 1);
        assert_eq!(outcome.blocks.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn append_without_store_fails_in_append_stage() {
        let oracle = MockOracle::with_responses([partition("Add a divider", ""), String::new()]);
        let outcome = pipeline(oracle, None, AppendMode::Batch).run(&request(Some("doc-1"), "구분선"), &CancelFlag::new());
        assert_eq!(outcome.stage_failed, Some(Stage::Append));
        assert!(outcome.blocks.is_some());
    }

    #[test]
    fn cancelled_run_stops_before_first_stage() {
        let oracle = MockOracle::new();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let p = pipeline(oracle, None, AppendMode::Batch);
        let outcome = p.run(&request(None, "무엇이든"), &cancel);
        assert_eq!(outcome.stage_failed, Some(Stage::Cancelled));
        assert_eq!(outcome.stopped_before, Some(Stage::Preprocessing));
    }

    #[test]
    fn append_defaults_follow_document_id() {
        assert!(request(Some("d"), "x").wants_append());
        assert!(!request(None, "x").wants_append());
        let explicit = PipelineRequest {
            append: Some(false),
            ..request(Some("d"), "x")
        };
        assert!(!explicit.wants_append());
    }

    #[test]
    fn run_writes_diagnostic_dump() {
        let tmp = tempfile::tempdir().unwrap();
        let oracle = MockOracle::with_responses([partition("Add a divider", ""), String::new()]);
        let outcome = pipeline(oracle, None, AppendMode::Batch)
            .with_dump_dir(Some(tmp.path().to_path_buf()))
            .run(&request(None, "구분선"), &CancelFlag::new());
        let dir = tmp.path().join(outcome.run_id.to_string());
        for file in [INSTRUCTIONS_FILE, SEGMENTS_FILE, BLOCKS_FILE, ENCODED_FILE, OUTCOME_FILE] {
            assert!(dir.join(file).exists(), "{file} missing");
        }
    }

    #[test]
    fn outcome_serializes_stage_tag() {
        let oracle = MockOracle::with_responses([partition("", ""), String::new()]);
        let outcome = pipeline(oracle, None, AppendMode::Batch).run(&request(None, "x"), &CancelFlag::new());
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["stage_failed"], "block_creation");
    }
}
