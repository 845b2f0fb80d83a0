//! Pipeline endpoints: the full run plus each stage on its own.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::{AnnotateBody, ApiContext, CancelOnDrop, EncodeBody, SplitBody, SynthesizeBody};
use crate::pipeline::annotate::AnnotateOutcome;
use crate::pipeline::store::encode_blocks;
use crate::pipeline::synthesize::validation::validate_block;
use crate::pipeline::types::{Block, InstructionTriple};
use crate::pipeline::{CancelFlag, ContentPipeline, PipelineOutcome, PipelineRequest};

#[derive(Serialize)]
pub struct BlocksResponse {
    pub blocks: Vec<Block>,
}

#[derive(Serialize)]
pub struct EncodedResponse {
    pub blocks: Vec<Value>,
}

/// Run blocking pipeline work off the async executor, bounded by the
/// configured ceiling. On expiry the run's cancel flag is raised.
async fn run_bounded<T, F>(ctx: &ApiContext, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&ContentPipeline, &CancelFlag) -> T + Send + 'static,
    T: Send + 'static,
{
    let pipeline = ctx.pipeline.clone();
    let cancel = CancelFlag::new();
    let _on_drop = CancelOnDrop(cancel.clone());
    let task_cancel = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || work(&pipeline, &task_cancel));

    let ceiling = ctx.pipeline_timeout();
    match tokio::time::timeout(ceiling, handle).await {
        Ok(joined) => Ok(joined?),
        Err(_) => {
            cancel.cancel();
            tracing::warn!(secs = ceiling.as_secs(), "Pipeline run exceeded ceiling, cancelled");
            Err(ApiError::Timeout {
                secs: ceiling.as_secs(),
            })
        }
    }
}

fn validate_run(request: &PipelineRequest) -> Result<(), ApiError> {
    if request.raw_request.trim().is_empty() {
        return Err(ApiError::BadRequest("raw_request must not be empty".into()));
    }
    match request.document_id.as_deref() {
        Some(id) if id.trim().is_empty() => Err(ApiError::BadRequest("document_id must not be blank".into())),
        None if request.append == Some(true) => {
            Err(ApiError::BadRequest("document_id is required when append is true".into()))
        }
        _ => Ok(()),
    }
}

/// `POST /api/pipeline/run` — always 200 with the outcome envelope once the
/// input is valid; stage failures are reported inside it.
pub async fn run(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PipelineRequest>, JsonRejection>,
) -> Result<Json<PipelineOutcome>, ApiError> {
    let Json(request) = payload?;
    validate_run(&request)?;
    let outcome = run_bounded(&ctx, move |pipeline, cancel| pipeline.run(&request, cancel)).await?;
    Ok(Json(outcome))
}

/// `POST /api/pipeline/split`
pub async fn split(
    State(ctx): State<ApiContext>,
    payload: Result<Json<SplitBody>, JsonRejection>,
) -> Result<Json<InstructionTriple>, ApiError> {
    let Json(body) = payload?;
    let triple = run_bounded(&ctx, move |pipeline, _| pipeline.splitter().split(&body.raw_request)).await??;
    Ok(Json(triple))
}

/// `POST /api/pipeline/annotate`
pub async fn annotate(
    State(ctx): State<ApiContext>,
    payload: Result<Json<AnnotateBody>, JsonRejection>,
) -> Result<Json<AnnotateOutcome>, ApiError> {
    let Json(body) = payload?;
    let outcome = run_bounded(&ctx, move |pipeline, _| {
        pipeline
            .annotator()
            .annotate(&body.format_instructions, &body.result_text)
    })
    .await?;
    Ok(Json(outcome))
}

/// `POST /api/pipeline/synthesize`
pub async fn synthesize(
    State(ctx): State<ApiContext>,
    payload: Result<Json<SynthesizeBody>, JsonRejection>,
) -> Result<Json<BlocksResponse>, ApiError> {
    let Json(body) = payload?;
    let blocks = ctx
        .pipeline
        .synthesizer()
        .synthesize(&body.block_instructions, &body.segments)?;
    Ok(Json(BlocksResponse { blocks }))
}

/// `POST /api/pipeline/encode` — dry run of the store encoding.
pub async fn encode(payload: Result<Json<EncodeBody>, JsonRejection>) -> Result<Json<EncodedResponse>, ApiError> {
    let Json(body) = payload?;
    for (index, block) in body.blocks.iter().enumerate() {
        validate_block(block).map_err(|reason| {
            ApiError::BadRequest(format!("block {index} ({}) is invalid: {reason}", block.kind_name()))
        })?;
    }
    Ok(Json(EncodedResponse {
        blocks: encode_blocks(&body.blocks),
    }))
}
