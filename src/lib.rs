pub mod api;
pub mod config;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::{AppConfig, ConfigError};
use pipeline::orchestrator::PipelineBuildError;
use pipeline::ContentPipeline;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineBuildError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

fn log_filter() -> EnvFilter {
    std::env::var("PAGESMITH_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(config::default_log_filter()))
}

pub fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Arc::new(AppConfig::from_env()?);
    // Blocking HTTP clients must be built before the async runtime exists.
    let pipeline = Arc::new(ContentPipeline::from_config(&config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let served = runtime.block_on(api::serve(config, pipeline.clone()));
    // The last pipeline handle (and its blocking clients) drops outside the runtime.
    drop(runtime);
    drop(pipeline);
    served?;
    Ok(())
}
