//! HTTP server lifecycle: bind, serve the API router, stop on Ctrl-C or an
//! explicit shutdown signal.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::api::router::api_router;
use crate::api::types::ApiContext;
use crate::config::AppConfig;
use crate::pipeline::ContentPipeline;

/// Serve until Ctrl-C.
pub async fn serve(config: Arc<AppConfig>, pipeline: Arc<ContentPipeline>) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    serve_on(listener, config, pipeline, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on<S>(
    listener: TcpListener,
    config: Arc<AppConfig>,
    pipeline: Arc<ContentPipeline>,
    shutdown: S,
) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = listener.local_addr()?;
    let app = api_router(ApiContext::new(pipeline, config));

    tracing::info!(%addr, "HTTP server started");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        return std::future::pending().await;
    }
    tracing::info!("Shutdown signal received");
}
