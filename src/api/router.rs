//! HTTP router.
//!
//! Returns a composable `Router`; routes are nested under `/api/`.
//! Layers (outermost → innermost): CORS → request tracing → handler.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/pipeline/run", post(endpoints::pipeline::run))
        .route("/pipeline/split", post(endpoints::pipeline::split))
        .route("/pipeline/annotate", post(endpoints::pipeline::annotate))
        .route("/pipeline/synthesize", post(endpoints::pipeline::synthesize))
        .route("/pipeline/encode", post(endpoints::pipeline::encode))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .fallback(endpoints::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
