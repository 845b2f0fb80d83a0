//! HTTP API.
//!
//! A thin axum layer over the content pipeline: the full run plus each stage
//! for inspection. Blocking pipeline work runs on `spawn_blocking` under a
//! per-request ceiling.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, serve_on};
pub use types::ApiContext;
