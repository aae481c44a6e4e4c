// crates/server/src/lib.rs
//! The HTTP facade (§10.5): the thinnest layer in the repo. One Axum
//! router exposing the eight §6 operations as JSON endpoints over a
//! shared `AppState`, with CORS locked to localhost and request tracing.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod tree;

pub use config::Config;
pub use error::AppError;
pub use state::AppState;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Only localhost origins may call this API — a local single-user service
/// has no business answering cross-origin requests from anywhere else.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _req_parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .map(|o| o.starts_with("http://localhost:") || o.starts_with("http://127.0.0.1:"))
                    .unwrap_or(false)
            },
        ))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: Arc<AppState>) -> Router {
    routes::api_routes(state).layer(cors_layer()).layer(TraceLayer::new_for_http())
}
