//! Tienda backend library.
//!
//! This crate provides the storefront/admin API as a library, allowing it to
//! be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod assets;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod routes;
pub mod state;
pub mod store;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the application router over a prepared state. Shared between the
/// binary and the integration tests.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
