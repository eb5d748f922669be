//! Marginalia
//!
//! Persistent highlights for arbitrary web documents. A highlight is stored
//! as an anchor: enough structural and textual evidence to find the same
//! passage again after the page has been reloaded or has drifted.
//!
//! # Modules
//!
//! - `dom`: document tree, ranges and HTML parsing/serialization
//! - `anchor`: address encoding, text search, anchor building and resolution
//! - `engine`: per-document highlight sessions
//! - `store`: anchor persistence and bulk transfer
//! - `routes`: HTTP API

pub mod anchor;
pub mod config;
pub mod db;
pub mod dom;
pub mod engine;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;
pub mod store;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/health", routes::health::router())
        .nest("/api/v1/sessions", routes::sessions::router())
        .nest("/api/v1/anchors", routes::anchors::router())
        .nest("/api/v1/documents", routes::documents::router())
        .nest("/api/v1/settings", routes::settings::router())
        .nest("/api/v1/transfer", routes::transfer::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
