//! Document index API routes

use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};

use crate::error::Result;
use crate::identity::DocumentIdentity;
use crate::state::AppState;
use crate::store::IndexEntry;

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_documents))
}

/// Every document with saved highlights
async fn list_documents(State(state): State<AppState>) -> Result<Json<BTreeMap<DocumentIdentity, IndexEntry>>> {
    Ok(Json(state.store().index().await?))
}
