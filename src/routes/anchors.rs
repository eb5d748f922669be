//! Stored anchor API routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::UrlQuery;
use crate::anchor::Anchor;
use crate::error::{AppError, Result};
use crate::identity::DocumentIdentity;
use crate::state::AppState;

/// Create the anchors router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_anchors).delete(delete_anchors))
}

/// Stored anchors of a document, in save order
async fn list_anchors(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> Result<Json<Vec<Anchor>>> {
    let identity = DocumentIdentity::parse(&query.url)?;
    let anchors = state.store().load_anchors(&identity).await?;
    Ok(Json(anchors))
}

/// Delete a document's anchors; an open session is cleared as well
async fn delete_anchors(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> Result<StatusCode> {
    let identity = DocumentIdentity::parse(&query.url)?;

    let removed = match state.registry().get(&identity) {
        Some(engine) => {
            let indexed = state.store().index().await?.contains_key(&identity);
            engine.clear_highlights().await? > 0 || indexed
        }
        None => state.store().delete_anchors(&identity).await?,
    };

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No highlights for: {}", identity)))
    }
}
