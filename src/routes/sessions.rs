//! Highlight session API routes
//!
//! A session is one open document. The client posts the page HTML once and
//! then drives highlighting against it; `GET /document` returns the page
//! with its current markers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::UrlQuery;
use crate::anchor::Anchor;
use crate::engine::{HighlightEngine, PassOutcome, Selection, SessionStatus};
use crate::error::{AppError, Result};
use crate::identity::DocumentIdentity;
use crate::state::AppState;

/// Create the sessions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(open_session).get(get_session).delete(close_session))
        .route("/document", get(render_document))
        .route("/apply", post(apply_highlights))
        .route("/selection", post(highlight_selection))
        .route("/clear", post(clear_highlights))
        .route("/enabled", post(set_enabled))
}

#[derive(Debug, Deserialize)]
pub struct OpenSession {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct SessionOpened {
    pub session: SessionStatus,
    pub outcome: PassOutcome,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub url: String,
    #[serde(default)]
    pub force: bool,
    /// Resolve these instead of the stored anchors
    #[serde(default)]
    pub anchors: Option<Vec<Anchor>>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub url: String,
    pub selection: Selection,
}

#[derive(Debug, Deserialize)]
pub struct EnabledRequest {
    pub url: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub removed: usize,
}

fn open_engine(state: &AppState, url: &str) -> Result<Arc<HighlightEngine>> {
    let identity = DocumentIdentity::parse(url)?;
    state
        .registry()
        .get(&identity)
        .ok_or_else(|| AppError::NotFound(format!("No open session for: {}", identity)))
}

/// Open (or reopen) a session and apply stored highlights
async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSession>,
) -> Result<(StatusCode, Json<SessionOpened>)> {
    let identity = DocumentIdentity::parse(&request.url)?;
    let (engine, outcome) = state.registry().open(identity, &request.html).await?;
    let session = engine.status().await;
    Ok((StatusCode::CREATED, Json(SessionOpened { session, outcome })))
}

async fn get_session(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> Result<Json<SessionStatus>> {
    let engine = open_engine(&state, &query.url)?;
    Ok(Json(engine.status().await))
}

async fn close_session(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> Result<StatusCode> {
    let identity = DocumentIdentity::parse(&query.url)?;
    if state.registry().close(&identity) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No open session for: {}", identity)))
    }
}

/// Current HTML of the document, markers included
async fn render_document(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> Result<String> {
    let engine = open_engine(&state, &query.url)?;
    Ok(engine.render().await)
}

async fn apply_highlights(
    State(state): State<AppState>,
    Json(request): Json<ApplyRequest>,
) -> Result<Json<PassOutcome>> {
    let engine = open_engine(&state, &request.url)?;
    let outcome = match request.anchors {
        Some(anchors) => engine.apply_with(anchors, request.force).await?,
        None => engine.apply_all(request.force).await?,
    };
    Ok(Json(outcome))
}

async fn highlight_selection(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<(StatusCode, Json<Anchor>)> {
    let engine = open_engine(&state, &request.url)?;
    let anchor = engine.highlight_selection(&request.selection).await?;
    Ok((StatusCode::CREATED, Json(anchor)))
}

async fn clear_highlights(State(state): State<AppState>, Json(request): Json<UrlQuery>) -> Result<Json<Cleared>> {
    let engine = open_engine(&state, &request.url)?;
    let removed = engine.clear_highlights().await?;
    Ok(Json(Cleared { removed }))
}

async fn set_enabled(State(state): State<AppState>, Json(request): Json<EnabledRequest>) -> Result<Json<PassOutcome>> {
    let engine = open_engine(&state, &request.url)?;
    Ok(Json(engine.set_enabled(request.enabled).await?))
}
