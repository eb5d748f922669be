//! Settings API routes
//!
//! A color change repaints every open session; toggling `enabled` removes or
//! re-applies markers everywhere.

use axum::{extract::State, routing::get, Json, Router};
use tracing::info;

use crate::engine::{Settings, SettingsUpdate};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the settings router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings().get())
}

async fn update_settings(State(state): State<AppState>, Json(update): Json<SettingsUpdate>) -> Result<Json<Settings>> {
    if update.highlight_color.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(AppError::BadRequest("highlightColor must not be empty".to_string()));
    }

    let (previous, current) = state.settings().update(update);

    if current.highlight_color != previous.highlight_color {
        let updated = state.registry().recolor_all(&current.highlight_color).await;
        info!("Recolored {} highlights to {}", updated, current.highlight_color);
    }
    if current.enabled != previous.enabled {
        state.registry().set_enabled_all(current.enabled).await;
    }

    Ok(Json(current))
}
