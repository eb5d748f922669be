//! Export and import API routes

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::error::Result;
use crate::state::AppState;
use crate::store::transfer::{export_all, import_bundle, ExportBundle, ImportReport};

/// Create the transfer router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/export", get(export))
        .route("/import", post(import))
}

async fn export(State(state): State<AppState>) -> Result<Json<ExportBundle>> {
    Ok(Json(export_all(state.store()).await?))
}

/// Import a bundle; rejected identities are listed in the report
async fn import(State(state): State<AppState>, Json(bundle): Json<Value>) -> Result<Json<ImportReport>> {
    Ok(Json(import_bundle(state.store(), &bundle).await?))
}

#[cfg(test)]
mod tests {
    use crate::routes::tests::test_server;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_export_import_between_servers() {
        let source = test_server();
        let url = "https://example.com/page";
        source
            .post("/api/v1/sessions")
            .json(&json!({ "url": url, "html": "<p>Alpha beta gamma</p>" }))
            .await;
        source
            .post("/api/v1/sessions/selection")
            .json(&json!({ "url": url, "selection": { "type": "quote", "text": "gamma" } }))
            .await;

        let bundle: Value = source.get("/api/v1/transfer/export").await.json();
        assert_eq!(bundle["version"], 1);

        let target = test_server();
        let report: Value = target.post("/api/v1/transfer/import").json(&bundle).await.json();
        assert_eq!(report["importedDocuments"], 1);
        assert_eq!(report["importedAnchors"], 1);

        let opened: Value = target
            .post("/api/v1/sessions")
            .json(&json!({ "url": url, "html": "<p>Alpha beta gamma</p>" }))
            .await
            .json();
        assert_eq!(opened["outcome"]["resolved"], 1);
    }

    #[tokio::test]
    async fn test_import_rejects_newer_bundle() {
        let server = test_server();
        let response = server
            .post("/api/v1/transfer/import")
            .json(&json!({ "version": 2, "data": {} }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid_bundle");
    }
}
