//! HTTP routes

pub mod anchors;
pub mod documents;
pub mod health;
pub mod sessions;
pub mod settings;
pub mod transfer;

use serde::Deserialize;

/// `?url=` selector shared by the document-scoped routes
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}
