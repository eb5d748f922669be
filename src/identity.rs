//! Document identity
//!
//! Highlights are keyed by the page they were made on, not by the exact URL
//! that was loaded: query strings and fragments change between visits (share
//! links, tracking parameters, in-page navigation) while the content stays
//! the same.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid document URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Normalized `origin + path` key of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentIdentity(String);

impl DocumentIdentity {
    /// Normalize a URL: drop query and fragment and one trailing slash
    pub fn parse(input: &str) -> Result<Self, IdentityError> {
        let url = Url::parse(input.trim()).map_err(|e| IdentityError::InvalidUrl {
            url: input.to_string(),
            reason: e.to_string(),
        })?;

        let origin = match url.origin() {
            origin @ url::Origin::Tuple(..) => origin.ascii_serialization(),
            url::Origin::Opaque(_) => {
                format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""))
            }
        };

        let path = url.path();
        let path = path.strip_suffix('/').unwrap_or(path);

        Ok(Self(format!("{}{}", origin, path)))
    }

    /// Wrap an already-normalized identity (as read back from storage)
    pub fn from_normalized(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_and_fragment_ignored() {
        let a = DocumentIdentity::parse("https://example.com/articles/42?utm=feed#section-2").unwrap();
        let b = DocumentIdentity::parse("https://example.com/articles/42").unwrap();

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://example.com/articles/42");
    }

    #[test]
    fn test_trailing_slash_and_root() {
        let a = DocumentIdentity::parse("https://example.com/docs/").unwrap();
        assert_eq!(a.as_str(), "https://example.com/docs");

        let root = DocumentIdentity::parse("https://example.com/").unwrap();
        assert_eq!(root.as_str(), "https://example.com");
    }

    #[test]
    fn test_port_is_part_of_origin() {
        let a = DocumentIdentity::parse("http://localhost:8080/page").unwrap();
        assert_eq!(a.as_str(), "http://localhost:8080/page");
    }

    #[test]
    fn test_file_urls() {
        let a = DocumentIdentity::parse("file:///home/reader/notes.html").unwrap();
        assert_eq!(a.as_str(), "file:///home/reader/notes.html");
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            DocumentIdentity::parse("not a url"),
            Err(IdentityError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_serializes_as_string() {
        let id = DocumentIdentity::parse("https://example.com/a").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"https://example.com/a\"");
    }
}
