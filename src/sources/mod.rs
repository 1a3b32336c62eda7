//! Provider adapters behind a common [`Source`] trait.
//!
//! Each adapter turns a [`SearchQuery`] into a provider-specific request,
//! executes it once and normalizes the response into [`Paper`] records:
//!
//! - [`ArxivSource`]: Atom feed over unauthenticated GET
//! - [`PubMedSource`]: E-utilities ESearch (JSON) followed by EFetch (XML)
//! - [`CoreSource`]: CORE API v3, JSON over an authenticated POST
//!
//! Adapters never retry. Every failure is returned as a [`SourceError`] and
//! turned into per-provider diagnostics by the aggregator.
//!
//! [`Paper`]: crate::models::Paper

mod arxiv;
mod core;
pub mod mock;
mod pubmed;
mod registry;

pub use self::arxiv::ArxivSource;
pub use self::core::CoreSource;
pub use self::pubmed::PubMedSource;
pub use mock::MockSource;
pub use registry::SourceRegistry;

use crate::models::{SearchQuery, SourceResults, SourceType};
use async_trait::async_trait;

/// The Source trait defines the interface for all provider adapters.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Provider this adapter talks to
    fn source_type(&self) -> SourceType;

    /// Unique identifier for this source ("arxiv", "pubmed", "core")
    fn id(&self) -> &str {
        self.source_type().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.source_type().name()
    }

    /// Whether every credential the source needs is present
    fn is_configured(&self) -> bool {
        true
    }

    /// Search for papers matching the query
    async fn search(&self, query: &SearchQuery) -> Result<SourceResults, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// The request or the overall search ran out of time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Parsing error (XML, JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Non-success answer from the provider
    #[error("API error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// A required credential is not configured; no request was sent
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// The search was cancelled before the provider answered
    #[error("Cancelled before the provider responded")]
    Cancelled,

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

/// Collapse runs of whitespace (including the line breaks providers embed in
/// titles and abstracts) into single spaces
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_names_variable() {
        let err = SourceError::MissingCredential("CORE_API_KEY");
        assert!(err.to_string().contains("CORE_API_KEY"));
    }

    #[test]
    fn test_json_error_is_parse_error() {
        let err: SourceError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  Attention Is\n   All You  Need "),
            "Attention Is All You Need"
        );
        assert_eq!(normalize_whitespace(""), "");
    }
}
