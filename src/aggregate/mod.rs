//! Fan-out search across every provider adapter.
//!
//! The [`Aggregator`] validates a [`SearchRequest`](crate::models::SearchRequest),
//! runs each requested adapter as its own task and waits for all of them.
//! Provider failures become data in the response, so a search only fails for
//! invalid input.

mod coordinator;
mod merge;

pub use coordinator::Aggregator;
pub use merge::{merge, ProviderOutcome};

use crate::sources::SourceError;

/// Errors that fail a whole search
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The query is empty or whitespace only
    #[error("Query must not be empty")]
    EmptyQuery,

    /// A requested provider name is not arXiv, PubMed or CORE
    #[error("Unknown provider '{0}' (expected one of: arxiv, pubmed, core)")]
    UnknownProvider(String),

    /// The shared HTTP client or an adapter could not be built
    #[error("Failed to initialize providers: {0}")]
    Init(#[from] SourceError),
}
