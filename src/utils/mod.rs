//! Utility modules shared by the provider adapters and the aggregator.
//!
//! - [`HttpClient`]: shared reqwest client with configured timeouts
//! - [`check_status`]: map non-2xx responses to [`SourceError`](crate::sources::SourceError)
//! - [`deduplicate_papers`]: remove cross-provider duplicates using DOI matching and title similarity
//! - [`find_duplicates`]: find duplicate groups without modifying the list
//!
//! # Deduplication
//!
//! ```rust
//! use research_fanout::utils::deduplicate_papers;
//! use research_fanout::models::Paper;
//!
//! # fn example(papers: Vec<Paper>) {
//! // Remove duplicates, keeping the first occurrence
//! let unique = deduplicate_papers(papers);
//! # }
//! ```

mod dedup;
mod http;

pub use dedup::{deduplicate_papers, find_duplicates};
pub use http::{check_status, HttpClient};
