//! # Research Fanout
//!
//! Concurrent literature search across arXiv, PubMed and CORE.
//!
//! One query is sent to every selected provider at once. Each provider's
//! response is normalized into a common [`Paper`] record and the results are
//! merged in a fixed provider order, together with per-provider diagnostics.
//! A provider that fails, rate-limits or lacks credentials only shows up as
//! an error in its own diagnostics entry.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (Paper, SearchRequest, SearchResponse)
//! - [`sources`]: Provider adapters behind the [`Source`] trait
//! - [`aggregate`]: Fan-out coordinator and result merger
//! - [`utils`]: HTTP client, deduplication
//! - [`config`]: Configuration management
//!
//! ```rust,no_run
//! use research_fanout::{Aggregator, SearchRequest};
//! use research_fanout::config::get_config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let aggregator = Aggregator::from_config(&get_config()?)?;
//! let response = aggregator
//!     .search(&SearchRequest::new("machine learning").max_results(5))
//!     .await?;
//!
//! for provider in &response.providers {
//!     println!("{}: {} papers {}", provider.name, provider.count, provider.error);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use aggregate::{Aggregator, SearchError};
pub use models::{Paper, ProviderInfo, SearchRequest, SearchResponse, SourceType};
pub use sources::{Source, SourceError, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
