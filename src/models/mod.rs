//! Core data models for papers and aggregated search.

mod paper;
mod search;

pub use paper::{Paper, PaperBuilder, SourceType};
pub use search::{
    ProviderInfo, SearchQuery, SearchRequest, SearchResponse, SourceResults, DEFAULT_MAX_RESULTS,
};
