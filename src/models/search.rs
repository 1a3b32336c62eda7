//! Search request and response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Paper;

/// Default number of results requested from each provider
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Inbound aggregated search request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text search string; must not be blank
    pub query: String,

    /// Per-provider result cap
    #[serde(default)]
    pub max_results: Option<usize>,

    /// Explicit provider subset ("arxiv", "pubmed", "core"); all when absent
    #[serde(default)]
    pub providers: Option<Vec<String>>,

    /// Drop cross-provider duplicates from the merged list
    #[serde(default)]
    pub deduplicate: bool,
}

impl SearchRequest {
    /// Create a new search request
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set maximum results per provider
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Restrict the search to these providers
    pub fn providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = Some(providers.into_iter().map(Into::into).collect());
        self
    }

    /// Enable/disable cross-provider deduplication
    pub fn deduplicate(mut self, dedupe: bool) -> Self {
        self.deduplicate = dedupe;
        self
    }
}

/// Query handed to each provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Main search query string
    pub query: String,

    /// Maximum number of results to return
    pub max_results: usize,
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

/// Papers returned by a single provider for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceResults {
    /// Normalized papers, in the order the provider returned them
    pub papers: Vec<Paper>,

    /// Total number of hits the provider reported, if it reports one
    pub total_results: Option<usize>,
}

impl SourceResults {
    pub fn new(papers: Vec<Paper>) -> Self {
        Self {
            papers,
            total_results: None,
        }
    }

    /// Set total results
    pub fn total_results(mut self, total: usize) -> Self {
        self.total_results = Some(total);
        self
    }
}

/// Per-provider diagnostics attached to every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider display name
    pub name: String,

    /// Number of papers the provider returned
    pub count: usize,

    /// Time the provider took to answer (or fail)
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,

    /// Error message; empty on success
    #[serde(default)]
    pub error: String,

    /// Total number of hits the provider reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<usize>,
}

impl ProviderInfo {
    /// Whether the provider answered successfully
    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// Aggregated response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Query as submitted
    pub query: String,

    /// Merged papers in provider priority order
    pub papers: Vec<Paper>,

    /// One entry per requested provider
    pub providers: Vec<ProviderInfo>,

    /// When the response was assembled
    pub fetched_at: DateTime<Utc>,
}

impl SearchResponse {
    /// Providers that reported an error
    pub fn failed_providers(&self) -> impl Iterator<Item = &ProviderInfo> {
        self.providers.iter().filter(|p| !p.is_success())
    }

    /// Diagnostics for a provider, looked up by display name
    pub fn provider(&self, name: &str) -> Option<&ProviderInfo> {
        self.providers.iter().find(|p| p.name == name)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
