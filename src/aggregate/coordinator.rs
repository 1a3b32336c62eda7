//! Concurrent provider dispatch.

use futures_util::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::merge::{merge, ProviderOutcome};
use super::SearchError;
use crate::config::Config;
use crate::models::{SearchQuery, SearchRequest, SearchResponse, SourceType, DEFAULT_MAX_RESULTS};
use crate::sources::{Source, SourceError, SourceRegistry};

/// Runs one search against several providers at once and merges the results
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    default_max_results: usize,
}

impl Aggregator {
    /// Create an aggregator over an existing registry
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Create an aggregator with the three real adapters
    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        let registry = SourceRegistry::from_config(config)?;
        Ok(Self::new(registry).with_default_max_results(config.search.default_max_results))
    }

    /// Per-provider cap used when a request does not set one
    pub fn with_default_max_results(mut self, max: usize) -> Self {
        self.default_max_results = max.max(1);
        self
    }

    /// The adapters this aggregator dispatches to
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Search every requested provider and wait for all of them
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        self.search_until(request, CancellationToken::new(), None).await
    }

    /// Like [`search`](Self::search), but providers still running when
    /// `cancel` fires report [`SourceError::Cancelled`]
    pub async fn search_with_cancel(
        &self,
        request: &SearchRequest,
        cancel: CancellationToken,
    ) -> Result<SearchResponse, SearchError> {
        self.search_until(request, cancel, None).await
    }

    /// Like [`search`](Self::search), but providers still running after
    /// `deadline` report [`SourceError::Timeout`]
    pub async fn search_with_deadline(
        &self,
        request: &SearchRequest,
        deadline: Duration,
    ) -> Result<SearchResponse, SearchError> {
        self.search_until(request, CancellationToken::new(), Some(deadline)).await
    }

    /// Search with both an external cancellation signal and an optional
    /// deadline; whichever fires first stops the providers still running
    pub async fn search_until(
        &self,
        request: &SearchRequest,
        cancel: CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<SearchResponse, SearchError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let providers = resolve_providers(request.providers.as_deref())?;
        let max_results = request
            .max_results
            .filter(|max| *max > 0)
            .unwrap_or(self.default_max_results);
        let search_query = SearchQuery::new(query).max_results(max_results);

        tracing::info!(
            query,
            providers = providers.len(),
            max_results,
            "starting fan-out search"
        );

        let started = Instant::now();
        let expires_at = deadline.map(|d| tokio::time::Instant::now() + d);

        // Tasks outlive this future if it is dropped; cancel them with it
        let cancel = cancel.child_token();
        let _abandon_on_drop = cancel.clone().drop_guard();

        let handles: Vec<_> = providers
            .iter()
            .map(|&source_type| {
                let source = self.registry.get(source_type).cloned();
                let query = search_query.clone();
                let cancel = cancel.clone();
                tokio::spawn(run_provider(source_type, source, query, cancel, expires_at))
            })
            .collect();

        // Join barrier: every provider reports before anything is merged
        let outcomes = join_all(handles)
            .await
            .into_iter()
            .zip(&providers)
            .map(|(joined, &source_type)| {
                joined.unwrap_or_else(|e| {
                    tracing::warn!(provider = source_type.name(), error = %e, "provider task failed");
                    ProviderOutcome::failure(
                        source_type,
                        started.elapsed(),
                        format!("adapter task failed: {}", e),
                    )
                })
            })
            .collect();

        let response = merge(&request.query, outcomes, request.deduplicate);

        tracing::info!(
            papers = response.papers.len(),
            failed = response.failed_providers().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fan-out search finished"
        );

        Ok(response)
    }
}

/// One provider's task body; never fails, errors become part of the outcome
async fn run_provider(
    source_type: SourceType,
    source: Option<Arc<dyn Source>>,
    query: SearchQuery,
    cancel: CancellationToken,
    expires_at: Option<tokio::time::Instant>,
) -> ProviderOutcome {
    let started = Instant::now();

    let result = match source {
        None => Err(SourceError::Other("provider not registered".to_string())),
        Some(source) => {
            let expired = async {
                match expires_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(SourceError::Cancelled),
                _ = expired => Err(SourceError::Timeout("search deadline elapsed".to_string())),
                result = source.search(&query) => result,
            }
        }
    };

    let duration = started.elapsed();
    let elapsed_ms = duration.as_millis() as u64;

    match result {
        Ok(results) => {
            tracing::debug!(
                provider = source_type.name(),
                papers = results.papers.len(),
                elapsed_ms,
                "provider finished"
            );
            ProviderOutcome::success(source_type, duration, results)
        }
        Err(e) => {
            tracing::warn!(provider = source_type.name(), error = %e, elapsed_ms, "provider failed");
            ProviderOutcome::failure(source_type, duration, e.to_string())
        }
    }
}

/// Requested provider names to a de-duplicated set in priority order.
///
/// `None` or an empty list selects every provider.
fn resolve_providers(requested: Option<&[String]>) -> Result<Vec<SourceType>, SearchError> {
    let requested = match requested {
        Some(names) if !names.is_empty() => names,
        _ => return Ok(SourceType::ALL.to_vec()),
    };

    let selected = requested
        .iter()
        .map(|name| {
            name.parse::<SourceType>()
                .map_err(|_| SearchError::UnknownProvider(name.trim().to_string()))
        })
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(selected.into_iter().collect())
}
