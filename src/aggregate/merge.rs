//! Merging per-provider outcomes into one response.

use chrono::Utc;
use std::time::Duration;

use crate::models::{ProviderInfo, SearchResponse, SourceResults, SourceType};
use crate::utils::deduplicate_papers;

/// What one provider task produced
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    /// Provider the task ran for
    pub source: SourceType,

    /// Wall time from task start to completion
    pub duration: Duration,

    /// Papers on success, the rendered error otherwise
    pub result: Result<SourceResults, String>,
}

impl ProviderOutcome {
    pub fn success(source: SourceType, duration: Duration, results: SourceResults) -> Self {
        Self {
            source,
            duration,
            result: Ok(results),
        }
    }

    pub fn failure(source: SourceType, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            source,
            duration,
            result: Err(error.into()),
        }
    }
}

/// Build the response envelope from provider outcomes.
///
/// Outcomes are put in provider priority order (arXiv, PubMed, CORE) no
/// matter which finished first. Papers of failed providers are never
/// included. With `deduplicate` set, cross-provider duplicates are dropped
/// after merging; provider counts still report what each provider returned.
pub fn merge(query: &str, mut outcomes: Vec<ProviderOutcome>, deduplicate: bool) -> SearchResponse {
    // Stable, so equal sources keep their arrival order
    outcomes.sort_by_key(|outcome| outcome.source);

    let mut papers = Vec::new();
    let mut providers = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        let name = outcome.source.name().to_string();

        match outcome.result {
            Ok(results) => {
                providers.push(ProviderInfo {
                    name,
                    count: results.papers.len(),
                    duration: outcome.duration,
                    error: String::new(),
                    total_results: results.total_results,
                });
                papers.extend(results.papers);
            }
            Err(error) => {
                let error = if error.trim().is_empty() {
                    "unknown error".to_string()
                } else {
                    error
                };
                providers.push(ProviderInfo {
                    name,
                    count: 0,
                    duration: outcome.duration,
                    error,
                    total_results: None,
                });
            }
        }
    }

    if deduplicate {
        let before = papers.len();
        papers = deduplicate_papers(papers);
        tracing::debug!(removed = before - papers.len(), "deduplicated merged papers");
    }

    SearchResponse {
        query: query.to_string(),
        papers,
        providers,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;
    use crate::sources::mock::make_paper;

    fn ok(source: SourceType, titles: &[&str]) -> ProviderOutcome {
        let papers = titles
            .iter()
            .map(|t| make_paper(t, t, source))
            .collect();
        ProviderOutcome::success(source, Duration::from_millis(5), SourceResults::new(papers))
    }

    #[test]
    fn test_merge_orders_by_priority() {
        let outcomes = vec![
            ok(SourceType::Core, &["c1"]),
            ok(SourceType::Arxiv, &["a1", "a2"]),
            ok(SourceType::PubMed, &["p1"]),
        ];

        let response = merge("q", outcomes, false);

        let titles: Vec<&str> = response.papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a1", "a2", "p1", "c1"]);

        let names: Vec<&str> = response.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["arXiv", "PubMed", "CORE"]);
        assert_eq!(response.providers[0].count, 2);
        assert!(response.failed_providers().next().is_none());
    }

    #[test]
    fn test_failed_provider_contributes_no_papers() {
        let outcomes = vec![
            ok(SourceType::Arxiv, &["a1"]),
            ProviderOutcome::failure(SourceType::PubMed, Duration::from_millis(9), "Network error: refused"),
        ];

        let response = merge("q", outcomes, false);

        assert_eq!(response.papers.len(), 1);
        let pubmed = response.provider("PubMed").unwrap();
        assert_eq!(pubmed.count, 0);
        assert_eq!(pubmed.error, "Network error: refused");
        assert_eq!(pubmed.duration, Duration::from_millis(9));
    }

    #[test]
    fn test_blank_error_is_replaced() {
        let response = merge(
            "q",
            vec![ProviderOutcome::failure(SourceType::Core, Duration::ZERO, "  ")],
            false,
        );
        assert!(!response.providers[0].is_success());
    }

    #[test]
    fn test_all_failed_is_still_a_response() {
        let outcomes = SourceType::ALL
            .iter()
            .map(|s| ProviderOutcome::failure(*s, Duration::ZERO, "down"))
            .collect();

        let response = merge("q", outcomes, false);
        assert!(response.papers.is_empty());
        assert_eq!(response.failed_providers().count(), 3);
    }

    #[test]
    fn test_total_results_carried_through() {
        let outcome = ProviderOutcome::success(
            SourceType::PubMed,
            Duration::ZERO,
            SourceResults::new(Vec::new()).total_results(42),
        );
        let response = merge("q", vec![outcome], false);
        assert_eq!(response.providers[0].total_results, Some(42));
    }

    #[test]
    fn test_deduplicate_only_when_requested() {
        let shared = |source| {
            PaperBuilder::new("Shared Paper", "u", source)
                .doi("10.1/shared")
                .build()
        };
        let outcomes = || {
            vec![
                ProviderOutcome::success(
                    SourceType::Arxiv,
                    Duration::ZERO,
                    SourceResults::new(vec![shared(SourceType::Arxiv)]),
                ),
                ProviderOutcome::success(
                    SourceType::Core,
                    Duration::ZERO,
                    SourceResults::new(vec![shared(SourceType::Core)]),
                ),
            ]
        };

        assert_eq!(merge("q", outcomes(), false).papers.len(), 2);

        let deduped = merge("q", outcomes(), true);
        assert_eq!(deduped.papers.len(), 1);
        assert_eq!(deduped.papers[0].source, SourceType::Arxiv);
        assert_eq!(deduped.provider("CORE").unwrap().count, 1);
    }
}
