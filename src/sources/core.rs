//! CORE research source implementation.
//!
//! Uses the CORE API v3 for searching open-access research papers.
//! API documentation: https://api.core.ac.uk/docs/v3

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

use crate::config::{Endpoints, CORE_API_KEY_ENV};
use crate::models::{Paper, PaperBuilder, SearchQuery, SourceResults, SourceType};
use crate::sources::{normalize_whitespace, Source, SourceError};
use crate::utils::{check_status, HttpClient};

const CORE_WORKS_URL: &str = "https://core.ac.uk/works";
/// CORE's largest page
const CORE_MAX_RESULTS: usize = 100;

/// CORE research source
///
/// Uses the CORE API for searching and retrieving research papers.
/// API requires a free API key from https://core.ac.uk/register
#[derive(Clone)]
pub struct CoreSource {
    client: HttpClient,
    api_url: String,
    api_key: Option<String>,
}

impl fmt::Debug for CoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreSource")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "********"))
            .finish()
    }
}

impl CoreSource {
    /// Create a CORE source without credentials
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            api_url: Endpoints::default().core,
            api_key: None,
        }
    }

    /// Set the bearer token; blank keys count as absent
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Use a different API base URL (mirrors, tests)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str, SourceError> {
        self.api_key
            .as_deref()
            .ok_or(SourceError::MissingCredential(CORE_API_KEY_ENV))
    }

    fn search_url(&self) -> String {
        format!("{}/search/works", self.api_url)
    }

    fn parse_response(body: &str) -> Result<SourceResults, SourceError> {
        let response: CoreResponse = serde_json::from_str(body)?;

        let papers = response
            .results
            .into_iter()
            .filter_map(CoreWork::into_paper)
            .collect();

        let results = SourceResults::new(papers);
        Ok(match response.total_hits {
            Some(total) => results.total_results(total),
            None => results,
        })
    }
}

#[async_trait]
impl Source for CoreSource {
    fn source_type(&self) -> SourceType {
        SourceType::Core
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> Result<SourceResults, SourceError> {
        // Checked before anything touches the network
        let api_key = self.api_key()?;

        let limit = query.max_results.min(CORE_MAX_RESULTS);
        let body = serde_json::json!({
            "q": query.query.trim(),
            "limit": limit,
        });

        tracing::debug!(provider = "CORE", limit, "querying CORE");

        let response = self
            .client
            .post(&self.search_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, "CORE").await?;
        let text = response.text().await?;

        Self::parse_response(&text)
    }
}

/// CORE API search response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreResponse {
    total_hits: Option<usize>,
    #[serde(default)]
    results: Vec<CoreWork>,
}

/// CORE ids are numeric in v3 but have been strings in older payloads
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoreId {
    Number(u64),
    Text(String),
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreId::Number(n) => write!(f, "{}", n),
            CoreId::Text(s) => f.write_str(s.trim()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreWork {
    id: Option<CoreId>,
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Vec<CoreAuthor>,
    doi: Option<String>,
    published_date: Option<String>,
    year_published: Option<i32>,
    #[serde(default)]
    links: Vec<CoreLink>,
    download_url: Option<String>,
    #[serde(default)]
    journals: Vec<CoreJournal>,
    #[serde(alias = "_score", alias = "relevanceScore")]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoreAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoreLink {
    #[serde(rename = "type")]
    link_type: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoreJournal {
    title: Option<String>,
}

impl CoreWork {
    fn link(&self, link_type: &str) -> Option<String> {
        self.links
            .iter()
            .filter(|l| {
                l.link_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(link_type))
            })
            .find_map(|l| non_empty(l.url.as_deref()))
    }

    fn into_paper(self) -> Option<Paper> {
        let title = self
            .title
            .as_deref()
            .map(normalize_whitespace)
            .filter(|t| !t.is_empty());

        let Some(title) = title else {
            tracing::debug!(provider = "CORE", id = ?self.id, "skipping CORE result without title");
            return None;
        };

        let id = self.id.as_ref().map(|id| id.to_string()).unwrap_or_default();
        let url = self
            .link("display")
            .or_else(|| (!id.is_empty()).then(|| format!("{}/{}", CORE_WORKS_URL, id)))
            .unwrap_or_default();
        let pdf_url = self
            .link("pdf")
            .or_else(|| self.link("download"))
            .or_else(|| non_empty(self.download_url.as_deref()));
        let published = non_empty(self.published_date.as_deref())
            .or_else(|| self.year_published.map(|y| y.to_string()));
        let journal = self
            .journals
            .first()
            .and_then(|j| non_empty(j.title.as_deref()));

        let authors = self
            .authors
            .iter()
            .filter_map(|a| non_empty(a.name.as_deref()));

        let mut builder = PaperBuilder::new(title, url, SourceType::Core)
            .authors(authors)
            .abstract_text(
                self.abstract_text
                    .as_deref()
                    .map(normalize_whitespace)
                    .unwrap_or_default(),
            )
            .relevance_score(self.score.unwrap_or(0.0));

        if let Some(doi) = non_empty(self.doi.as_deref()) {
            builder = builder.doi(doi);
        }
        if let Some(pdf_url) = pdf_url {
            builder = builder.pdf_url(pdf_url);
        }
        if let Some(date) = published {
            builder = builder.published_date(date);
        }
        if let Some(journal) = journal {
            builder = builder.journal(journal);
        }

        Some(builder.build())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}
