//! arXiv research source implementation.

use async_trait::async_trait;
use feed_rs::parser;
use regex::Regex;
use std::sync::OnceLock;

use crate::config::Endpoints;
use crate::models::{Paper, PaperBuilder, SearchQuery, SourceResults, SourceType};
use crate::sources::{normalize_whitespace, Source, SourceError};
use crate::utils::{check_status, HttpClient};

/// Base URL for arXiv abstract pages
const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";
/// Base URL for arXiv PDFs
const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";
/// Largest page the query API serves in one request
const ARXIV_MAX_RESULTS: usize = 2000;

fn version_suffix() -> &'static Regex {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION.get_or_init(|| Regex::new(r"v\d+$").expect("valid regex"))
}

/// arXiv research source
///
/// Issues one unauthenticated query per search and reads the Atom feed it
/// returns.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: HttpClient,
    api_url: String,
}

impl ArxivSource {
    /// Create a new arXiv source against the public endpoint
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            api_url: Endpoints::default().arxiv,
        }
    }

    /// Point the source at a different query endpoint (mirrors, tests)
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Parse an arXiv ID from various formats
    ///
    /// Handles formats like:
    /// - "2301.12345"
    /// - "2301.12345v1" (version is stripped)
    /// - "arxiv:2301.12345"
    /// - "http://arxiv.org/abs/2301.12345v1"
    /// - "http://arxiv.org/abs/hep-th/9901001v2" (old-style IDs keep their archive)
    pub fn parse_id(id: &str) -> Result<String, SourceError> {
        let id = id.trim();
        let lower = id.to_ascii_lowercase();

        let bare = if let Some(pos) = lower.find("/abs/") {
            &id[pos + "/abs/".len()..]
        } else if let Some(pos) = lower.find("/pdf/") {
            &id[pos + "/pdf/".len()..]
        } else if lower.starts_with("arxiv:") {
            &id["arxiv:".len()..]
        } else {
            id
        };

        let bare = bare.trim_end_matches('/');
        let bare = bare.strip_suffix(".pdf").unwrap_or(bare);
        let bare = version_suffix().replace(bare, "");

        if bare.is_empty() {
            return Err(SourceError::InvalidRequest("Empty arXiv ID".to_string()));
        }

        Ok(bare.into_owned())
    }

    /// Build the query endpoint URL for a search
    fn build_search_url(&self, query: &SearchQuery) -> String {
        let search_query = format!("all:{}", query.query.trim());
        format!(
            "{}?search_query={}&start=0&max_results={}&sortBy=relevance&sortOrder=descending",
            self.api_url,
            urlencoding::encode(&search_query),
            query.max_results.min(ARXIV_MAX_RESULTS)
        )
    }

    /// Parse an arXiv Atom feed. Any malformed entry fails the whole feed.
    fn parse_feed(bytes: &[u8]) -> Result<Vec<Paper>, SourceError> {
        let feed = parser::parse(bytes)
            .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))?;

        feed.entries.iter().map(Self::parse_entry).collect()
    }

    /// Parse arXiv Atom feed entry into Paper
    fn parse_entry(entry: &feed_rs::model::Entry) -> Result<Paper, SourceError> {
        if entry.id.trim().is_empty() {
            return Err(SourceError::Parse("Entry is missing its id".to_string()));
        }
        let arxiv_id = Self::parse_id(&entry.id)
            .map_err(|_| SourceError::Parse(format!("Unusable entry id '{}'", entry.id)))?;

        let title = entry
            .title
            .as_ref()
            .map(|t| normalize_whitespace(&t.content))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SourceError::Parse(format!("Entry {} has no title", arxiv_id)))?;

        let authors = entry
            .authors
            .iter()
            .map(|a| normalize_whitespace(&a.name))
            .filter(|name| !name.is_empty());

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| normalize_whitespace(&s.content))
            .unwrap_or_default();

        let url = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .map(|l| l.href.clone())
            .unwrap_or_else(|| format!("{}/{}", ARXIV_ABS_URL, arxiv_id));

        let pdf_url = entry
            .links
            .iter()
            .find(|l| {
                l.rel.as_deref() == Some("related")
                    && l.media_type.as_deref() == Some("application/pdf")
            })
            .or_else(|| entry.links.iter().find(|l| l.title.as_deref() == Some("pdf")))
            .map(|l| l.href.clone())
            .unwrap_or_else(|| format!("{}/{}", ARXIV_PDF_URL, arxiv_id));

        let mut builder = PaperBuilder::new(title, url, SourceType::Arxiv)
            .authors(authors)
            .abstract_text(abstract_text)
            .pdf_url(pdf_url)
            .arxiv_id(arxiv_id);

        if let Some(published) = entry.published.or(entry.updated) {
            builder = builder.published_date(published.to_rfc3339());
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn source_type(&self) -> SourceType {
        SourceType::Arxiv
    }

    async fn search(&self, query: &SearchQuery) -> Result<SourceResults, SourceError> {
        let url = self.build_search_url(query);
        tracing::debug!(provider = "arXiv", %url, "querying arXiv");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/atom+xml")
            .send()
            .await?;
        let response = check_status(response, "arXiv API").await?;
        let bytes = response.bytes().await?;

        let papers = Self::parse_feed(bytes.as_ref())?;
        Ok(SourceResults::new(papers))
    }
}
