//! Paper model representing a research paper from any provider.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The provider where the paper was found.
///
/// Variants are declared in merge priority order: results from an earlier
/// variant always precede results from a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "arXiv")]
    Arxiv,
    #[serde(rename = "PubMed")]
    PubMed,
    #[serde(rename = "CORE")]
    Core,
}

impl SourceType {
    /// Every provider, in merge priority order
    pub const ALL: [SourceType; 3] = [SourceType::Arxiv, SourceType::PubMed, SourceType::Core];

    /// Returns the display name of the provider
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::Arxiv => "arXiv",
            SourceType::PubMed => "PubMed",
            SourceType::Core => "CORE",
        }
    }

    /// Returns the provider identifier accepted in requests
    pub fn id(&self) -> &'static str {
        match self {
            SourceType::Arxiv => "arxiv",
            SourceType::PubMed => "pubmed",
            SourceType::Core => "core",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SourceType::ALL
            .into_iter()
            .find(|source| source.id() == wanted)
            .ok_or_else(|| format!("unknown provider '{}'", s.trim()))
    }
}

/// A research paper normalized from any provider.
///
/// This is the union of the fields the providers expose rather than a strict
/// common schema: most identifiers are only set by the provider that owns
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title
    pub title: String,

    /// Author display names, in the order the provider lists them
    pub authors: Vec<String>,

    /// Abstract text (may be empty)
    pub r#abstract: String,

    /// Publication date; precision varies by provider
    pub published_date: Option<String>,

    /// Provider the paper was found in
    pub source: SourceType,

    /// Canonical landing page
    pub url: String,

    /// Direct PDF URL
    pub pdf_url: Option<String>,

    /// Digital Object Identifier
    pub doi: Option<String>,

    /// Bare arXiv identifier (no URL prefix, no version suffix)
    pub arxiv_id: Option<String>,

    /// PubMed identifier
    pub pubmed_id: Option<String>,

    /// Journal name
    pub journal: Option<String>,

    /// Provider-supplied relevance score; 0 when the provider has none
    #[serde(default)]
    pub relevance_score: f64,
}

impl Paper {
    /// Create a new paper with required fields
    pub fn new(title: String, url: String, source: SourceType) -> Self {
        Self {
            title,
            authors: Vec::new(),
            r#abstract: String::new(),
            published_date: None,
            source,
            url,
            pdf_url: None,
            doi: None,
            arxiv_id: None,
            pubmed_id: None,
            journal: None,
            relevance_score: 0.0,
        }
    }
}

/// Builder for constructing Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: SourceType) -> Self {
        Self {
            paper: Paper::new(title.into(), url.into(), source),
        }
    }

    /// Set authors
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paper.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.paper.r#abstract = abstract_text.into();
        self
    }

    /// Set publication date
    pub fn published_date(mut self, date: impl Into<String>) -> Self {
        self.paper.published_date = Some(date.into());
        self
    }

    /// Set PDF URL
    pub fn pdf_url(mut self, url: impl Into<String>) -> Self {
        self.paper.pdf_url = Some(url.into());
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.paper.doi = Some(doi.into());
        self
    }

    /// Set arXiv ID
    pub fn arxiv_id(mut self, id: impl Into<String>) -> Self {
        self.paper.arxiv_id = Some(id.into());
        self
    }

    /// Set PubMed ID
    pub fn pubmed_id(mut self, id: impl Into<String>) -> Self {
        self.paper.pubmed_id = Some(id.into());
        self
    }

    /// Set journal name
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.paper.journal = Some(journal.into());
        self
    }

    /// Set relevance score
    pub fn relevance_score(mut self, score: f64) -> Self {
        self.paper.relevance_score = score;
        self
    }

    /// Build the Paper
    pub fn build(self) -> Paper {
        self.paper
    }
}
