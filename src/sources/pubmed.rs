//! PubMed research source implementation using E-utilities API.
//!
//! A search takes two sequential calls: ESearch returns matching PMIDs as
//! JSON, then a single batched EFetch returns the full records as XML. The
//! steps are not independently recoverable: a failure in either one fails the
//! whole search.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Deserialize;

use crate::config::Endpoints;
use crate::models::{Paper, PaperBuilder, SearchQuery, SourceResults, SourceType};
use crate::sources::{normalize_whitespace, Source, SourceError};
use crate::utils::{check_status, HttpClient};

const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";
const PMC_ARTICLE_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/articles";
/// Largest id batch EFetch accepts in a single GET
const PUBMED_MAX_RESULTS: usize = 200;

/// PubMed research source
///
/// Uses NCBI E-utilities API for searching and fetching PubMed records.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: HttpClient,
    search_url: String,
    fetch_url: String,
    api_key: Option<String>,
}

impl PubMedSource {
    /// Create a new PubMed source against the public E-utilities endpoints
    pub fn new(client: HttpClient) -> Self {
        let endpoints = Endpoints::default();
        Self {
            client,
            search_url: endpoints.pubmed_search,
            fetch_url: endpoints.pubmed_fetch,
            api_key: None,
        }
    }

    /// Use different ESearch/EFetch endpoints (mirrors, tests)
    pub fn with_endpoints(mut self, search_url: impl Into<String>, fetch_url: impl Into<String>) -> Self {
        self.search_url = search_url.into();
        self.fetch_url = fetch_url.into();
        self
    }

    /// Send an NCBI API key with both requests (raises the rate limit)
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    fn encode_params(&self, mut params: Vec<(&str, String)>) -> String {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Build E-utilities search URL
    fn build_search_url(&self, query: &SearchQuery) -> String {
        let params = vec![
            ("db", "pubmed".to_string()),
            ("term", query.query.trim().to_string()),
            ("retmax", query.max_results.min(PUBMED_MAX_RESULTS).to_string()),
            ("retmode", "json".to_string()),
        ];
        format!("{}?{}", self.search_url, self.encode_params(params))
    }

    /// Build E-utilities fetch URL for specific PubMed IDs
    fn build_fetch_url(&self, ids: &[String]) -> String {
        let params = vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
        ];
        format!("{}?{}", self.fetch_url, self.encode_params(params))
    }

    /// Parse an ESearch JSON body into (PMIDs, reported hit count)
    fn parse_search_response(json: &str) -> Result<(Vec<String>, Option<usize>), SourceError> {
        #[derive(Debug, Deserialize)]
        struct ESearchEnvelope {
            esearchresult: Option<ESearchResult>,
            error: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct ESearchResult {
            count: Option<String>,
            #[serde(default)]
            idlist: Vec<String>,
            #[serde(rename = "ERROR")]
            error: Option<String>,
        }

        let envelope: ESearchEnvelope = serde_json::from_str(json)?;

        if let Some(error) = envelope.error {
            return Err(SourceError::Api(format!("PubMed search failed: {}", error)));
        }

        let result = envelope
            .esearchresult
            .ok_or_else(|| SourceError::Parse("ESearch body has no esearchresult".to_string()))?;

        if let Some(error) = result.error {
            return Err(SourceError::Api(format!("PubMed search failed: {}", error)));
        }

        let count = result.count.and_then(|c| c.trim().parse().ok());
        let ids = result
            .idlist
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        Ok((ids, count))
    }

    /// Parse an EFetch `PubmedArticleSet` document.
    ///
    /// Articles without a PMID or title are skipped; any XML error fails the
    /// whole document.
    fn parse_fetch_response(xml: &str) -> Result<Vec<Paper>, SourceError> {
        let mut reader = Reader::from_str(xml);
        let mut path: Vec<String> = Vec::new();
        let mut papers = Vec::new();
        let mut article: Option<ArticleDraft> = None;
        let mut capture: Option<Capture> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    let name = local_name(e);
                    if name == "PubmedArticle" {
                        article = Some(ArticleDraft::default());
                    } else if let Some(draft) = article.as_mut() {
                        let parent = path.last().map(String::as_str).unwrap_or("");
                        let grandparent = path
                            .len()
                            .checked_sub(2)
                            .map(|i| path[i].as_str())
                            .unwrap_or("");

                        if name == "Author" && parent == "AuthorList" {
                            draft.author = Some(AuthorDraft::default());
                        } else if capture.is_none() {
                            if let Some(field) = Field::for_element(&name, parent, grandparent) {
                                capture = Some(Capture {
                                    field,
                                    depth: path.len(),
                                    text: String::new(),
                                    attribute: field
                                        .attribute_name()
                                        .and_then(|attr| attribute(e, attr)),
                                });
                            }
                        }
                    }
                    path.push(name);
                }
                Event::Text(ref t) => {
                    if let Some(capture) = capture.as_mut() {
                        let text = t
                            .unescape()
                            .map_err(|e| SourceError::Parse(format!("PubMed fetch XML: {}", e)))?;
                        capture.text.push_str(&text);
                    }
                }
                Event::CData(ref c) => {
                    if let Some(capture) = capture.as_mut() {
                        capture.text.push_str(&String::from_utf8_lossy(c));
                    }
                }
                Event::End(_) => {
                    let name = path.pop().unwrap_or_default();

                    if capture.as_ref().is_some_and(|c| c.depth == path.len()) {
                        if let (Some(done), Some(draft)) = (capture.take(), article.as_mut()) {
                            draft.commit(done);
                        }
                    } else if name == "Author" {
                        if let Some(draft) = article.as_mut() {
                            draft.finish_author();
                        }
                    } else if name == "PubmedArticle" {
                        if let Some(paper) = article.take().and_then(ArticleDraft::into_paper) {
                            papers.push(paper);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !path.is_empty() {
            return Err(SourceError::Parse(format!(
                "PubMed fetch XML ended inside <{}>",
                path.join("/")
            )));
        }

        Ok(papers)
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Leaf elements read from a `PubmedArticle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pmid,
    Title,
    AbstractText,
    LastName,
    ForeName,
    Initials,
    CollectiveName,
    JournalTitle,
    JournalAbbreviation,
    PubYear,
    PubMonth,
    PubDay,
    MedlineDate,
    ArticleYear,
    ArticleMonth,
    ArticleDay,
    ArticleId,
    ELocationId,
}

impl Field {
    /// Identify an element by its name and its two nearest ancestors.
    ///
    /// Ancestry matters: PMIDs also appear under CommentsCorrections and
    /// article ids under ReferenceList, and those must not be picked up.
    fn for_element(name: &str, parent: &str, grandparent: &str) -> Option<Self> {
        let field = match (name, parent, grandparent) {
            ("PMID", "MedlineCitation", _) => Field::Pmid,
            ("ArticleTitle", "Article", _) => Field::Title,
            ("AbstractText", "Abstract", _) => Field::AbstractText,
            ("LastName", "Author", _) => Field::LastName,
            ("ForeName", "Author", _) => Field::ForeName,
            ("Initials", "Author", _) => Field::Initials,
            ("CollectiveName", "Author", _) => Field::CollectiveName,
            ("Title", "Journal", _) => Field::JournalTitle,
            ("ISOAbbreviation", "Journal", _) => Field::JournalAbbreviation,
            ("Year", "PubDate", "JournalIssue") => Field::PubYear,
            ("Month", "PubDate", "JournalIssue") => Field::PubMonth,
            ("Day", "PubDate", "JournalIssue") => Field::PubDay,
            ("MedlineDate", "PubDate", "JournalIssue") => Field::MedlineDate,
            ("Year", "ArticleDate", "Article") => Field::ArticleYear,
            ("Month", "ArticleDate", "Article") => Field::ArticleMonth,
            ("Day", "ArticleDate", "Article") => Field::ArticleDay,
            ("ArticleId", "ArticleIdList", "PubmedData") => Field::ArticleId,
            ("ELocationID", "Article", _) => Field::ELocationId,
            _ => return None,
        };
        Some(field)
    }

    fn attribute_name(self) -> Option<&'static str> {
        match self {
            Field::AbstractText => Some("Label"),
            Field::ArticleId => Some("IdType"),
            Field::ELocationId => Some("EIdType"),
            _ => None,
        }
    }
}

/// Text being collected for one leaf element (inline markup included)
#[derive(Debug)]
struct Capture {
    field: Field,
    depth: usize,
    text: String,
    attribute: Option<String>,
}

#[derive(Debug, Default)]
struct AuthorDraft {
    last_name: String,
    fore_name: String,
    initials: String,
    collective_name: String,
}

impl AuthorDraft {
    fn display_name(&self) -> Option<String> {
        let last = self.last_name.trim();
        let fore = self.fore_name.trim();
        let initials = self.initials.trim();

        let name = if !last.is_empty() && !fore.is_empty() {
            format!("{} {}", fore, last)
        } else if !last.is_empty() && !initials.is_empty() {
            format!("{} {}", initials, last)
        } else if !last.is_empty() {
            last.to_string()
        } else {
            normalize_whitespace(&self.collective_name)
        };

        (!name.is_empty()).then_some(name)
    }
}

/// Year/month/day components as they appear in the record
#[derive(Debug, Default)]
struct DateParts {
    year: Option<String>,
    month: Option<String>,
    day: Option<String>,
    medline: Option<String>,
}

impl DateParts {
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, depending on which components are
    /// present. A missing component truncates the date instead of being
    /// defaulted; `MedlineDate` ("2019 Nov-Dec") is used as-is without a year.
    fn render(&self) -> Option<String> {
        let year = self.year.as_deref().map(str::trim).filter(|y| !y.is_empty());

        let Some(year) = year else {
            return self
                .medline
                .as_deref()
                .map(normalize_whitespace)
                .filter(|d| !d.is_empty());
        };

        let Some(month) = self.month.as_deref().and_then(month_number) else {
            return Some(year.to_string());
        };

        match self
            .day
            .as_deref()
            .and_then(|d| d.trim().parse::<u32>().ok())
            .filter(|d| (1..=31).contains(d))
        {
            Some(day) => Some(format!("{}-{:02}-{:02}", year, month, day)),
            None => Some(format!("{}-{:02}", year, month)),
        }
    }
}

/// Month as 1-12, from either a number or an English month name/abbreviation
fn month_number(month: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];

    let month = month.trim();
    if let Ok(n) = month.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }

    let lower = month.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

/// One `PubmedArticle` under construction
#[derive(Debug, Default)]
struct ArticleDraft {
    pmid: String,
    title: String,
    abstract_sections: Vec<String>,
    authors: Vec<String>,
    author: Option<AuthorDraft>,
    journal_title: String,
    journal_abbreviation: String,
    pub_date: DateParts,
    article_date: DateParts,
    article_ids: Vec<(String, String)>,
    elocation_doi: Option<String>,
}

impl ArticleDraft {
    fn commit(&mut self, capture: Capture) {
        let Capture {
            field,
            text,
            attribute,
            ..
        } = capture;

        match field {
            Field::Pmid => self.pmid = text.trim().to_string(),
            Field::Title => self.title = normalize_whitespace(&text),
            Field::AbstractText => {
                let text = normalize_whitespace(&text);
                if text.is_empty() {
                    return;
                }
                let section = match attribute.filter(|l| !l.trim().is_empty()) {
                    Some(label) => format!("{}: {}", label.trim(), text),
                    None => text,
                };
                self.abstract_sections.push(section);
            }
            Field::LastName | Field::ForeName | Field::Initials | Field::CollectiveName => {
                if let Some(author) = self.author.as_mut() {
                    let slot = match field {
                        Field::LastName => &mut author.last_name,
                        Field::ForeName => &mut author.fore_name,
                        Field::Initials => &mut author.initials,
                        _ => &mut author.collective_name,
                    };
                    *slot = text;
                }
            }
            Field::JournalTitle => self.journal_title = normalize_whitespace(&text),
            Field::JournalAbbreviation => self.journal_abbreviation = normalize_whitespace(&text),
            Field::PubYear => self.pub_date.year = Some(text),
            Field::PubMonth => self.pub_date.month = Some(text),
            Field::PubDay => self.pub_date.day = Some(text),
            Field::MedlineDate => self.pub_date.medline = Some(text),
            Field::ArticleYear => self.article_date.year = Some(text),
            Field::ArticleMonth => self.article_date.month = Some(text),
            Field::ArticleDay => self.article_date.day = Some(text),
            Field::ArticleId => {
                if let Some(id_type) = attribute {
                    self.article_ids
                        .push((id_type.to_ascii_lowercase(), text.trim().to_string()));
                }
            }
            Field::ELocationId => {
                if attribute.is_some_and(|t| t.eq_ignore_ascii_case("doi")) {
                    let doi = text.trim().to_string();
                    if !doi.is_empty() && self.elocation_doi.is_none() {
                        self.elocation_doi = Some(doi);
                    }
                }
            }
        }
    }

    fn finish_author(&mut self) {
        if let Some(name) = self.author.take().and_then(|a| a.display_name()) {
            self.authors.push(name);
        }
    }

    fn article_id(&self, id_type: &str) -> Option<String> {
        self.article_ids
            .iter()
            .find(|(kind, value)| kind == id_type && !value.is_empty())
            .map(|(_, value)| value.clone())
    }

    fn into_paper(self) -> Option<Paper> {
        if self.pmid.is_empty() || self.title.is_empty() {
            tracing::debug!(
                pmid = %self.pmid,
                "skipping PubMed article without PMID or title"
            );
            return None;
        }

        let url = format!("{}/{}/", PUBMED_ARTICLE_URL, self.pmid);
        let doi = self.article_id("doi").or_else(|| self.elocation_doi.clone());
        let pmc = self.article_id("pmc");
        let journal = Some(self.journal_title.clone())
            .filter(|j| !j.is_empty())
            .or_else(|| Some(self.journal_abbreviation.clone()).filter(|j| !j.is_empty()));
        let published = self.pub_date.render().or_else(|| self.article_date.render());

        let mut builder = PaperBuilder::new(self.title, url, SourceType::PubMed)
            .authors(self.authors)
            .abstract_text(self.abstract_sections.join(" "))
            .pubmed_id(self.pmid);

        if let Some(doi) = doi {
            builder = builder.doi(doi);
        }
        if let Some(pmc) = pmc {
            builder = builder.pdf_url(format!("{}/{}/pdf/", PMC_ARTICLE_URL, pmc));
        }
        if let Some(journal) = journal {
            builder = builder.journal(journal);
        }
        if let Some(date) = published {
            builder = builder.published_date(date);
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn source_type(&self) -> SourceType {
        SourceType::PubMed
    }

    async fn search(&self, query: &SearchQuery) -> Result<SourceResults, SourceError> {
        let search_url = self.build_search_url(query);
        tracing::debug!(provider = "PubMed", step = "esearch", "querying PubMed");

        let response = self.client.get(&search_url).send().await?;
        let response = check_status(response, "PubMed ESearch").await?;
        let body = response.text().await?;

        let (ids, count) = Self::parse_search_response(&body)?;

        if ids.is_empty() {
            tracing::debug!(provider = "PubMed", "no PMIDs matched; skipping fetch");
            let results = SourceResults::new(Vec::new());
            return Ok(match count {
                Some(total) => results.total_results(total),
                None => results,
            });
        }

        // Fetch details for every PMID in one batch request
        let fetch_url = self.build_fetch_url(&ids);
        tracing::debug!(provider = "PubMed", step = "efetch", ids = ids.len(), "fetching PubMed records");

        let response = self.client.get(&fetch_url).send().await?;
        let response = check_status(response, "PubMed EFetch").await?;
        let xml = response.text().await?;

        let papers = Self::parse_fetch_response(&xml)?;
        let results = SourceResults::new(papers);

        Ok(match count {
            Some(total) => results.total_results(total),
            None => results,
        })
    }
}
