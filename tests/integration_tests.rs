//! Integration tests for Research Fanout
//!
//! These tests drive the aggregator end-to-end against local mock servers
//! standing in for arXiv, PubMed and CORE.

use mockito::{Matcher, Mock, Server, ServerGuard};
use research_fanout::config::{ApiKeys, Config};
use research_fanout::models::{Paper, SearchRequest, SourceType};
use research_fanout::{Aggregator, SearchError};

/// Closed port: connections are refused immediately
const UNREACHABLE: &str = "http://127.0.0.1:1";

const ARXIV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>arXiv Query Results</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-03-01T00:00:00-05:00</updated>
  <entry>
    <id>http://arxiv.org/abs/2403.00001v1</id>
    <updated>2024-03-01T10:00:00Z</updated>
    <published>2024-03-01T10:00:00Z</published>
    <title>Scaling Laws for Machine Learning</title>
    <summary>We study scaling.</summary>
    <author><name>Ada Lovelace</name></author>
    <link href="http://arxiv.org/abs/2403.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2403.00001v1" rel="related" type="application/pdf"/>
  </entry>
</feed>"#;

const PUBMED_SEARCH: &str = r#"{"esearchresult": {"count": "87", "idlist": ["38000001"]}}"#;

const PUBMED_FETCH: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000001</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <PubDate><Year>2024</Year><Month>Feb</Month></PubDate>
          </JournalIssue>
          <Title>Journal of Clinical Machine Learning</Title>
        </Journal>
        <ArticleTitle>Machine learning in the clinic.</ArticleTitle>
        <Abstract><AbstractText>Clinical results.</AbstractText></Abstract>
        <AuthorList>
          <Author><LastName>Curie</LastName><ForeName>Marie</ForeName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">38000001</ArticleId>
        <ArticleId IdType="doi">10.1000/jcml.2024.1</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

const CORE_RESPONSE: &str = r#"{
  "totalHits": 310,
  "results": [
    {
      "id": 123456,
      "title": "Open machine learning repositories",
      "abstract": "Repositories.",
      "authors": [{"name": "Grace Hopper"}],
      "doi": "10.2000/core.77",
      "publishedDate": "2023-05-05",
      "downloadUrl": "https://core.ac.uk/download/123456.pdf",
      "journals": [{"title": "Repository Studies"}],
      "score": 8.75
    }
  ]
}"#;

struct Providers {
    server: ServerGuard,
    arxiv: Mock,
    esearch: Mock,
    efetch: Mock,
    core: Mock,
}

/// One mock server answering for all three providers
async fn mock_providers() -> Providers {
    let mut server = Server::new_async().await;

    let arxiv = server
        .mock("GET", "/arxiv/query")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/atom+xml")
        .with_body(ARXIV_FEED)
        .create_async()
        .await;
    let esearch = server
        .mock("GET", "/eutils/esearch.fcgi")
        .match_query(Matcher::UrlEncoded("retmode".into(), "json".into()))
        .with_body(PUBMED_SEARCH)
        .create_async()
        .await;
    let efetch = server
        .mock("GET", "/eutils/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), "38000001".into()))
        .with_body(PUBMED_FETCH)
        .create_async()
        .await;
    let core = server
        .mock("POST", "/core/search/works")
        .match_header("authorization", "Bearer integration-key")
        .with_header("content-type", "application/json")
        .with_body(CORE_RESPONSE)
        .create_async()
        .await;

    Providers {
        server,
        arxiv,
        esearch,
        efetch,
        core,
    }
}

fn config_for(base: &str, core_key: Option<&str>) -> Config {
    let mut config = Config::default();
    config.api_keys = ApiKeys {
        core: core_key.map(String::from),
        pubmed: None,
    };
    config.endpoints.arxiv = format!("{}/arxiv/query", base);
    config.endpoints.pubmed_search = format!("{}/eutils/esearch.fcgi", base);
    config.endpoints.pubmed_fetch = format!("{}/eutils/efetch.fcgi", base);
    config.endpoints.core = format!("{}/core", base);
    config.http.timeout_secs = 5;
    config.http.connect_timeout_secs = 2;
    config
}

fn aggregator(config: &Config) -> Aggregator {
    Aggregator::from_config(config).expect("aggregator")
}

fn papers_from(papers: &[Paper], source: SourceType) -> Vec<&Paper> {
    papers.iter().filter(|p| p.source == source).collect()
}

#[tokio::test]
async fn test_all_providers_succeed() {
    let providers = mock_providers().await;
    let aggregator = aggregator(&config_for(&providers.server.url(), Some("integration-key")));

    let response = aggregator
        .search(&SearchRequest::new("machine learning"))
        .await
        .unwrap();

    providers.arxiv.assert_async().await;
    providers.esearch.assert_async().await;
    providers.efetch.assert_async().await;
    providers.core.assert_async().await;

    assert_eq!(response.query, "machine learning");
    assert!(response.papers.len() >= 3);
    assert_eq!(response.providers.len(), 3);
    for provider in &response.providers {
        assert!(provider.error.is_empty(), "{}: {}", provider.name, provider.error);
        assert_eq!(provider.count, 1);
    }

    let sources: Vec<SourceType> = response.papers.iter().map(|p| p.source).collect();
    assert_eq!(sources, vec![SourceType::Arxiv, SourceType::PubMed, SourceType::Core]);

    assert_eq!(response.provider("PubMed").unwrap().total_results, Some(87));
    assert_eq!(response.provider("CORE").unwrap().total_results, Some(310));
}

#[tokio::test]
async fn test_provider_specific_fields() {
    let providers = mock_providers().await;
    let aggregator = aggregator(&config_for(&providers.server.url(), Some("integration-key")));

    let response = aggregator
        .search(&SearchRequest::new("machine learning"))
        .await
        .unwrap();

    for paper in papers_from(&response.papers, SourceType::Arxiv) {
        assert_eq!(paper.arxiv_id.as_deref(), Some("2403.00001"));
        assert!(paper.pdf_url.as_deref().is_some_and(|u| !u.is_empty()));
    }

    for paper in papers_from(&response.papers, SourceType::PubMed) {
        assert_eq!(paper.pubmed_id.as_deref(), Some("38000001"));
        assert_eq!(paper.doi.as_deref(), Some("10.1000/jcml.2024.1"));
        assert_eq!(paper.journal.as_deref(), Some("Journal of Clinical Machine Learning"));
        assert_eq!(paper.published_date.as_deref(), Some("2024-02"));
    }

    for paper in papers_from(&response.papers, SourceType::Core) {
        assert_eq!(paper.doi.as_deref(), Some("10.2000/core.77"));
        assert!(paper.pdf_url.is_some());
        assert!(paper.relevance_score > 0.0);
    }
}

#[tokio::test]
async fn test_only_arxiv_reachable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/arxiv/query")
        .match_query(Matcher::Any)
        .with_body(ARXIV_FEED)
        .create_async()
        .await;

    let mut config = config_for(UNREACHABLE, Some("integration-key"));
    config.endpoints.arxiv = format!("{}/arxiv/query", server.url());

    let response = aggregator(&config)
        .search(&SearchRequest::new("machine learning"))
        .await
        .unwrap();

    assert_eq!(response.papers.len(), 1);
    assert_eq!(response.papers[0].source, SourceType::Arxiv);
    assert!(response.provider("arXiv").unwrap().is_success());

    for name in ["PubMed", "CORE"] {
        let info = response.provider(name).unwrap();
        assert!(!info.error.is_empty(), "{} should report an error", name);
        assert_eq!(info.count, 0);
    }
}

#[tokio::test]
async fn test_every_provider_unreachable() {
    let response = aggregator(&config_for(UNREACHABLE, Some("integration-key")))
        .search(&SearchRequest::new("machine learning"))
        .await
        .unwrap();

    assert!(response.papers.is_empty());
    assert_eq!(response.providers.len(), 3);
    assert_eq!(response.failed_providers().count(), 3);
}

#[tokio::test]
async fn test_core_without_credential_makes_no_request() {
    let mut server = Server::new_async().await;
    let core = server
        .mock("POST", "/core/search/works")
        .expect(0)
        .create_async()
        .await;

    let response = aggregator(&config_for(&server.url(), None))
        .search(&SearchRequest::new("machine learning").providers(["core"]))
        .await
        .unwrap();

    core.assert_async().await;
    assert!(response.papers.is_empty());
    assert_eq!(response.providers.len(), 1);
    assert!(response.providers[0].error.contains("CORE_API_KEY"));
}

#[tokio::test]
async fn test_explicit_subset() {
    let mut server = Server::new_async().await;
    let arxiv = server
        .mock("GET", "/arxiv/query")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let _mock = server
        .mock("GET", "/eutils/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(PUBMED_SEARCH)
        .create_async()
        .await;
    let _mock = server
        .mock("GET", "/eutils/efetch.fcgi")
        .match_query(Matcher::Any)
        .with_body(PUBMED_FETCH)
        .create_async()
        .await;

    let response = aggregator(&config_for(&server.url(), None))
        .search(&SearchRequest::new("machine learning").providers(["PubMed", "pubmed"]))
        .await
        .unwrap();

    arxiv.assert_async().await;
    assert_eq!(response.providers.len(), 1);
    assert_eq!(response.providers[0].name, "PubMed");
    assert_eq!(response.papers.len(), 1);
}

#[tokio::test]
async fn test_repeated_search_is_stable() {
    let providers = mock_providers().await;
    let aggregator = aggregator(&config_for(&providers.server.url(), Some("integration-key")));
    let request = SearchRequest::new("machine learning");

    let first = aggregator.search(&request).await.unwrap();
    let second = aggregator.search(&request).await.unwrap();

    assert_eq!(first.papers, second.papers);
    let names = |r: &research_fanout::SearchResponse| {
        r.providers.iter().map(|p| p.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&first), names(&second));
}

#[tokio::test]
async fn test_invalid_requests_fail() {
    let aggregator = aggregator(&config_for(UNREACHABLE, None));

    assert!(matches!(
        aggregator.search(&SearchRequest::new(" \t ")).await,
        Err(SearchError::EmptyQuery)
    ));
    assert!(matches!(
        aggregator
            .search(&SearchRequest::new("q").providers(["arxiv", "scholar"]))
            .await,
        Err(SearchError::UnknownProvider(name)) if name == "scholar"
    ));
}

#[tokio::test]
async fn test_max_results_is_per_provider() {
    let mut server = Server::new_async().await;
    let arxiv = server
        .mock("GET", "/arxiv/query")
        .match_query(Matcher::UrlEncoded("max_results".into(), "3".into()))
        .with_body(ARXIV_FEED)
        .create_async()
        .await;
    let esearch = server
        .mock("GET", "/eutils/esearch.fcgi")
        .match_query(Matcher::UrlEncoded("retmax".into(), "3".into()))
        .with_body(r#"{"esearchresult": {"count": "0", "idlist": []}}"#)
        .create_async()
        .await;

    let response = aggregator(&config_for(&server.url(), None))
        .search(
            &SearchRequest::new("machine learning")
                .providers(["arxiv", "pubmed"])
                .max_results(3),
        )
        .await
        .unwrap();

    arxiv.assert_async().await;
    esearch.assert_async().await;
    assert!(response.failed_providers().next().is_none());
}

#[tokio::test]
async fn test_deduplicate_across_providers() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/eutils/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(PUBMED_SEARCH)
        .create_async()
        .await;
    let _mock = server
        .mock("GET", "/eutils/efetch.fcgi")
        .match_query(Matcher::Any)
        .with_body(PUBMED_FETCH)
        .create_async()
        .await;
    // CORE indexes the same article under the same DOI
    let _mock = server
        .mock("POST", "/core/search/works")
        .with_body(
            r#"{"totalHits": 1, "results": [{"id": 9, "title": "Machine Learning in the Clinic",
                "doi": "10.1000/JCML.2024.1", "score": 1.5}]}"#,
        )
        .create_async()
        .await;

    let aggregator = aggregator(&config_for(&server.url(), Some("integration-key")));
    let request = SearchRequest::new("machine learning").providers(["pubmed", "core"]);

    let plain = aggregator.search(&request).await.unwrap();
    assert_eq!(plain.papers.len(), 2);

    let deduped = aggregator.search(&request.clone().deduplicate(true)).await.unwrap();
    assert_eq!(deduped.papers.len(), 1);
    assert_eq!(deduped.papers[0].source, SourceType::PubMed);
    assert_eq!(deduped.provider("CORE").unwrap().count, 1);
}

#[tokio::test]
async fn test_response_serializes_provider_diagnostics() {
    let providers = mock_providers().await;
    let aggregator = aggregator(&config_for(&providers.server.url(), None));

    let response = aggregator
        .search(&SearchRequest::new("machine learning"))
        .await
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();

    let entries = json["providers"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["name"], "arXiv");
    assert!(entries[0]["duration_ms"].is_u64());
    assert_eq!(entries[2]["name"], "CORE");
    assert!(entries[2]["error"].as_str().unwrap().contains("CORE_API_KEY"));
    assert_eq!(json["papers"][0]["source"], "arXiv");
}
