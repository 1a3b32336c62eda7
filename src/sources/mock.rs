//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{Paper, SearchQuery, SourceResults, SourceType};
use crate::sources::{Source, SourceError};

/// A mock source that answers on behalf of a provider with predefined papers
/// or a predefined failure, optionally after a delay.
#[derive(Debug)]
pub struct MockSource {
    source_type: SourceType,
    papers: Mutex<Vec<Paper>>,
    failure: Mutex<Option<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a mock that returns no papers
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            papers: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Papers returned by every search
    pub fn with_papers(self, papers: Vec<Paper>) -> Self {
        if let Ok(mut guard) = self.papers.lock() {
            *guard = papers;
        }
        self
    }

    /// Fail every search with an API error carrying `message`
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = Some(message.into());
        }
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of searches started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn search(&self, query: &SearchQuery) -> Result<SourceResults, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failure
            .lock()
            .map_err(|_| SourceError::Other("mock state poisoned".to_string()))?
            .clone();
        if let Some(message) = failure {
            return Err(SourceError::Api(message));
        }

        let papers = self
            .papers
            .lock()
            .map_err(|_| SourceError::Other("mock state poisoned".to_string()))?
            .iter()
            .take(query.max_results)
            .cloned()
            .collect();

        Ok(SourceResults::new(papers))
    }
}

/// Helper function to create a mock paper for testing.
pub fn make_paper(key: &str, title: &str, source: SourceType) -> Paper {
    Paper::new(
        title.to_string(),
        format!("http://example.com/{}", key),
        source,
    )
}
