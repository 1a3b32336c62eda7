//! HTTP client utilities.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// Longest slice of an error body quoted back in a [`SourceError`]
const MAX_ERROR_BODY: usize = 200;

/// Shared HTTP client with the configured timeouts and user agent.
///
/// Cloning is cheap; every clone shares one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a new HTTP client from configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Start a POST request
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }
}

/// Turn a non-2xx response into a [`SourceError`], passing successes through.
///
/// `provider` names the remote service in the error message.
pub async fn check_status(response: Response, provider: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimit);
    }

    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    let message = if body.is_empty() {
        format!("{} returned status {}", provider, status)
    } else {
        let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{} returned status {}: {}", provider, status, snippet)
    };

    Err(SourceError::Api(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_config() {
        let config = HttpConfig {
            timeout_secs: 5,
            connect_timeout_secs: 1,
            user_agent: "test-agent/1.0".to_string(),
        };
        assert!(HttpClient::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_check_status_maps_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("fine")
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/limited")
            .with_status(429)
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/broken")
            .with_status(502)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();

        let ok = client.get(&format!("{}/ok", server.url())).send().await.unwrap();
        assert!(check_status(ok, "Test").await.is_ok());

        let limited = client.get(&format!("{}/limited", server.url())).send().await.unwrap();
        assert!(matches!(
            check_status(limited, "Test").await,
            Err(SourceError::RateLimit)
        ));

        let broken = client.get(&format!("{}/broken", server.url())).send().await.unwrap();
        match check_status(broken, "Test").await {
            Err(SourceError::Api(msg)) => {
                assert!(msg.contains("502"));
                assert!(msg.contains("upstream exploded"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }
}
