//! EndpointClient: HTTP client for a SPARQL endpoint
//!
//! Queries are sent as `GET <endpoint>?query=...` with the requested
//! `Accept` header. Each request is a single attempt bounded by the client
//! timeout; dropping the in-flight future cancels it.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::client::{RawResponse, SparqlClient};
use crate::error::{PortalError, PortalResult};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoint client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for a whole request, response body included
    pub timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("sparql-portal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client bound to one SPARQL endpoint
pub struct EndpointClient {
    endpoint: Url,
    http_client: Client,
    config: ClientConfig,
}

impl EndpointClient {
    /// Create a client for the given endpoint URL with default configuration
    ///
    /// # Example
    /// ```no_run
    /// # use sparql_portal::EndpointClient;
    /// let client = EndpointClient::new("http://localhost:7878/sparql").unwrap();
    /// ```
    pub fn new(endpoint: &str) -> PortalResult<Self> {
        Self::with_config(endpoint, ClientConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(endpoint: &str, config: ClientConfig) -> PortalResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            PortalError::ConfigError(format!("invalid endpoint URL '{}': {}", endpoint, e))
        })?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| PortalError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            http_client,
            config,
        })
    }

    /// The configured endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The configured timeout
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// URL a query is sent to
    pub fn request_url(&self, query: &str) -> Url {
        self.url_with(&[("query", query)])
    }

    /// Direct download URL carrying both the query and a `format` parameter
    pub fn download_url(&self, query: &str, format: &str) -> Url {
        self.url_with(&[("query", query), ("format", format)])
    }

    /// Endpoint URL with the given parameters set, replacing any of the same name
    fn url_with(&self, params: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !params.iter().any(|(name, _)| key == name))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .extend_pairs(params);
        url
    }

    async fn send(&self, url: Url, accept: &str) -> PortalResult<RawResponse> {
        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!("Response status: {}, content-type: {:?}", status, content_type);

        let body = response.text().await?;

        if !status.is_success() {
            error!("SPARQL endpoint returned {}: {}", status, body);
            return Err(PortalError::EndpointError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[async_trait]
impl SparqlClient for EndpointClient {
    async fn fetch(&self, query: &str, accept: &str) -> PortalResult<RawResponse> {
        if query.trim().is_empty() {
            return Err(PortalError::EmptyQuery);
        }

        let url = self.request_url(query);
        debug!("Fetching {} (accept: {})", self.endpoint, accept);
        debug!("Query: {}", query);

        match tokio::time::timeout(self.config.timeout, self.send(url, accept)).await {
            Ok(Ok(response)) => {
                info!("Received {} bytes from {}", response.body.len(), self.endpoint);
                Ok(response)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    "Request to {} exceeded {:?}, cancelled",
                    self.endpoint, self.config.timeout
                );
                Err(PortalError::Timeout(self.config.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_encodes_query() {
        let client = EndpointClient::new("http://localhost:7878/sparql").unwrap();
        let url = client.request_url("SELECT * WHERE { ?s ?p ?o }");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("query".to_string(), "SELECT * WHERE { ?s ?p ?o }".to_string())]
        );
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_request_url_replaces_existing_query_param() {
        let client =
            EndpointClient::new("http://localhost:7878/sparql?default-graph-uri=urn:g&query=old")
                .unwrap();
        let url = client.request_url("ASK {}");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("default-graph-uri".to_string(), "urn:g".to_string()),
                ("query".to_string(), "ASK {}".to_string()),
            ]
        );
    }

    #[test]
    fn test_download_url() {
        let client = EndpointClient::new("http://localhost:7878/sparql").unwrap();
        let url = client.download_url("DESCRIBE <urn:x>", "text/turtle");
        assert_eq!(url.query_pairs().count(), 2);
        assert!(url.query_pairs().any(|(k, v)| k == "format" && v == "text/turtle"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = EndpointClient::new("not a url");
        assert!(matches!(result, Err(PortalError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let client = EndpointClient::new("http://127.0.0.1:9/sparql").unwrap();
        let result = client.fetch("   ", "application/sparql-results+json").await;
        assert!(matches!(result, Err(PortalError::EmptyQuery)));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("sparql-portal/"));
    }
}
