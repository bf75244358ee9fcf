//! Local development relay
//!
//! Browsers refuse cross-origin requests to most triple stores, so during
//! local development the front end talks to this relay instead. It forwards
//! `GET /sparql?...` to the real endpoint and adds permissive CORS headers.
//! It carries no other logic.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use reqwest::{Client, Url};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::client::SPARQL_RESULTS_JSON;
use crate::error::{PortalError, PortalResult};

/// Default relay port
pub const DEFAULT_RELAY_PORT: u16 = 3001;

const RELAY_USER_AGENT: &str = concat!("sparql-portal-relay/", env!("CARGO_PKG_VERSION"));

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind address
    pub address: String,
    /// Port
    pub port: u16,
    /// Endpoint requests are forwarded to
    pub endpoint: String,
}

impl RelayConfig {
    /// Relay on the default address and port for `endpoint`
    pub fn new(endpoint: &str) -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: DEFAULT_RELAY_PORT,
            endpoint: endpoint.to_string(),
        }
    }
}

struct RelayState {
    endpoint: Url,
    http_client: Client,
}

/// Build the relay router for `endpoint`
pub fn router(endpoint: &str) -> PortalResult<Router> {
    let endpoint = Url::parse(endpoint).map_err(|e| {
        PortalError::ConfigError(format!("invalid endpoint URL '{}': {}", endpoint, e))
    })?;
    let http_client = Client::builder()
        .user_agent(RELAY_USER_AGENT)
        .build()
        .map_err(|e| PortalError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

    Ok(Router::new()
        .route("/sparql", get(sparql_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(RelayState {
            endpoint,
            http_client,
        })))
}

/// HTTP server running the relay
pub struct RelayServer {
    config: RelayConfig,
}

impl RelayServer {
    /// Create a relay server
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Bind and serve until the process stops
    pub async fn start(&self) -> PortalResult<()> {
        let app = router(&self.config.endpoint)?;

        let addr = format!("{}:{}", self.config.address, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Relay listening on http://{}", addr);
        info!("Forwarding /sparql to {}", self.config.endpoint);

        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn sparql_handler(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && *v != "*/*")
        .unwrap_or(SPARQL_RESULTS_JSON)
        .to_string();

    let mut url = state.endpoint.clone();
    url.query_pairs_mut().extend_pairs(&params);
    debug!("Relaying to {} (accept: {})", state.endpoint, accept);

    let upstream = state
        .http_client
        .get(url)
        .header(reqwest::header::ACCEPT, accept)
        .send()
        .await;

    match upstream {
        Ok(response) => relay_response(response).await,
        Err(e) => relay_failure(&e.to_string()),
    }
}

async fn relay_response(response: reqwest::Response) -> Response {
    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    info!("Endpoint answered {} ({:?})", status, content_type);

    if content_type.as_deref().is_some_and(|ct| ct.contains("html")) {
        let page = response.text().await.unwrap_or_default();
        let preview: String = page.chars().take(500).collect();
        error!("Endpoint returned an HTML page instead of results: {}", preview);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Endpoint returned an error page",
                "detail": "Check that the dataset exists and is public, and that the endpoint URL is correct.",
                "statusCode": status.as_u16(),
            })),
        )
            .into_response();
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return relay_failure(&e.to_string()),
    };

    let mut relayed = (status, body).into_response();
    if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
        relayed.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    relayed
}

fn relay_failure(message: &str) -> Response {
    error!("Relay error: {}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Proxy failed", "message": message })),
    )
        .into_response()
}
