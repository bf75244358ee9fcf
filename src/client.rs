//! SparqlClient trait: the seam between the pipeline and the triple store

use async_trait::async_trait;
use tracing::warn;

use crate::error::PortalResult;

/// Accept type for SPARQL SELECT results
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Accept type for graph-shaped results shown on screen
pub const GRAPH_ACCEPT: &str = "text/turtle";

/// Query used to probe endpoint connectivity
pub const PING_QUERY: &str = "SELECT * WHERE { ?s ?p ?o } LIMIT 1";

/// Accept header for a short RDF format name, defaulting to Turtle
pub fn rdf_accept(format: &str) -> &'static str {
    match format {
        "turtle" => "text/turtle",
        "rdfxml" => "application/rdf+xml",
        "jsonld" => "application/ld+json",
        "ntriples" => "application/n-triples",
        "nquads" => "application/n-quads",
        _ => GRAPH_ACCEPT,
    }
}

/// A successful endpoint response, before interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Response body as handed to the normalizer
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Parsed JSON body (requested with a JSON accept type)
    Json(serde_json::Value),
    /// Verbatim text body, tagged with the accept type it was requested with
    Text {
        body: String,
        media_type: String,
    },
}

impl RawResponse {
    /// Interpret the body according to the accept type of the request.
    ///
    /// JSON is parsed only when the accept type mentions JSON; anything else
    /// is kept as text.
    pub fn into_payload(self, accept: &str) -> PortalResult<RawPayload> {
        if accept.contains("json") {
            Ok(RawPayload::Json(serde_json::from_str(&self.body)?))
        } else {
            Ok(RawPayload::Text {
                body: self.body,
                media_type: accept.to_string(),
            })
        }
    }
}

/// Client for a SPARQL HTTP endpoint.
///
/// Implemented by `EndpointClient` over HTTP; tests substitute in-memory
/// implementations.
#[async_trait]
pub trait SparqlClient: Send + Sync {
    /// Run a query with the given accept type and return the raw response.
    ///
    /// Non-success statuses fail with `PortalError::EndpointError`.
    async fn fetch(&self, query: &str, accept: &str) -> PortalResult<RawResponse>;

    /// Run a query and return its payload, parsed as JSON when `accept` asks for JSON
    async fn execute(&self, query: &str, accept: &str) -> PortalResult<RawPayload> {
        let response = self.fetch(query, accept).await?;
        response.into_payload(accept)
    }

    /// Check that the endpoint answers a trivial query
    async fn ping(&self) -> bool {
        match self.execute(PING_QUERY, SPARQL_RESULTS_JSON).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Endpoint connection test failed: {}", e);
                false
            }
        }
    }
}
