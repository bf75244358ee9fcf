//! In-process SPARQL endpoint used by the integration tests
//!
//! Behaviour is steered by markers in the query text:
//! `FAIL` → 400, `HTML` → an HTML page, `SLOW` → answers after 1.5 s,
//! `EMPTY` → zero bindings. The SPARQL JSON accept type gets SELECT results,
//! anything else gets an N-Triples body prefixed with the accept type.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const RDF_BODY: &str = "<http://ex.org/alice> <http://xmlns.com/foaf/0.1/name> \"Alice\" .";

#[derive(Default)]
pub struct MockState {
    hits: AtomicUsize,
    accepts: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
}

pub struct MockEndpoint {
    pub url: String,
    state: Arc<MockState>,
}

impl MockEndpoint {
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn accepts(&self) -> Vec<String> {
        self.state.accepts.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().unwrap().clone()
    }
}

pub fn select_results() -> serde_json::Value {
    json!({
        "head": { "vars": ["person", "name", "age"] },
        "results": { "bindings": [
            {
                "person": { "type": "uri", "value": "http://ex.org/people#alice" },
                "name": { "type": "literal", "value": "Alice", "xml:lang": "en" },
                "age": {
                    "type": "literal",
                    "value": "67",
                    "datatype": "http://www.w3.org/2001/XMLSchema#integer"
                }
            },
            {
                "person": { "type": "uri", "value": "http://ex.org/people#bob" },
                "name": { "type": "literal", "value": "Bob, Jr." }
            }
        ]}
    })
}

pub fn empty_results() -> serde_json::Value {
    json!({
        "head": { "vars": ["s", "p", "o"] },
        "results": { "bindings": [] }
    })
}

async fn sparql(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let query = params.get("query").cloned().unwrap_or_default();
    state.accepts.lock().unwrap().push(accept.clone());
    state.queries.lock().unwrap().push(query.clone());

    if query.contains("SLOW") {
        tokio::time::sleep(Duration::from_millis(1500)).await;
    }
    if query.contains("FAIL") {
        return (StatusCode::BAD_REQUEST, "Parse error: unexpected token").into_response();
    }
    if query.contains("HTML") {
        return (
            [(header::CONTENT_TYPE, "text/html")],
            "<html><body>Dataset not found</body></html>",
        )
            .into_response();
    }

    if accept.contains("sparql-results+json") {
        let body = if query.contains("EMPTY") {
            empty_results()
        } else {
            select_results()
        };
        return (
            [(header::CONTENT_TYPE, "application/sparql-results+json")],
            body.to_string(),
        )
            .into_response();
    }

    (
        [(header::CONTENT_TYPE, accept.clone())],
        format!("# {}\n{}", accept, RDF_BODY),
    )
        .into_response()
}

pub async fn spawn_endpoint() -> MockEndpoint {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/sparql", get(sparql))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockEndpoint {
        url: format!("http://{}/sparql", addr),
        state,
    }
}

/// An endpoint URL nothing listens on
pub async fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/sparql", addr)
}
