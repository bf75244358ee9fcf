//! SPARQL Portal
//!
//! Lets a user pick a predefined SPARQL query, run it against a fixed
//! triple-store endpoint, look at the result and export it.
//!
//! # Pipeline
//!
//! ```text
//! query text ─▶ SparqlClient ─▶ RawPayload ─▶ normalize ─▶ NormalizedResult
//!                                                              ├─▶ render  ─▶ DisplayTree
//!                                                              └─▶ Exporter ─▶ ExportArtifact
//! ```
//!
//! - **`client` / `endpoint`**: content-negotiated GET against the endpoint,
//!   30 second timeout, one error taxonomy
//! - **`result`**: classification into tabular bindings, an RDF graph
//!   serialization, or an opaque payload
//! - **`render`**: display tree with per-cell term annotations
//! - **`export`**: JSON and CSV from the held result, RDF formats by re-fetch
//! - **`session`**: selected query and displayed result, with stale-response
//!   protection
//! - **`relay`**: CORS relay for local development
//!
//! # Example
//!
//! ```rust,no_run
//! use sparql_portal::{ClientConfig, Execution, Portal, PortalConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PortalConfig::from_file("config.json")?;
//!     let portal = Portal::from_config(config, ClientConfig::default())?;
//!
//!     portal.select_query("all-rules").await?;
//!     if let Execution::Completed(report) = portal.execute().await? {
//!         println!("{} rows in {:?}", report.stats.rows, report.elapsed);
//!     }
//!
//!     let csv = portal.export("csv").await?;
//!     println!("{} ({} bytes)", csv.filename, csv.bytes.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod export;
pub mod relay;
pub mod render;
pub mod result;
pub mod session;

pub use client::{rdf_accept, RawPayload, RawResponse, SparqlClient, SPARQL_RESULTS_JSON};
pub use config::{ExpectedShape, ExportFormat, Organization, PortalConfig, QuerySpec, TripleStore};
pub use endpoint::{ClientConfig, EndpointClient, DEFAULT_TIMEOUT};
pub use error::{PortalError, PortalResult};
pub use export::{to_csv, to_json, DirectorySink, ExportArtifact, Exporter, FileSink};
pub use relay::{RelayConfig, RelayServer};
pub use render::{local_name, render, DisplayCell, DisplayTree};
pub use result::{
    normalize, normalize_json, Cell, NormalizedResult, QueryOutcome, ResultStats, Row, Tabular,
    TermKind,
};
pub use session::{
    Execution, ExecutionReport, LoadingGuard, LoadingIndicator, LoadingState, Portal, Session,
    Ticket,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
