//! Portal configuration
//!
//! Loaded once at startup from the same `config.json` shape the portal has
//! always used: organization metadata, the triple store location, the query
//! catalogue and the export formats. Entries are not validated beyond
//! deserialization; a malformed entry fails when it is first used.

use crate::client::{rdf_accept, GRAPH_ACCEPT, SPARQL_RESULTS_JSON};
use crate::error::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Organization shown in the portal header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
}

/// Location of the triple store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripleStore {
    /// SPARQL endpoint URL
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
}

impl TripleStore {
    /// `account/dataset`, when both are configured
    pub fn dataset_path(&self) -> Option<String> {
        match (&self.account, &self.dataset) {
            (Some(account), Some(dataset)) => Some(format!("{}/{}", account, dataset)),
            _ => None,
        }
    }
}

/// Shape a query is expected to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedShape {
    /// SELECT-style variable bindings
    #[default]
    Tabular,
    /// CONSTRUCT/DESCRIBE-style RDF graph
    Graph,
}

impl ExpectedShape {
    /// Accept type used when executing a query of this shape for display
    pub fn accept(&self) -> &'static str {
        match self {
            ExpectedShape::Tabular => SPARQL_RESULTS_JSON,
            ExpectedShape::Graph => GRAPH_ACCEPT,
        }
    }
}

/// A predefined query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Query text sent to the endpoint
    pub sparql: String,
    #[serde(default)]
    pub expected_shape: ExpectedShape,
}

impl QuerySpec {
    /// Create a tabular query with the given id and text
    pub fn new(id: impl Into<String>, sparql: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            category: String::new(),
            sparql: sparql.into(),
            expected_shape: ExpectedShape::Tabular,
        }
    }

    /// Builder: set the expected shape
    pub fn with_shape(mut self, shape: ExpectedShape) -> Self {
        self.expected_shape = shape;
        self
    }
}

/// An export format offered for the current result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFormat {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Accept header for a re-fetch; `None` for formats built from the held result
    #[serde(default)]
    pub accept: Option<String>,
    pub media_type: String,
    pub extension: String,
}

impl ExportFormat {
    /// Create an export format
    pub fn new(
        id: &str,
        accept: Option<&str>,
        media_type: &str,
        extension: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            accept: accept.map(str::to_string),
            media_type: media_type.to_string(),
            extension: extension.to_string(),
        }
    }

    /// Formats offered when the configuration does not list any
    pub fn defaults() -> Vec<ExportFormat> {
        let rdf = |id: &str, media_type: &str, extension: &str| {
            ExportFormat::new(id, Some(rdf_accept(id)), media_type, extension)
        };
        vec![
            ExportFormat::new("json", None, "application/json", "json"),
            ExportFormat::new("csv", None, "text/csv;charset=utf-8", "csv"),
            rdf("turtle", "text/turtle", "ttl"),
            rdf("rdfxml", "application/rdf+xml", "rdf"),
            rdf("jsonld", "application/ld+json", "jsonld"),
            rdf("ntriples", "application/n-triples", "nt"),
            rdf("nquads", "application/n-quads", "nq"),
        ]
    }
}

/// Top-level portal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalConfig {
    #[serde(default)]
    pub organization: Organization,
    #[serde(rename = "triplydb", alias = "tripleStore")]
    pub triple_store: TripleStore,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
    #[serde(default = "ExportFormat::defaults")]
    pub export_formats: Vec<ExportFormat>,
}

impl PortalConfig {
    /// Minimal configuration for an endpoint, with the default export formats
    pub fn new(endpoint: &str) -> Self {
        Self {
            organization: Organization::default(),
            triple_store: TripleStore {
                endpoint: endpoint.to_string(),
                account: None,
                dataset: None,
            },
            queries: Vec::new(),
            export_formats: ExportFormat::defaults(),
        }
    }

    /// Parse a JSON configuration document
    pub fn from_json_str(input: &str) -> PortalResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse a YAML configuration document
    pub fn from_yaml_str(input: &str) -> PortalResult<Self> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Load a configuration file; `.yaml`/`.yml` are read as YAML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> PortalResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PortalError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!("Loading configuration from {:?}", path);

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// SPARQL endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.triple_store.endpoint
    }

    /// Find a query by id
    pub fn query(&self, id: &str) -> Option<&QuerySpec> {
        self.queries.iter().find(|q| q.id == id)
    }

    /// Find an export format by id
    pub fn export_format(&self, id: &str) -> Option<&ExportFormat> {
        self.export_formats.iter().find(|f| f.id == id)
    }
}
