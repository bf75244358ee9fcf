//! Error types for the SPARQL portal

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the query pipeline and its collaborators
#[derive(Error, Debug)]
pub enum PortalError {
    /// The request did not complete within the client timeout
    #[error("Query timeout - request took longer than {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// The endpoint answered with a non-success status
    #[error("SPARQL query failed ({status}): {body}")]
    EndpointError {
        status: u16,
        body: String,
    },

    /// Network or DNS failure before a response was received
    #[error("Transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    /// The held result cannot be exported in the requested format
    #[error("Cannot export a {shape} result as {format}")]
    UnsupportedShape {
        shape: &'static str,
        format: String,
    },

    /// The held tabular result has no rows
    #[error("No results to export")]
    EmptyResult,

    /// No export format is configured under this id
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    /// Export requested before any result was obtained
    #[error("No active result to export")]
    NoActiveResult,

    /// Query text is empty
    #[error("Query text is empty")]
    EmptyQuery,

    /// No query is configured under this id
    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    /// Execution requested with no query selected
    #[error("No query selected")]
    NoActiveQuery,

    /// Configuration could not be used
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type PortalResult<T> = Result<T, PortalError>;
