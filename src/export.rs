//! Export of the current result
//!
//! `json` and `csv` are built from the held result without touching the
//! network. Every other configured format re-runs the query with that
//! format's accept header and saves the response text verbatim.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::client::{RawPayload, SparqlClient, GRAPH_ACCEPT};
use crate::config::{ExportFormat, QuerySpec};
use crate::error::{PortalError, PortalResult};
use crate::result::{NormalizedResult, QueryOutcome, Tabular};

/// Format id served from the held raw payload
pub const JSON_FORMAT: &str = "json";

/// Format id served from the held tabular result
pub const CSV_FORMAT: &str = "csv";

/// Bytes ready to be saved, with their file name and media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub media_type: String,
}

/// Serializes results into the configured export formats
#[derive(Debug, Clone)]
pub struct Exporter {
    formats: Vec<ExportFormat>,
}

impl Exporter {
    /// Create an exporter over the configured formats
    pub fn new(formats: Vec<ExportFormat>) -> Self {
        Self { formats }
    }

    /// Configured formats, in configuration order
    pub fn formats(&self) -> &[ExportFormat] {
        &self.formats
    }

    /// Find a format by id
    pub fn format(&self, id: &str) -> Option<&ExportFormat> {
        self.formats.iter().find(|f| f.id == id)
    }

    /// Export the held result of `query` as `format_id`.
    ///
    /// Fails with `NoActiveResult` when nothing is held and `UnknownFormat`
    /// when the id is not configured; neither case reaches the network.
    pub async fn export_as(
        &self,
        client: &dyn SparqlClient,
        format_id: &str,
        query: &QuerySpec,
        held: Option<&QueryOutcome>,
    ) -> PortalResult<ExportArtifact> {
        let outcome = held.ok_or(PortalError::NoActiveResult)?;
        let format = self
            .format(format_id)
            .ok_or_else(|| PortalError::UnknownFormat(format_id.to_string()))?;

        let bytes = match format.id.as_str() {
            JSON_FORMAT => to_json(&outcome.payload)?.into_bytes(),
            CSV_FORMAT => match &outcome.result {
                NormalizedResult::Tabular(table) => to_csv(table)?.into_bytes(),
                other => {
                    return Err(PortalError::UnsupportedShape {
                        shape: other.shape_name(),
                        format: format.id.clone(),
                    })
                }
            },
            _ => fetch_rdf(client, format, query).await?.into_bytes(),
        };

        let artifact = ExportArtifact {
            bytes,
            filename: format!("{}.{}", query.id, format.extension),
            media_type: format.media_type.clone(),
        };
        info!(
            "Exported '{}' as {} ({} bytes)",
            query.id,
            format.id,
            artifact.bytes.len()
        );
        Ok(artifact)
    }
}

async fn fetch_rdf(
    client: &dyn SparqlClient,
    format: &ExportFormat,
    query: &QuerySpec,
) -> PortalResult<String> {
    let accept = match format.accept.as_deref() {
        Some(accept) => accept,
        None => {
            warn!("Export format '{}' has no accept header, using {}", format.id, GRAPH_ACCEPT);
            GRAPH_ACCEPT
        }
    };
    debug!("Re-fetching '{}' as {}", query.id, accept);

    let response = client.fetch(&query.sparql, accept).await?;
    Ok(response.body)
}

/// Pretty-print the held payload. A text payload is written as a JSON string.
pub fn to_json(payload: &RawPayload) -> PortalResult<String> {
    let json = match payload {
        RawPayload::Json(value) => serde_json::to_string_pretty(value)?,
        RawPayload::Text { body, .. } => serde_json::to_string_pretty(body)?,
    };
    Ok(json)
}

/// CSV with a header of the result variables and one line per row.
///
/// Absent values become empty fields. Fails with `EmptyResult` when there
/// are no rows.
pub fn to_csv(table: &Tabular) -> PortalResult<String> {
    if table.is_empty() {
        return Err(PortalError::EmptyResult);
    }

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(
        table
            .variables
            .iter()
            .map(|v| csv_field(v))
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in &table.rows {
        let fields: Vec<Cow<'_, str>> = table
            .variables
            .iter()
            .map(|var| row.get(var).map_or(Cow::Borrowed(""), |cell| csv_field(&cell.value)))
            .collect();
        lines.push(fields.join(","));
    }

    Ok(lines.join("\n"))
}

/// Quote a field iff it contains a comma, a quote or a newline
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Destination for exported artifacts
pub trait FileSink {
    /// Persist an artifact and report where it went
    fn save(&self, artifact: &ExportArtifact) -> PortalResult<PathBuf>;
}

/// Writes artifacts into a directory under their own file name
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink for `dir`; the directory is created on first save
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl FileSink for DirectorySink {
    fn save(&self, artifact: &ExportArtifact) -> PortalResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.filename);
        std::fs::write(&path, &artifact.bytes)?;
        info!("Saved {} ({})", path.display(), artifact.media_type);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::normalize_json;
    use serde_json::json;

    fn table(values: &[(&str, &str)]) -> Tabular {
        let bindings: Vec<_> = values
            .iter()
            .map(|(a, b)| {
                json!({
                    "a": { "type": "literal", "value": a },
                    "b": { "type": "uri", "value": b }
                })
            })
            .collect();
        match normalize_json(&json!({
            "head": { "vars": ["a", "b"] },
            "results": { "bindings": bindings }
        })) {
            NormalizedResult::Tabular(table) => table,
            other => panic!("Expected tabular, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_plain_values_split_back() {
        let t = table(&[("x", "http://ex.org/1"), ("y", "http://ex.org/2")]);
        let csv = to_csv(&t).unwrap();

        let parsed: Vec<Vec<&str>> = csv.split('\n').map(|l| l.split(',').collect()).collect();
        assert_eq!(
            parsed,
            vec![
                vec!["a", "b"],
                vec!["x", "http://ex.org/1"],
                vec!["y", "http://ex.org/2"],
            ]
        );
    }

    #[test]
    fn test_csv_quoting() {
        let t = table(&[("a,b", "urn:x"), ("a\"b", "urn:y"), ("line\nbreak", "urn:z")]);
        let csv = to_csv(&t).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines[1], "\"a,b\",urn:x");
        assert_eq!(lines[2], "\"a\"\"b\",urn:y");
        assert_eq!(lines[3], "\"line");
        assert_eq!(lines[4], "break\",urn:z");
    }

    #[test]
    fn test_csv_absent_value_is_empty_field() {
        let result = normalize_json(&json!({
            "head": { "vars": ["a", "b"] },
            "results": { "bindings": [ { "b": { "type": "literal", "value": "only b" } } ] }
        }));
        let csv = to_csv(result.as_tabular().unwrap()).unwrap();
        assert_eq!(csv, "a,b\n,only b");
    }

    #[test]
    fn test_csv_empty_result() {
        let t = table(&[]);
        assert!(matches!(to_csv(&t), Err(PortalError::EmptyResult)));
    }

    #[test]
    fn test_json_pretty_prints_payload() {
        let payload = RawPayload::Json(json!({ "head": { "vars": ["a"] } }));
        assert_eq!(
            to_json(&payload).unwrap(),
            "{\n  \"head\": {\n    \"vars\": [\n      \"a\"\n    ]\n  }\n}"
        );

        let text = RawPayload::Text {
            body: "<a> <b> \"c\" .".to_string(),
            media_type: "application/n-triples".to_string(),
        };
        assert_eq!(to_json(&text).unwrap(), "\"<a> <b> \\\"c\\\" .\"");
    }

    #[test]
    fn test_directory_sink() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("exports"));
        let artifact = ExportArtifact {
            bytes: b"a,b\n1,2".to_vec(),
            filename: "numbers.csv".to_string(),
            media_type: "text/csv".to_string(),
        };

        let path = sink.save(&artifact).unwrap();
        assert_eq!(path, dir.path().join("exports").join("numbers.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n1,2");
    }
}
