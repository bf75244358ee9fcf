//! Rendering of a normalized result into a display tree
//!
//! `render` is a pure function of the result: it never mutates it, never
//! fetches, and returns the same tree for the same input.

use serde::Serialize;

use crate::result::{Cell, NormalizedResult, Tabular, TermKind};

/// Marker shown for a variable left unbound in a row
pub const NULL_MARKER: &str = "null";

/// Display structure handed to a front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DisplayTree {
    /// Header plus one row per solution
    Table {
        header: Vec<String>,
        rows: Vec<Vec<DisplayCell>>,
    },
    /// Tabular result with zero rows
    NoResults {
        header: Vec<String>,
    },
    /// Raw text without table semantics
    Preformatted(String),
}

/// A rendered table cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DisplayCell {
    /// IRI shown by its local name, linking to the full IRI
    Link {
        href: String,
        label: String,
    },
    /// Literal text with optional language and datatype annotations
    Literal {
        text: String,
        lang: Option<String>,
        datatype: Option<String>,
    },
    /// Blank nodes and unrecognised kinds
    Text(String),
    /// Unbound variable
    Null,
}

impl DisplayCell {
    /// Primary text of the cell
    pub fn text(&self) -> &str {
        match self {
            DisplayCell::Link { label, .. } => label,
            DisplayCell::Literal { text, .. } => text,
            DisplayCell::Text(text) => text,
            DisplayCell::Null => NULL_MARKER,
        }
    }

    /// Supplementary metadata for a literal. The datatype wins over the language.
    pub fn annotation(&self) -> Option<String> {
        match self {
            DisplayCell::Literal {
                datatype: Some(datatype),
                ..
            } => Some(format!("Datatype: {}", datatype)),
            DisplayCell::Literal { lang: Some(lang), .. } => Some(format!("Language: {}", lang)),
            _ => None,
        }
    }
}

/// Local name of an IRI: the part after the last `#`, or after the last `/`
/// when there is no `#`.
///
/// The IRI is returned unchanged when there is no separator or the separator
/// is the final character. The `//` after the scheme is not a separator.
pub fn local_name(uri: &str) -> &str {
    let start = uri.find("://").map(|i| i + 3).unwrap_or(0);
    let tail = &uri[start..];

    match tail.rfind('#').or_else(|| tail.rfind('/')) {
        Some(i) if start + i > 0 && i + 1 < tail.len() => &tail[i + 1..],
        _ => uri,
    }
}

/// Render a result for display
pub fn render(result: &NormalizedResult) -> DisplayTree {
    match result {
        NormalizedResult::Tabular(table) => render_table(table),
        NormalizedResult::Graph { serialization, .. } => {
            DisplayTree::Preformatted(serialization.clone())
        }
        NormalizedResult::Opaque { raw } => DisplayTree::Preformatted(
            serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string()),
        ),
    }
}

fn render_table(table: &Tabular) -> DisplayTree {
    let header = table.variables.clone();
    if table.is_empty() {
        return DisplayTree::NoResults { header };
    }

    let rows = table
        .rows
        .iter()
        .map(|row| {
            table
                .variables
                .iter()
                .map(|var| row.get(var).map_or(DisplayCell::Null, render_cell))
                .collect()
        })
        .collect();

    DisplayTree::Table { header, rows }
}

fn render_cell(cell: &Cell) -> DisplayCell {
    match cell.kind {
        TermKind::Uri => DisplayCell::Link {
            href: cell.value.clone(),
            label: local_name(&cell.value).to_string(),
        },
        TermKind::Literal => DisplayCell::Literal {
            text: cell.value.clone(),
            lang: cell.lang.clone(),
            datatype: cell.datatype.as_deref().map(|dt| local_name(dt).to_string()),
        },
        TermKind::Bnode | TermKind::Unknown => DisplayCell::Text(cell.value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::normalize_json;
    use serde_json::json;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("http://ex.org/Thing#Foo"), "Foo");
        assert_eq!(local_name("http://ex.org/Thing/Bar"), "Bar");
        assert_eq!(local_name("http://ex.org/Thing/"), "http://ex.org/Thing/");
        assert_eq!(local_name("http://ex.org"), "http://ex.org");
        assert_eq!(local_name("http://ex.org/a#"), "http://ex.org/a#");
        assert_eq!(local_name("urn:isbn:0451450523"), "urn:isbn:0451450523");
        assert_eq!(local_name("http://ex.org/ns#a/b"), "a/b");
    }

    fn sample() -> NormalizedResult {
        normalize_json(&json!({
            "head": { "vars": ["s", "label", "age", "note"] },
            "results": { "bindings": [
                {
                    "s": { "type": "uri", "value": "http://ex.org/people#alice" },
                    "label": { "type": "literal", "value": "Alice", "xml:lang": "en" },
                    "age": {
                        "type": "literal",
                        "value": "67",
                        "datatype": "http://www.w3.org/2001/XMLSchema#integer"
                    },
                    "note": { "type": "literal", "value": "" }
                },
                { "s": { "type": "bnode", "value": "b0" } }
            ]}
        }))
    }

    #[test]
    fn test_render_table() {
        let tree = render(&sample());
        let (header, rows) = match tree {
            DisplayTree::Table { header, rows } => (header, rows),
            other => panic!("Expected table, got {:?}", other),
        };
        assert_eq!(header, vec!["s", "label", "age", "note"]);
        assert_eq!(rows.len(), 2);

        assert_eq!(
            rows[0][0],
            DisplayCell::Link {
                href: "http://ex.org/people#alice".to_string(),
                label: "alice".to_string(),
            }
        );
        assert_eq!(rows[0][1].text(), "Alice");
        assert_eq!(rows[0][1].annotation().as_deref(), Some("Language: en"));
        assert_eq!(rows[0][2].annotation().as_deref(), Some("Datatype: integer"));

        // An empty string stays distinguishable from an unbound variable
        assert_eq!(rows[0][3].text(), "");
        assert_eq!(rows[1][1], DisplayCell::Null);
        assert_eq!(rows[1][1].text(), NULL_MARKER);
        assert_eq!(rows[1][0], DisplayCell::Text("b0".to_string()));
    }

    #[test]
    fn test_render_is_idempotent() {
        let result = sample();
        let before = result.clone();
        assert_eq!(render(&result), render(&result));
        assert_eq!(result, before);
    }

    #[test]
    fn test_render_no_results() {
        let result = normalize_json(&json!({
            "head": { "vars": ["s", "p", "o"] },
            "results": { "bindings": [] }
        }));
        assert_eq!(
            render(&result),
            DisplayTree::NoResults {
                header: vec!["s".to_string(), "p".to_string(), "o".to_string()],
            }
        );
    }

    #[test]
    fn test_render_graph_and_opaque() {
        let graph = NormalizedResult::Graph {
            serialization: "<a> <b> <c> .".to_string(),
            media_type: "application/n-triples".to_string(),
        };
        assert_eq!(render(&graph), DisplayTree::Preformatted("<a> <b> <c> .".to_string()));

        let opaque = NormalizedResult::Opaque { raw: json!({ "boolean": true }) };
        assert_eq!(
            render(&opaque),
            DisplayTree::Preformatted("{\n  \"boolean\": true\n}".to_string())
        );
    }
}
