//! Display-neutral result model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// RDF term kind of a bound value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    /// IRI
    Uri,
    /// Literal, plain or typed
    #[serde(alias = "typed-literal")]
    Literal,
    /// Blank node
    Bnode,
    /// Anything else the endpoint reports
    #[serde(other)]
    Unknown,
}

/// A single bound value, copied verbatim from the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "type")]
    pub kind: TermKind,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl Cell {
    /// IRI cell
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Uri,
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    /// Plain literal cell
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Literal,
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    /// Builder: language tag
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Builder: datatype IRI
    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }
}

/// One solution: every variable of the result, bound or absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: IndexMap<String, Option<Cell>>,
}

impl Row {
    /// Build a row over `variables`, looking each one up in `bound`
    pub fn from_bindings<F>(variables: &[String], mut bound: F) -> Self
    where
        F: FnMut(&str) -> Option<Cell>,
    {
        let cells = variables
            .iter()
            .map(|var| (var.clone(), bound(var)))
            .collect();
        Self { cells }
    }

    /// Value bound to `variable`, if any
    pub fn get(&self, variable: &str) -> Option<&Cell> {
        self.cells.get(variable).and_then(Option::as_ref)
    }

    /// Cells in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Cell>)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Number of variables in the row
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no variables
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether at least one variable is bound
    pub fn has_bound(&self) -> bool {
        self.cells.values().any(Option::is_some)
    }
}

/// Variable bindings of a SELECT result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tabular {
    /// Column order
    pub variables: Vec<String>,
    /// Rows in arrival order
    pub rows: Vec<Row>,
}

impl Tabular {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An endpoint response classified by shape
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// SELECT bindings
    Tabular(Tabular),
    /// RDF serialization, uninterpreted
    Graph {
        serialization: String,
        media_type: String,
    },
    /// Anything that fits neither shape
    Opaque {
        raw: serde_json::Value,
    },
}

impl NormalizedResult {
    /// Short name of the variant, used in messages
    pub fn shape_name(&self) -> &'static str {
        match self {
            NormalizedResult::Tabular(_) => "tabular",
            NormalizedResult::Graph { .. } => "graph",
            NormalizedResult::Opaque { .. } => "opaque",
        }
    }

    /// The bindings, when tabular
    pub fn as_tabular(&self) -> Option<&Tabular> {
        match self {
            NormalizedResult::Tabular(table) => Some(table),
            _ => None,
        }
    }

    /// Row and variable counts
    pub fn stats(&self) -> ResultStats {
        match self {
            NormalizedResult::Tabular(table) => ResultStats {
                rows: table.rows.len(),
                variables: table.variables.len(),
            },
            NormalizedResult::Graph { .. } | NormalizedResult::Opaque { .. } => {
                ResultStats::default()
            }
        }
    }
}

/// Summary counts of a result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResultStats {
    pub rows: usize,
    pub variables: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_deserialize() {
        let cell: Cell = serde_json::from_str(
            r#"{"type":"literal","value":"hallo","xml:lang":"nl"}"#,
        )
        .unwrap();
        assert_eq!(cell, Cell::literal("hallo").with_lang("nl"));

        let typed: Cell = serde_json::from_str(
            r#"{"type":"typed-literal","value":"67","datatype":"http://www.w3.org/2001/XMLSchema#integer"}"#,
        )
        .unwrap();
        assert_eq!(typed.kind, TermKind::Literal);
        assert_eq!(
            typed.datatype.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#integer")
        );

        let other: Cell = serde_json::from_str(r#"{"type":"weird","value":"x"}"#).unwrap();
        assert_eq!(other.kind, TermKind::Unknown);
    }

    #[test]
    fn test_row_absent_cells() {
        let vars = vec!["s".to_string(), "o".to_string()];
        let row = Row::from_bindings(&vars, |v| (v == "s").then(|| Cell::uri("urn:a")));
        assert_eq!(row.len(), 2);
        assert!(row.has_bound());
        assert_eq!(row.get("s"), Some(&Cell::uri("urn:a")));
        assert_eq!(row.get("o"), None);
        let names: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["s", "o"]);
    }

    #[test]
    fn test_stats() {
        let result = NormalizedResult::Graph {
            serialization: String::new(),
            media_type: "text/turtle".to_string(),
        };
        assert_eq!(result.stats(), ResultStats::default());
        assert_eq!(result.shape_name(), "graph");
        assert!(result.as_tabular().is_none());
    }
}
