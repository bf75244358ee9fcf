//! Query results
//!
//! An endpoint payload is classified once into a [`NormalizedResult`]; the
//! renderer and the exporter both work from that value. The raw payload is
//! kept next to it in a [`QueryOutcome`] because the JSON export writes the
//! payload exactly as received.

mod model;
mod normalize;

pub use model::{Cell, NormalizedResult, ResultStats, Row, Tabular, TermKind};
pub use normalize::{normalize, normalize_json};

use crate::client::RawPayload;

/// The result of one query execution: raw payload plus its classification
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub payload: RawPayload,
    pub result: NormalizedResult,
}

impl QueryOutcome {
    /// Classify a payload and keep both
    pub fn from_payload(payload: RawPayload) -> Self {
        let result = normalize(&payload);
        Self { payload, result }
    }

    /// Row and variable counts
    pub fn stats(&self) -> ResultStats {
        self.result.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_keeps_payload() {
        let raw = json!({
            "head": { "vars": ["n"] },
            "results": { "bindings": [ { "n": { "type": "literal", "value": "1" } } ] }
        });
        let outcome = QueryOutcome::from_payload(RawPayload::Json(raw.clone()));
        assert_eq!(outcome.payload, RawPayload::Json(raw));
        assert_eq!(outcome.stats(), ResultStats { rows: 1, variables: 1 });
    }
}
