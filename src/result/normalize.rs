//! Classification of endpoint payloads into a `NormalizedResult`
//!
//! Order matters and the first match wins:
//! 1. an object with `results.bindings` → tabular
//! 2. an object with `head` and `results` but no bindings array → tabular, zero rows
//! 3. a string → graph
//! 4. anything else → opaque

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::model::{Cell, NormalizedResult, Row, Tabular};
use crate::client::RawPayload;

/// Media type recorded for a graph that arrived as a JSON string
const JSON_STRING_MEDIA_TYPE: &str = "text/plain";

/// Classify a payload. Never fails; unrecognised shapes become `Opaque`.
pub fn normalize(payload: &RawPayload) -> NormalizedResult {
    match payload {
        RawPayload::Text { body, media_type } => NormalizedResult::Graph {
            serialization: body.clone(),
            media_type: media_type.clone(),
        },
        RawPayload::Json(value) => normalize_json(value),
    }
}

/// Classify a parsed JSON payload
pub fn normalize_json(value: &Value) -> NormalizedResult {
    match value {
        Value::Object(object) => {
            if let Some(bindings) = bindings_of(object) {
                NormalizedResult::Tabular(build_table(object, bindings))
            } else if object.contains_key("head") && object.contains_key("results") {
                debug!("Result has head and results but no bindings, treating as empty table");
                NormalizedResult::Tabular(build_table(object, &[]))
            } else {
                NormalizedResult::Opaque { raw: value.clone() }
            }
        }
        Value::String(serialization) => NormalizedResult::Graph {
            serialization: serialization.clone(),
            media_type: JSON_STRING_MEDIA_TYPE.to_string(),
        },
        _ => NormalizedResult::Opaque { raw: value.clone() },
    }
}

fn bindings_of(object: &Map<String, Value>) -> Option<&[Value]> {
    object
        .get("results")
        .and_then(|results| results.get("bindings"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

fn build_table(object: &Map<String, Value>, bindings: &[Value]) -> Tabular {
    let variables = head_vars(object).unwrap_or_else(|| binding_keys(bindings));

    let rows = bindings
        .iter()
        .enumerate()
        .map(|(index, binding)| {
            let binding = binding.as_object();
            if binding.is_none() {
                warn!("Binding {} is not an object, all variables unbound", index);
            }
            Row::from_bindings(&variables, |var| {
                binding.and_then(|b| b.get(var)).and_then(|raw| parse_cell(raw, var, index))
            })
        })
        .collect();

    Tabular { variables, rows }
}

fn head_vars(object: &Map<String, Value>) -> Option<Vec<String>> {
    let vars = object.get("head")?.get("vars")?.as_array()?;
    Some(
        vars.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

/// Column order when the head is missing: first-seen order of binding keys
fn binding_keys(bindings: &[Value]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in bindings.iter().filter_map(Value::as_object).flat_map(Map::keys) {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.clone());
        }
    }
    keys
}

fn parse_cell(raw: &Value, var: &str, index: usize) -> Option<Cell> {
    match serde_json::from_value::<Cell>(raw.clone()) {
        Ok(cell) => Some(cell),
        Err(e) => {
            warn!("Unreadable value for ?{} in binding {}: {}", var, index, e);
            None
        }
    }
}
