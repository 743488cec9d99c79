// JSON decode for record tables. Three declared shapes are supported: a
// list of objects, a flat identifier->label mapping, and a flat
// code->description mapping. The caller names the interpretation; an
// unrecognized top-level shape aborts the run.

use super::{Table, Value};
use crate::error::{PipelineError, Result};
use serde_json::Value as Json;

impl Table {
    /// List-of-objects shape: each object becomes one row, the column set
    /// is the union of keys in order of first appearance, and objects
    /// missing a key get null there.
    pub fn from_json_records(bytes: &[u8], resource: &str) -> Result<Table> {
        let parsed: Json = serde_json::from_slice(bytes)?;
        let Json::Array(items) = parsed else {
            return Err(PipelineError::UnsupportedJsonShape {
                resource: resource.to_string(),
            });
        };
        records_from_objects(&items, resource)
    }

    /// Flat mapping shape interpreted as sparse entity-id -> label pairs.
    /// Only syntactically numeric identifiers survive; the id column is
    /// typed integer so it joins against numeric keys.
    pub fn from_json_label_map(
        bytes: &[u8],
        resource: &str,
        id_column: &str,
        label_column: &str,
    ) -> Result<Table> {
        let parsed: Json = serde_json::from_slice(bytes)?;
        match parsed {
            // A list of label objects is accepted as-is, less common shape
            Json::Array(items) => records_from_objects(&items, resource),
            Json::Object(map) => {
                let mut table = Table::new(vec![id_column.to_string(), label_column.to_string()]);
                for (key, value) in map {
                    let id = key.trim();
                    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
                        continue;
                    }
                    let id = match id.parse::<i64>() {
                        Ok(i) => Value::Int(i),
                        Err(_) => continue,
                    };
                    table.push_row(vec![id, json_to_value(&value)])?;
                }
                Ok(table)
            }
            _ => Err(PipelineError::UnsupportedJsonShape {
                resource: resource.to_string(),
            }),
        }
    }

    /// Flat mapping shape interpreted as code -> description pairs and
    /// normalized to two columns. A `[{"key": .., "value": ..}]` list is
    /// accepted with its columns renamed.
    pub fn from_json_code_map(
        bytes: &[u8],
        resource: &str,
        code_column: &str,
        description_column: &str,
    ) -> Result<Table> {
        let parsed: Json = serde_json::from_slice(bytes)?;
        match parsed {
            Json::Array(items) => {
                let mut table = records_from_objects(&items, resource)?;
                table.rename_column("key", code_column);
                table.rename_column("value", description_column);
                Ok(table)
            }
            Json::Object(map) => {
                let mut table = Table::new(vec![
                    code_column.to_string(),
                    description_column.to_string(),
                ]);
                for (key, value) in map {
                    table.push_row(vec![Value::infer(&key), json_to_value(&value)])?;
                }
                Ok(table)
            }
            _ => Err(PipelineError::UnsupportedJsonShape {
                resource: resource.to_string(),
            }),
        }
    }
}

fn records_from_objects(items: &[Json], resource: &str) -> Result<Table> {
    let mut columns: Vec<String> = Vec::new();
    for item in items {
        let Json::Object(map) = item else {
            return Err(PipelineError::UnsupportedJsonShape {
                resource: resource.to_string(),
            });
        };
        for key in map.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(columns.clone());
    for item in items {
        let Json::Object(map) = item else { unreachable!() };
        let row: Vec<Value> = columns
            .iter()
            .map(|c| map.get(c).map(json_to_value).unwrap_or(Value::Null))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

fn json_to_value(v: &Json) -> Value {
    match v {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::Str(s.clone()),
        // Nested structures are kept as their serialized text
        other => Value::Str(other.to_string()),
    }
}
