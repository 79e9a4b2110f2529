use std::fs;
use std::path::Path;

use serde_json::Value;

use testweave_core::DataRecord;

use crate::errors::{EvalError, Result};
use crate::model::ValidationContext;

/// Records from a JSON document: an array of objects, or an object holding
/// one under `records` or `dataRecords`.
pub fn records_from_value(value: Value) -> Result<Vec<DataRecord>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records").or_else(|| map.remove("dataRecords")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(EvalError::InvalidRecords(
                    "expected a `records` or `dataRecords` array".to_string(),
                ));
            }
        },
        _ => {
            return Err(EvalError::InvalidRecords(
                "expected an array of records".to_string(),
            ));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(EvalError::InvalidRecords(format!(
                "record {index} is not an object"
            ))),
        })
        .collect()
}

pub fn read_records(path: &Path) -> Result<Vec<DataRecord>> {
    let raw = fs::read_to_string(path)?;
    records_from_value(serde_json::from_str(&raw)?)
}

pub fn read_context(path: &Path) -> Result<ValidationContext> {
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => ValidationContext::from_map(&map),
        _ => Err(EvalError::InvalidContext(
            "context document must be an object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn records_accept_arrays_and_wrapped_arrays() {
        assert_eq!(records_from_value(json!([{ "id": 1 }])).expect("array").len(), 1);
        assert_eq!(
            records_from_value(json!({ "dataRecords": [{ "id": 1 }, { "id": 2 }] }))
                .expect("wrapped")
                .len(),
            2
        );
        let err = records_from_value(json!([{ "id": 1 }, 7])).expect_err("scalar record");
        assert!(err.to_string().contains("record 1"));
        assert!(records_from_value(json!("nope")).is_err());
    }
}
