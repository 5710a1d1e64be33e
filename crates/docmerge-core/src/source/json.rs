use serde_json::Value;

use super::{unique_headers, RowSource};
use crate::error::DocmergeError;
use crate::model::{DataTable, RowRecord};

/// JSON backend: an array of objects, one object per row.
///
/// Columns are the union of every object's keys, in order of first
/// appearance. Missing keys read as empty strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSource;

impl RowSource for JsonSource {
    fn read_table(&self, bytes: &[u8]) -> Result<DataTable, DocmergeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Array(items) = value else {
            return Err(DocmergeError::DataSource(
                "expected a JSON array of row objects".into(),
            ));
        };

        let mut objects = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => objects.push(map),
                other => {
                    return Err(DocmergeError::DataSource(format!(
                        "row {} is not an object: {other}",
                        i + 1
                    )))
                }
            }
        }

        let mut keys: Vec<String> = Vec::new();
        for map in &objects {
            for key in map.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        let columns = unique_headers(keys.iter().cloned());

        let rows = objects
            .iter()
            .map(|map| {
                keys.iter()
                    .zip(&columns)
                    .map(|(key, col)| {
                        let value = map.get(key).map(value_to_string).unwrap_or_default();
                        (col.clone(), value)
                    })
                    .collect::<RowRecord>()
            })
            .collect();

        Ok(DataTable { columns, rows })
    }

    fn backend_name(&self) -> &str {
        "json"
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
