use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One data row: column name to string value, in column order.
///
/// Column names are unique within a row. Every value has already been
/// coerced to a string by the row source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    fields: Vec<(String, String)>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value. An existing column keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(field) => field.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(c, _)| c == column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RowRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RowRecord::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Rows read from a data source together with its header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<RowRecord>,
}

impl DataTable {
    /// Required columns absent from the header, in the order given.
    pub fn missing_columns(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|col| !self.columns.contains(col))
            .cloned()
            .collect()
    }
}

/// A generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Zero-based index of the source row.
    pub row: usize,
    /// Final file name, extension included.
    pub filename: String,
    /// Where the sink stored the bytes.
    pub location: PathBuf,
}

/// A row that could not be turned into a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFailure {
    pub row: usize,
    pub message: String,
}

/// A placeholder found in the template with no matching column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedPlaceholder {
    pub row: usize,
    pub name: String,
}

/// Aggregate outcome of one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Number of rows in the input.
    pub total: usize,
    pub successes: Vec<OutputRecord>,
    pub failures: Vec<RowFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UnresolvedPlaceholder>,
    /// True if the batch stopped early on request.
    #[serde(default)]
    pub cancelled: bool,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// "N of M succeeded" line for the operator.
    pub fn summary(&self) -> String {
        let mut line = format!("{} of {} succeeded", self.success_count(), self.total);
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
