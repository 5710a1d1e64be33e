pub mod json;
pub mod spreadsheet;

use std::path::Path;

use crate::error::DocmergeError;
use crate::model::DataTable;

/// Trait for tabular data backends.
pub trait RowSource: Send + Sync {
    /// Read the header and every data row, values coerced to strings.
    fn read_table(&self, bytes: &[u8]) -> Result<DataTable, DocmergeError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Pick a backend from the file extension: `.json` is read as JSON,
/// anything else as a spreadsheet.
pub fn for_path(path: &Path, sheet: Option<String>) -> Box<dyn RowSource> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Box::new(json::JsonSource)
    } else {
        Box::new(spreadsheet::SpreadsheetSource::new(sheet))
    }
}

/// Make header names unique and non-empty.
///
/// Blank headers become `Unnamed: {index}`; repeats of a name get `.1`,
/// `.2`, ... appended.
pub(crate) fn unique_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for (index, name) in raw.into_iter().enumerate() {
        let name = name.trim();
        let base = if name.is_empty() {
            format!("Unnamed: {index}")
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 0;
        while out.contains(&candidate) {
            n += 1;
            candidate = format!("{base}.{n}");
        }
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_headers_renames_blanks_and_duplicates() {
        let headers = unique_headers(
            ["id", "", "name", "id", "id", " name "]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(
            headers,
            vec!["id", "Unnamed: 1", "name", "id.1", "id.2", "name.1"]
        );
    }

    #[test]
    fn for_path_picks_backend_by_extension() {
        assert_eq!(for_path(Path::new("rows.JSON"), None).backend_name(), "json");
        assert_eq!(for_path(Path::new("rows.xlsx"), None).backend_name(), "calamine");
    }
}
