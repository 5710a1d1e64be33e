use std::io::Cursor;

use calamine::{Data, Range, Reader};

use super::{unique_headers, RowSource};
use crate::error::DocmergeError;
use crate::model::{DataTable, RowRecord};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Spreadsheet backend (xlsx, xlsm, xlsb, xls, ods) built on calamine.
///
/// The first row of the sheet is the header.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetSource {
    /// Sheet to read; the first sheet when unset.
    pub sheet: Option<String>,
}

impl SpreadsheetSource {
    pub fn new(sheet: Option<String>) -> Self {
        Self { sheet }
    }
}

impl RowSource for SpreadsheetSource {
    fn read_table(&self, bytes: &[u8]) -> Result<DataTable, DocmergeError> {
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| DocmergeError::DataSource(format!("failed to open spreadsheet: {e}")))?;

        let range = match &self.sheet {
            Some(name) => workbook
                .worksheet_range(name)
                .map_err(|e| DocmergeError::DataSource(format!("sheet '{name}' not found: {e}")))?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| DocmergeError::DataSource("workbook has no sheets".into()))?
                .map_err(|e| DocmergeError::DataSource(format!("failed to read first sheet: {e}")))?,
        };

        Ok(table_from_range(&range))
    }

    fn backend_name(&self) -> &str {
        "calamine"
    }
}

fn table_from_range(range: &Range<Data>) -> DataTable {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return DataTable::default();
    };
    let columns = unique_headers(header.iter().map(cell_to_string));

    let rows = rows
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let value = cells.get(i).map(cell_to_string).unwrap_or_default();
                    (col.clone(), value)
                })
                .collect::<RowRecord>()
        })
        .collect();

    DataTable { columns, rows }
}

/// Coerce a cell to the string that ends up in the document.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_to_string(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => naive.format(DATETIME_FORMAT).to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// Integral floats (the common case for ids typed into Excel) print
/// without a fractional part.
fn float_to_string(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_to_string_drops_integral_fraction() {
        assert_eq!(float_to_string(42.0), "42");
        assert_eq!(float_to_string(-3.0), "-3");
        assert_eq!(float_to_string(2.5), "2.5");
    }

    #[test]
    fn cell_to_string_covers_scalars() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("abc".into())), "abc");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::Float(1234.0)), "1234");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }

    #[test]
    fn table_from_range_reads_header_and_rows() {
        let mut range = Range::new((0, 0), (3, 2));
        range.set_value((0, 0), Data::String("case".into()));
        range.set_value((0, 1), Data::String("client".into()));
        range.set_value((0, 2), Data::String("case".into()));
        range.set_value((1, 0), Data::Float(17.0));
        range.set_value((1, 1), Data::String("ACME".into()));
        // row 2 is left empty and skipped
        range.set_value((3, 1), Data::String("Globex".into()));

        let table = table_from_range(&range);
        assert_eq!(table.columns, vec!["case", "client", "case.1"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("case"), Some("17"));
        assert_eq!(table.rows[0].get("case.1"), Some(""));
        assert_eq!(table.rows[1].get("client"), Some("Globex"));
        assert_eq!(table.rows[1].get("case"), Some(""));
    }

    #[test]
    fn empty_range_yields_empty_table() {
        let range: Range<Data> = Range::empty();
        let table = table_from_range(&range);
        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn garbage_bytes_are_a_data_source_error() {
        let err = SpreadsheetSource::default().read_table(b"not a workbook").unwrap_err();
        assert!(matches!(err, DocmergeError::DataSource(_)));
    }
}
