pub mod archive;
pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod inspect;
pub mod model;
pub mod naming;
pub mod placeholder;
pub mod source;
pub mod substitute;

use std::path::Path;

use batch::progress::{CancelToken, ProgressReporter};
use batch::sink::OutputSink;
use config::BatchConfig;
use error::DocmergeError;
use model::{BatchResult, DataTable};

/// Read a data file, choosing the backend from its extension.
pub fn load_table(path: &Path, sheet: Option<String>) -> Result<DataTable, DocmergeError> {
    let bytes = std::fs::read(path).map_err(|e| {
        DocmergeError::DataSource(format!("cannot read {}: {e}", path.display()))
    })?;
    let source = source::for_path(path, sheet);
    let table = source.read_table(&bytes)?;
    tracing::info!(
        path = %path.display(),
        backend = source.backend_name(),
        columns = table.columns.len(),
        rows = table.rows.len(),
        "loaded data source"
    );
    Ok(table)
}

/// Main API entry point: read `data_path` and `template_path` from disk and
/// generate one document per row into `sink`.
///
/// The sheet named in `config` is used for spreadsheet input.
pub fn generate_from_files(
    data_path: &Path,
    template_path: &Path,
    config: &BatchConfig,
    sink: &mut dyn OutputSink,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<BatchResult, DocmergeError> {
    let table = load_table(data_path, config.sheet.clone())?;
    let template = std::fs::read(template_path).map_err(|e| {
        DocmergeError::Template(format!("cannot read {}: {e}", template_path.display()))
    })?;
    batch::run_batch(&table, &template, config, sink, progress, cancel)
}
