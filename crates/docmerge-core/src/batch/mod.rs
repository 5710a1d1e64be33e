pub mod progress;
pub mod sink;

use crate::config::{BatchConfig, MissingPlaceholderPolicy};
use crate::document::docx::DocxPackage;
use crate::error::DocmergeError;
use crate::model::{
    BatchResult, DataTable, OutputRecord, RowFailure, RowRecord, UnresolvedPlaceholder,
};
use crate::naming::{synthesize_stem, NameRegistry};
use crate::substitute::{self, Replacements, WalkReport};
use progress::{CancelToken, ProgressReporter};
use sink::OutputSink;

/// One row's finished document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub report: WalkReport,
}

/// Render one row: fresh parse of `template`, substitution, serialization.
///
/// With [`MissingPlaceholderPolicy::Fail`] a template placeholder the row
/// has no column for is an error; otherwise it is left in the text.
pub fn process_document(
    template: &[u8],
    row: &RowRecord,
    policy: MissingPlaceholderPolicy,
) -> Result<RenderedDocument, DocmergeError> {
    let mut package = DocxPackage::open(template)?;
    let values = Replacements::from_row(row)?;
    let report = substitute::apply(package.document_mut(), &values);
    tracing::debug!(
        visited = report.blocks_visited,
        rewritten = report.blocks_rewritten,
        unresolved = report.unresolved.len(),
        "substituted document"
    );

    if policy == MissingPlaceholderPolicy::Fail && !report.unresolved.is_empty() {
        return Err(DocmergeError::UnresolvedPlaceholders(
            report.unresolved.iter().cloned().collect(),
        ));
    }

    let bytes = package.to_bytes()?;
    Ok(RenderedDocument { bytes, report })
}

/// Generate one document per row of `table`.
///
/// Missing required columns abort before any row is touched. After that a
/// failing row is recorded in [`BatchResult::failures`] and the batch moves
/// on. `cancel` is checked before each row.
pub fn run_batch(
    table: &DataTable,
    template: &[u8],
    config: &BatchConfig,
    sink: &mut dyn OutputSink,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<BatchResult, DocmergeError> {
    let missing = table.missing_columns(&config.required_columns);
    if !missing.is_empty() {
        return Err(DocmergeError::MissingColumns(missing));
    }

    let total = table.rows.len();
    let mut result = BatchResult {
        total,
        ..Default::default()
    };
    let mut names = NameRegistry::new(config.collisions);
    tracing::info!(rows = total, "starting batch");

    for (index, row) in table.rows.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(done = index, total, "batch cancelled");
            result.cancelled = true;
            break;
        }

        let status = match process_row(index, row, template, config, &mut names, sink) {
            Ok((record, warnings)) => {
                let status = format!("generated {}", record.filename);
                result.successes.push(record);
                result.warnings.extend(warnings);
                status
            }
            Err(e) => {
                let message = e.to_string();
                progress.on_error(index, &message);
                result.failures.push(RowFailure {
                    row: index,
                    message,
                });
                format!("row {} failed", index + 1)
            }
        };
        progress.on_progress(index + 1, total, &status);
    }

    tracing::info!(
        succeeded = result.success_count(),
        failed = result.failure_count(),
        total,
        "batch finished"
    );
    Ok(result)
}

/// One row end to end. The file name and the warnings only count once
/// the sink has accepted the document.
fn process_row(
    index: usize,
    row: &RowRecord,
    template: &[u8],
    config: &BatchConfig,
    names: &mut NameRegistry,
    sink: &mut dyn OutputSink,
) -> Result<(OutputRecord, Vec<UnresolvedPlaceholder>), DocmergeError> {
    let generated_at = chrono::Local::now().naive_local();
    let stem = synthesize_stem(&config.filename, row, generated_at)?;
    let rendered = process_document(template, row, config.missing_placeholders)?;

    let claim = names.propose(&stem);
    let filename = claim.filename();
    let location = sink.write(&filename, &rendered.bytes)?;
    names.commit(&claim);
    tracing::info!(row = index + 1, file = %filename, "generated document");

    let mut warnings = Vec::new();
    if config.missing_placeholders == MissingPlaceholderPolicy::Warn {
        for name in &rendered.report.unresolved {
            tracing::warn!(row = index + 1, placeholder = %name, "unresolved placeholder");
            warnings.push(UnresolvedPlaceholder {
                row: index,
                name: name.clone(),
            });
        }
    }

    let record = OutputRecord {
        row: index,
        filename,
        location,
    };
    Ok((record, warnings))
}
