//! Packing generated documents into one zip for download.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::DocmergeError;
use crate::model::OutputRecord;

/// Archive name used when the caller does not pick one.
pub const DEFAULT_ARCHIVE_NAME: &str = "generated_documents.zip";

/// Write every record's file into a deflate zip, all entries at the root.
///
/// Records whose file no longer exists are skipped with a warning. When
/// two records share a file name only the first is packed. Returns the
/// number of entries written.
pub fn write_archive<W: Write + Seek>(
    records: &[OutputRecord],
    writer: W,
) -> Result<usize, DocmergeError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut packed = HashSet::new();

    for record in records {
        if !packed.insert(record.filename.as_str()) {
            continue;
        }
        let bytes = match std::fs::read(&record.location) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    file = %record.location.display(),
                    "output file missing, left out of archive"
                );
                packed.remove(record.filename.as_str());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        zip.start_file(record.filename.as_str(), options)?;
        zip.write_all(&bytes)?;
    }

    zip.finish()?;
    tracing::info!(entries = packed.len(), "archive written");
    Ok(packed.len())
}

/// [`write_archive`] into a new file at `path`.
pub fn archive_to_path(records: &[OutputRecord], path: &Path) -> Result<usize, DocmergeError> {
    let file = File::create(path)?;
    write_archive(records, file)
}
