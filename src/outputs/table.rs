//! CSV persistence of flattened rows.
//!
//! Rows are appended to a single file across runs. The header line is written
//! only when the file is new or empty.

use super::OutputError;
use super::rows::CatalogRow;
use std::fs::OpenOptions;
use tracing::{info, instrument};

/// Append `rows` to the CSV file at `path`, creating it if needed.
///
/// Returns the number of rows written.
#[instrument(level = "info", skip_all, fields(%path, rows = rows.len()))]
pub fn append_rows(path: &str, rows: &[CatalogRow]) -> Result<usize, OutputError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_empty)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(header = is_empty, "Appended rows to CSV");
    Ok(rows.len())
}
