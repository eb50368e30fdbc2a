//! Output generation: row flattening, CSV persistence and raw JSON dumps.
//!
//! # Submodules
//!
//! - [`rows`]: Turns a `RunResult` into merged product/availability rows
//! - [`table`]: Appends rows to the output CSV
//! - [`json`]: Writes the whole `RunResult` as JSON for later inspection

use thiserror::Error;

pub mod json;
pub mod rows;
pub mod table;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
