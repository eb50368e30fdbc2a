//! Raw JSON dump of a run.
//!
//! Writes the complete [`RunResult`], every outcome with its originating
//! store, navParam and startIndex plus any upstream limit warnings, so a run
//! can be inspected or re-flattened later without hitting the API again.
//!
//! # Output Structure
//!
//! ```text
//! raw_json_dir/
//! └── 2025-05-06/
//!     ├── 08-15-02.json
//!     └── 14-00-47.json
//! ```

use super::OutputError;
use crate::models::RunResult;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a [`RunResult`] to `{raw_json_dir}/{date}/{HH-MM-SS}.json`.
///
/// Returns the path of the written file.
#[instrument(level = "info", skip_all, fields(raw_json_dir = %raw_json_dir))]
pub async fn write_run_result(
    result: &RunResult,
    raw_json_dir: &str,
    at: DateTime<Local>,
) -> Result<PathBuf, OutputError> {
    let json = serde_json::to_string(result)?;

    let full_json_dir = PathBuf::from(raw_json_dir).join(at.format("%Y-%m-%d").to_string());
    info!(dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(format!("{}.json", at.format("%H-%M-%S")));
    fs::write(&path, json).await?;
    info!(path = %path.display(), outcomes = result.len(), "Wrote raw JSON");

    Ok(path)
}
