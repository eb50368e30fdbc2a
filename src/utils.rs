//! Utility functions for logging, JSON error detection and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for logging response previews
//! - JSON error detection for telling truncated bodies from garbage
//! - File system validation for output locations

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (on a character boundary)
/// with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A response cut off mid-transfer fails to parse with an EOF error rather
/// than a syntax error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Ensure the directory holding `file` exists and is writable.
pub async fn ensure_parent_writable(file: &str) -> Result<(), Box<dyn Error>> {
    match Path::new(file).parent().and_then(Path::to_str) {
        Some(parent) if !parent.is_empty() => ensure_writable_dir(parent).await,
        _ => ensure_writable_dir(".").await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "ééééé";
        let result = truncate_for_log(s, 3);
        assert!(result.starts_with("é…"));
        assert!(result.contains("(+8 bytes)"));
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let err = serde_json::from_str::<serde_json::Value>(json_eof).unwrap_err();
        assert!(looks_truncated(&err));

        let garbage = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        assert!(!looks_truncated(&garbage));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_writable_dir(nested.to_str().unwrap()).await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_parent_writable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out/data.csv");
        ensure_parent_writable(file.to_str().unwrap()).await.unwrap();
        assert!(dir.path().join("out").is_dir());
    }
}
