use crate::errors::{Result, TrellisError};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Atomic file operations to prevent corruption during writes
pub mod atomic_file {
    use super::*;

    /// Write JSON data to a file atomically using a temporary file + rename strategy
    pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| TrellisError::config(format!("Failed to serialize data: {e}")))?;
        write_string(path, &content)
    }

    /// Write string content to a file atomically using a temporary file + rename strategy
    pub fn write_string(path: &Path, content: &str) -> Result<()> {
        let temp_path = path.with_extension("tmp");

        fs::write(&temp_path, content)
            .map_err(|e| TrellisError::config(format!("Failed to write temporary file: {e}")))?;

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            TrellisError::config(format!("Failed to finalize file write: {e}"))
        })
    }
}
