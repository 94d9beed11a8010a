use std::fs;
use std::path::Path;

use crate::error::{Result, ScrapeError};

/// Create `path` and any missing parents; an existing directory is not an error.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| ScrapeError::io("Failed to create directory", path, e))
}

/// Write `bytes` to `path` through a sibling temp file and a rename, replacing any
/// previous file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!("{}.tmp", file_name));

    fs::write(&temp, bytes).map_err(|e| ScrapeError::io("Failed to write temp file", &temp, e))?;
    fs::rename(&temp, path).map_err(|e| ScrapeError::io("Failed to rename temp file", path, e))
}
