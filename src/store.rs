//! Persisting a [`ResultSet`] as a single JSON document.
//!
//! The file is a single slot: every save replaces the whole document. Writes
//! go to a temporary file in the destination directory which is then renamed
//! over the target, so readers see either the old document or the new one,
//! never a truncated mix. Concurrent writers race; the last rename wins.

use crate::error::ResumeError;
use crate::output::ResultSet;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Write `results` to `path` as pretty-printed UTF-8 JSON, atomically.
///
/// Parent directories are created as needed.
pub fn save_results(path: impl AsRef<Path>, results: &ResultSet) -> Result<(), ResumeError> {
    let path = path.as_ref();
    let write_err = |source: std::io::Error| ResumeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let json = serde_json::to_string_pretty(results)
        .map_err(|e| ResumeError::Internal(format!("Failed to serialise results: {e}")))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".results-")
        .suffix(".json.tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.write_all(b"\n").map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Saved {} records to {}", results.len(), path.display());
    Ok(())
}

/// Read a previously saved [`ResultSet`].
///
/// A missing or empty file yields an empty set.
pub fn load_results(path: impl AsRef<Path>) -> Result<ResultSet, ResumeError> {
    let path = path.as_ref();
    let read_err = |detail: String| ResumeError::OutputReadFailed {
        path: path.to_path_buf(),
        detail,
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No results file at {}, starting empty", path.display());
            return Ok(ResultSet::new());
        }
        Err(e) => return Err(read_err(e.to_string())),
    };

    if content.trim().is_empty() {
        return Ok(ResultSet::new());
    }

    serde_json::from_str(&content).map_err(|e| read_err(e.to_string()))
}
