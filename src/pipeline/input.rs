//! Input validation: make sure a user-supplied file is a readable PDF.
//!
//! Validation happens before any pdfium work so callers get a precise
//! rejection (`FileNotFound`, `PermissionDenied`, `NotAPdf`) instead of a
//! generic parse failure from deep inside the extractor.

use crate::error::ResumeError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Reject upload names that do not end in `.pdf` (case-insensitive).
///
/// Meant for upload handlers that see the client's file name before the
/// bytes; local paths are validated by magic bytes instead.
pub fn validate_upload_name(name: &str) -> Result<(), ResumeError> {
    let is_pdf = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        Ok(())
    } else {
        Err(ResumeError::UnsupportedFileType {
            name: name.to_string(),
        })
    }
}

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<PathBuf, ResumeError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(ResumeError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(ResumeError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ResumeError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ResumeError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Write in-memory PDF bytes to a private temporary file.
///
/// The file is deleted when the returned handle is dropped, so every request
/// gets its own working file and cleanup happens even on early return.
pub fn spool_bytes(bytes: &[u8]) -> Result<NamedTempFile, ResumeError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ResumeError::NotAPdf {
            path: PathBuf::from("<memory>"),
            magic,
        });
    }

    let mut tmp = tempfile::Builder::new()
        .prefix("resume-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ResumeError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ResumeError::Internal(format!("tempfile write: {e}")))?;
    tmp.flush()
        .map_err(|e| ResumeError::Internal(format!("tempfile flush: {e}")))?;
    Ok(tmp)
}
