//! Error types for the resume-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ResumeError`] is **fatal**: the request cannot proceed at all
//!   (bad input file, corrupt PDF, provider not configured). Returned as
//!   `Err(ResumeError)` from the top-level `process*` functions.
//!
//! * [`PageError`] is **non-fatal**: the model call for a single page failed
//!   (network, auth, timeout) but every other page is fine. Recorded inline
//!   in the [`crate::output::ResultSet`] so one bad page never discards the
//!   pages that were already extracted.
//!
//! A model reply that is not valid JSON is not an error at all: it becomes a
//! [`crate::output::PageRecord::ParseFailure`] entry.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the resume-extract library.
#[derive(Debug, Error)]
pub enum ResumeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The uploaded file name does not carry a `.pdf` extension.
    #[error("Only PDF files are supported, got '{name}'")]
    UnsupportedFileType { name: String },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The link pass and the text pass disagree on the document's pages.
    #[error("Page alignment mismatch in '{path}': link pass saw {link_pages} pages, text pass saw {text_pages}")]
    PageAlignmentMismatch {
        path: PathBuf,
        link_pages: usize,
        text_pages: usize,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every page's model call failed; the result set would hold no candidate.
    #[error("All {total} pages failed during extraction.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the persisted results file.
    #[error("Failed to write results file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted results file exists but could not be read back.
    #[error("Failed to read results file '{path}': {detail}")]
    OutputReadFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The external model call failed (after retries, if any were configured).
    #[error("Page {page}: extraction call failed after {retries} retries: {detail}")]
    ExtractionFailed {
        page: usize,
        retries: u32,
        detail: String,
    },

    /// The external model call did not answer in time.
    #[error("Page {page}: extraction call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_mismatch_display() {
        let e = ResumeError::PageAlignmentMismatch {
            path: PathBuf::from("cv.pdf"),
            link_pages: 3,
            text_pages: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains("link pass saw 3"), "got: {msg}");
        assert!(msg.contains("text pass saw 2"), "got: {msg}");
    }

    #[test]
    fn unsupported_file_type_display() {
        let e = ResumeError::UnsupportedFileType {
            name: "resume.docx".into(),
        };
        assert!(e.to_string().contains("resume.docx"));
    }

    #[test]
    fn page_timeout_display() {
        let e = PageError::Timeout { page: 3, secs: 60 };
        assert!(e.to_string().contains("Page 3"));
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::ExtractionFailed {
            page: 1,
            retries: 0,
            detail: "401 Unauthorized".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("ExtractionFailed"));
        let back: PageError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
