//! PDF extraction: per-page text and per-page LinkedIn link via pdfium.
//!
//! ## Two passes, one index
//!
//! The document is read twice: a link pass over each page's link
//! annotations, then a text pass over each page's text layer. Both passes
//! walk the same loaded document and tag every entry with its page number;
//! the results are joined on that number, never by position. If the two
//! passes disagree on how many pages the document has, extraction fails
//! rather than silently pairing the wrong link with the wrong resume.
//!
//! Pages whose raw text layer is empty (scanned images, blank separators)
//! are dropped together with their link entry. Emptiness is judged before
//! normalisation: a page of CJK text survives with empty normalised text.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is synchronous and
//! keeps internal state. The work runs on Tokio's blocking pool so async
//! worker threads never stall on it.

use crate::error::ResumeError;
use crate::normalize::normalize;
use crate::output::{Page, NO_LINKEDIN};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Substring identifying a LinkedIn profile URL.
pub const LINKEDIN_PROFILE_MARKER: &str = "linkedin.com/in/";

/// Everything the extractor learned about a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Pages in the document, including those dropped for lack of text.
    pub total_pages: usize,
    /// Pages with text, in page order.
    pub pages: Vec<Page>,
}

impl ExtractedDocument {
    pub fn dropped_pages(&self) -> usize {
        self.total_pages.saturating_sub(self.pages.len())
    }
}

/// Extract text and LinkedIn links from every page of a PDF.
pub async fn extract_pages(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<ExtractedDocument, ResumeError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_pages_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| ResumeError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Bind to a pdfium library.
///
/// Search order: `PDFIUM_LIB_PATH` (file or directory), the current
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, ResumeError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let p = PathBuf::from(p);
            let lib = if p.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&p)
            } else {
                p
            };
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ResumeError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn extract_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<ExtractedDocument, ResumeError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                ResumeError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                ResumeError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            ResumeError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let links = link_pass(&document);
    let texts = text_pass(&document);
    info!("PDF loaded: {} pages", links.len());

    let pages = align_passes(pdf_path, links, texts)?;
    let total_pages = document.pages().len() as usize;

    Ok(ExtractedDocument { total_pages, pages })
}

/// Link pass: `(page_num, first LinkedIn URI or NO_LINKEDIN)` per page.
fn link_pass(document: &PdfDocument<'_>) -> Vec<(usize, String)> {
    document
        .pages()
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            let uris = page.links().iter().filter_map(|link| match link.action() {
                Some(PdfAction::Uri(action)) => action.uri().ok(),
                _ => None,
            });
            (idx + 1, first_linkedin(uris))
        })
        .collect()
}

/// Text pass: `(page_num, raw text or None)` per page.
fn text_pass(document: &PdfDocument<'_>) -> Vec<(usize, Option<String>)> {
    document
        .pages()
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            let text = match page.text() {
                Ok(t) => Some(t.all()),
                Err(e) => {
                    warn!("Page {}: text layer unavailable: {:?}", idx + 1, e);
                    None
                }
            };
            (idx + 1, text)
        })
        .collect()
}

/// The first URI that points at a LinkedIn profile, or [`NO_LINKEDIN`].
pub fn first_linkedin<I, S>(uris: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    uris.into_iter()
        .find(|u| u.as_ref().contains(LINKEDIN_PROFILE_MARKER))
        .map(|u| u.as_ref().to_string())
        .unwrap_or_else(|| NO_LINKEDIN.to_string())
}

/// Join the two passes by page number, drop pages without raw text and
/// normalise the rest.
///
/// Fails when the passes report different page counts or different page
/// numbering.
pub fn align_passes(
    pdf_path: &Path,
    links: Vec<(usize, String)>,
    texts: Vec<(usize, Option<String>)>,
) -> Result<Vec<Page>, ResumeError> {
    let mismatch = || ResumeError::PageAlignmentMismatch {
        path: pdf_path.to_path_buf(),
        link_pages: links.len(),
        text_pages: texts.len(),
    };

    if links.len() != texts.len() {
        return Err(mismatch());
    }
    if links.iter().zip(&texts).any(|((l, _), (t, _))| l != t) {
        return Err(mismatch());
    }

    let pages = links
        .into_iter()
        .zip(texts)
        .filter_map(|((page_num, linkedin), (_, text))| match text {
            Some(raw) if !raw.trim().is_empty() => {
                Some(Page::new(page_num, normalize(&raw), linkedin))
            }
            _ => {
                debug!("Page {}: no text, dropped", page_num);
                None
            }
        })
        .collect();

    Ok(pages)
}
