//! Extraction entry points.
//!
//! [`process`] is the whole pipeline for one PDF: validate the input, pull
//! per-page text and links out of the document, key every page by email, ask
//! the model for a candidate record per page and assemble the results in page
//! order. The per-page half is exposed on its own as [`process_pages`] for
//! callers that already hold extracted text.

use crate::config::ExtractionConfig;
use crate::error::{PageError, ResumeError};
use crate::output::{
    EmailKey, ExtractionOutput, ExtractionStats, Page, PageRecord, ResultSet,
};
use crate::pipeline::llm::{call_extractor, resolve_extractor, StructuredExtractor};
use crate::pipeline::{email, extract, input, merge};
use crate::prompts::build_request;
use crate::store;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract candidate records from every page of a PDF.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ExtractionOutput)` even when some pages failed; failed pages are
/// stored inline as failure records (see `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(ResumeError)` only for fatal errors:
/// - File not found, unreadable or not a PDF
/// - Corrupt or encrypted PDF, or a link/text page mismatch
/// - No usable model provider
/// - Every page's model call failed
pub async fn process(
    pdf_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ResumeError> {
    let total_start = Instant::now();
    let pdf_path = input::resolve_local(pdf_path)?;
    info!("Starting extraction: {}", pdf_path.display());

    let extractor = resolve_extractor(config)?;

    let extract_start = Instant::now();
    let document = extract::extract_pages(&pdf_path, config.password.as_deref()).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    if document.dropped_pages() > 0 {
        warn!(
            "{} of {} pages carried no text and were skipped",
            document.dropped_pages(),
            document.total_pages
        );
    }

    let mut output = run_pages(&extractor, &document.pages, config).await?;
    output.stats.total_pages = document.total_pages;
    output.stats.dropped_pages = document.dropped_pages();
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {} records from {} pages, {}ms total",
        output.data.len(),
        document.total_pages,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Run the per-page half of the pipeline on already-extracted pages.
pub async fn process_pages(
    pages: &[Page],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ResumeError> {
    let total_start = Instant::now();
    let extractor = resolve_extractor(config)?;
    let mut output = run_pages(&extractor, pages, config).await?;
    output.stats.total_pages = pages.len();
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Extract from PDF bytes held in memory.
///
/// The bytes are spooled to a private temporary file that is removed when
/// this call returns, whatever the outcome.
///
/// # Example
/// ```rust,no_run
/// use resume_extract::{process_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("resumes.pdf")?;
/// let output = process_from_bytes(&bytes, &ExtractionConfig::default()).await?;
/// println!("{} resumes", output.resumes_found);
/// # Ok(())
/// # }
/// ```
pub async fn process_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ResumeError> {
    let tmp = input::spool_bytes(bytes)?;
    process(tmp.path(), config).await
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    pdf_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ResumeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ResumeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(pdf_path, config))
}

/// Extract and persist the result set to `output_path`, replacing whatever
/// the file held before.
pub async fn process_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ResumeError> {
    let output = process(pdf_path, config).await?;

    let out = output_path.as_ref().to_path_buf();
    let data = output.data.clone();
    tokio::task::spawn_blocking(move || store::save_results(&out, &data))
        .await
        .map_err(|e| ResumeError::Internal(format!("Write task panicked: {}", e)))??;

    Ok(output)
}

/// What a PDF yields before any model call.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub total_pages: usize,
    /// Pages with text, in page order.
    pub pages: Vec<Page>,
    /// One key per entry of `pages`.
    pub keys: Vec<EmailKey>,
}

/// Extract pages and resolve keys without calling a model.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    pdf_path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<Inspection, ResumeError> {
    let pdf_path = input::resolve_local(pdf_path)?;
    let document = extract::extract_pages(&pdf_path, password).await?;
    let keys = email::resolve_emails(&page_texts(&document.pages));
    Ok(Inspection {
        total_pages: document.total_pages,
        pages: document.pages,
        keys,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct PageOutcome {
    record: PageRecord,
    error: Option<PageError>,
    input_tokens: usize,
    output_tokens: usize,
}

fn page_texts(pages: &[Page]) -> Vec<&str> {
    pages.iter().map(|p| p.text.as_str()).collect()
}

async fn run_pages(
    extractor: &Arc<dyn StructuredExtractor>,
    pages: &[Page],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ResumeError> {
    let keys = email::resolve_emails(&page_texts(pages));
    let total = pages.len();
    debug!("Resolved {} keys", keys.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total);
    }

    let llm_start = Instant::now();
    let outcomes: Vec<PageOutcome> = stream::iter(pages.iter().zip(&keys).map(|(page, key)| {
        process_page(extractor, page, key, total, config)
    }))
    .buffered(config.concurrency.max(1))
    .collect()
    .await;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if total > 0 && failed == total {
        let first_error = outcomes
            .iter()
            .find_map(|o| o.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_complete(total, 0);
        }
        return Err(ResumeError::AllPagesFailed { total, first_error });
    }

    let mut stats = ExtractionStats {
        failed_pages: failed,
        llm_duration_ms,
        ..Default::default()
    };
    let mut data = ResultSet::new();
    for (key, outcome) in keys.iter().zip(outcomes) {
        stats.total_input_tokens += outcome.input_tokens as u64;
        stats.total_output_tokens += outcome.output_tokens as u64;
        if matches!(outcome.record, PageRecord::ParseFailure { .. }) {
            stats.parse_failures += 1;
        }
        if data.insert(key.clone(), outcome.record).is_some() {
            debug!("Key {} seen on an earlier page, overwriting", key);
        }
    }
    stats.candidates = data.candidate_count();

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(total, total - failed);
    }

    Ok(ExtractionOutput {
        pages_processed: total,
        resumes_found: keys.len(),
        data,
        stats,
    })
}

async fn process_page(
    extractor: &Arc<dyn StructuredExtractor>,
    page: &Page,
    key: &EmailKey,
    total: usize,
    config: &ExtractionConfig,
) -> PageOutcome {
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_start(page.page_num, total);
    }

    let request = build_request(
        page.page_num,
        &page.text,
        &config.job_role,
        config.system_prompt.as_deref(),
        config.temperature,
        config.max_tokens,
    );

    match call_extractor(extractor, &request, config).await {
        Ok((reply, retries)) => {
            debug!("Page {} ({}): reply after {} retries", page.page_num, key, retries);
            let record = merge::merge(&reply.content, &page.linkedin);
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_complete(page.page_num, total, key.as_str());
            }
            PageOutcome {
                record,
                error: None,
                input_tokens: reply.input_tokens,
                output_tokens: reply.output_tokens,
            }
        }
        Err(e) => {
            warn!("Page {} ({}): {}", page.page_num, key, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_error(page.page_num, total, &e.to_string());
            }
            PageOutcome {
                record: PageRecord::extraction_failure(e.clone()),
                error: Some(e),
                input_tokens: 0,
                output_tokens: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::NO_LINKEDIN;
    use crate::pipeline::llm::{ExtractorError, ModelReply};
    use crate::prompts::ExtractionRequest;
    use async_trait::async_trait;

    /// Answers with a record named after the page number.
    struct Echo;

    #[async_trait]
    impl StructuredExtractor for Echo {
        async fn extract(&self, request: &ExtractionRequest) -> Result<ModelReply, ExtractorError> {
            Ok(ModelReply {
                content: format!(
                    r#"{{"full_name":"Page {}","education":[],"work_experience":[],"projects":[]}}"#,
                    request.page_num
                ),
                input_tokens: 10,
                output_tokens: 5,
            })
        }
    }

    struct Down;

    #[async_trait]
    impl StructuredExtractor for Down {
        async fn extract(&self, _request: &ExtractionRequest) -> Result<ModelReply, ExtractorError> {
            Err(ExtractorError::Call("connection refused".into()))
        }
    }

    fn config(extractor: Arc<dyn StructuredExtractor>) -> ExtractionConfig {
        ExtractionConfig::builder().extractor(extractor).build().unwrap()
    }

    #[tokio::test]
    async fn stats_add_up() {
        let pages = vec![
            Page::new(1, "Alice a@x.com", NO_LINKEDIN),
            Page::new(2, "Bob", NO_LINKEDIN),
        ];
        let out = process_pages(&pages, &config(Arc::new(Echo))).await.unwrap();
        assert_eq!(out.pages_processed, 2);
        assert_eq!(out.resumes_found, 2);
        assert_eq!(out.stats.candidates, 2);
        assert_eq!(out.stats.total_input_tokens, 20);
        assert_eq!(out.stats.total_output_tokens, 10);
        assert_eq!(out.stats.failed_pages, 0);
    }

    #[tokio::test]
    async fn every_page_failing_is_fatal() {
        let pages = vec![Page::new(1, "Alice a@x.com", NO_LINKEDIN)];
        let err = process_pages(&pages, &config(Arc::new(Down))).await.unwrap_err();
        match err {
            ResumeError::AllPagesFailed { total, first_error } => {
                assert_eq!(total, 1);
                assert!(first_error.contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_pages_is_an_empty_result() {
        let out = process_pages(&[], &config(Arc::new(Down))).await.unwrap();
        assert!(out.data.is_empty());
        assert_eq!(out.resumes_found, 0);
    }

    #[tokio::test]
    async fn missing_file_rejected_before_provider_lookup() {
        let err = process("/no/such/resumes.pdf", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn bytes_that_are_not_pdf_rejected() {
        let err = process_from_bytes(b"GIF89a", &config(Arc::new(Echo)))
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::NotAPdf { .. }));
    }
}
