//! # resume-extract
//!
//! Turn a PDF of resumes (one candidate per page) into structured candidate
//! records with an LLM, keyed by each candidate's email address.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    validate path or spool bytes (%PDF magic)
//!  ├─ 2. Extract  per-page text + first linkedin.com/in/ link (pdfium, spawn_blocking)
//!  ├─ 3. Keys     first email per page, else NO_EMAIL_<n>
//!  ├─ 4. Model    one schema-constrained call per page (gpt-4.1-nano / claude / …)
//!  ├─ 5. Merge    normalise, clamp lists, place linkedin after full_name
//!  └─ 6. Output   ResultSet in page order + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_extract::{process, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::builder().job_role("Data Engineer").build()?;
//!     let output = process("resumes.pdf", &config).await?;
//!     for (key, record) in output.data.iter() {
//!         println!("{key}: {}", serde_json::to_string(record)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{PageError, ResumeError};
pub use normalize::{normalize, normalize_value};
pub use output::{
    CandidateRecord, EmailKey, ExtractionOutput, ExtractionStats, Page, PageRecord, ResultSet,
};
pub use pipeline::email::resolve_emails;
pub use pipeline::extract::{extract_pages, ExtractedDocument};
pub use pipeline::input::validate_upload_name;
pub use pipeline::llm::{ExtractorError, LlmExtractor, ModelReply, StructuredExtractor};
pub use pipeline::merge::merge;
pub use process::{
    inspect, process, process_from_bytes, process_pages, process_sync, process_to_file,
    Inspection,
};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{build_request, ExtractionRequest};
pub use store::{load_results, save_results};
