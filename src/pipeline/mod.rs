//! Pipeline stages for resume extraction.
//!
//! Each submodule implements exactly one step and is tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ email ──▶ llm ──▶ merge
//! (path/bytes) (pdfium)  (keys)   (model) (clean + linkedin)
//! ```
//!
//! 1. [`input`]  : validate the user-supplied path or bytes as a PDF
//! 2. [`extract`]: per-page text and LinkedIn link; runs in `spawn_blocking`
//!    because pdfium is synchronous
//! 3. [`email`]  : one key per page: first email, else `NO_EMAIL_<n>`
//! 4. [`llm`]    : the external model call with timeout and opt-in retry;
//!    the only stage with network I/O
//! 5. [`merge`]  : parse and clean the reply, clamp lists, place `linkedin`

pub mod email;
pub mod extract;
pub mod input;
pub mod llm;
pub mod merge;
