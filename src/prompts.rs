//! Prompt and output-schema construction for resume extraction.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing what the model is asked to
//!    extract requires editing exactly one place, and the schema sits next
//!    to the instructions that describe it.
//!
//! 2. **Testability**: unit tests can inspect prompts and the schema
//!    directly without calling a real model.
//!
//! Callers can override the instruction template via
//! [`crate::config::ExtractionConfig::system_prompt`]; the `{job_context}`
//! placeholder in an override is replaced the same way as in the default.

use crate::normalize::normalize;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};

/// Default target role when the caller does not name one.
pub const DEFAULT_JOB_ROLE: &str = "Data Scientist";

/// Name attached to the schema in structured-output requests.
pub const SCHEMA_NAME: &str = "candidate_record";

/// Default instruction template. `{job_context}` is substituted per request.
pub const DEFAULT_INSTRUCTIONS: &str = r#"You are an expert recruiter's assistant. Extract the following information from the resume below {job_context}.

Return JSON only, matching the provided schema:
1. full_name: the full name of the candidate
2. skills: if present, the top skills relevant to the job role, comma separated
3. education: each college or university attended (institution, degree, GPA if present, graduation year or current year)
4. work_experience: each role held (role, company, and at most 2 bullet points of key achievements)
5. projects: the top 2 most relevant projects {job_context} (project name, brief description, technologies used)

Rules:
- Output ONLY the JSON object
- Do NOT wrap the JSON in ``` fences
- Use empty strings or empty arrays for anything the resume does not state
- Do NOT invent information that is not in the resume"#;

/// Everything the external model needs to extract one page.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRequest {
    /// 1-indexed page the request was built for.
    pub page_num: usize,
    /// Job-aware instruction prompt.
    pub instructions: String,
    /// Normalised resume text of the page.
    pub input: String,
    /// Fixed JSON Schema the reply must conform to.
    pub schema: Value,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens the model may generate.
    pub max_tokens: usize,
}

/// Phrase describing the target role inside the prompt.
///
/// An empty (or whitespace-only) role yields the general framing.
pub fn job_context(job_role: &str) -> String {
    let role = job_role.trim();
    if role.is_empty() {
        "for any general position".to_string()
    } else {
        format!("for the job role: {role}")
    }
}

/// Render the instruction prompt for a role, optionally from a custom template.
pub fn build_instructions(job_role: &str, template: Option<&str>) -> String {
    template
        .unwrap_or(DEFAULT_INSTRUCTIONS)
        .replace("{job_context}", &job_context(job_role))
}

/// Build the extraction request for one page.
///
/// The page text is normalised here (a no-op for text that already went
/// through the extractor) so the model never sees typographic characters.
pub fn build_request(
    page_num: usize,
    page_text: &str,
    job_role: &str,
    template: Option<&str>,
    temperature: f32,
    max_tokens: usize,
) -> ExtractionRequest {
    ExtractionRequest {
        page_num,
        instructions: build_instructions(job_role, template),
        input: normalize(page_text),
        schema: extraction_schema().clone(),
        temperature,
        max_tokens,
    }
}

static EXTRACTION_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "full_name": { "type": "string" },
            "skills": { "type": "string" },
            "education": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "institution": { "type": "string" },
                        "degree": { "type": "string" },
                        "gpa": { "type": "string" },
                        "graduation_year": { "type": "string" }
                    }
                }
            },
            "work_experience": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "role": { "type": "string" },
                        "company": { "type": "string" },
                        "achievements": {
                            "type": "array",
                            "items": { "type": "string" },
                            "maxItems": 2
                        }
                    }
                }
            },
            "projects": {
                "type": "array",
                "maxItems": 2,
                "items": {
                    "type": "object",
                    "properties": {
                        "project_name": { "type": "string" },
                        "description": { "type": "string" },
                        "technologies": { "type": "string" }
                    }
                }
            }
        },
        "required": ["full_name", "education", "work_experience", "projects"],
        "additionalProperties": false
    })
});

/// The fixed output schema for a candidate record.
pub fn extraction_schema() -> &'static Value {
    &EXTRACTION_SCHEMA
}

/// Keys the schema marks as required.
pub fn required_fields() -> Vec<&'static str> {
    EXTRACTION_SCHEMA["required"]
        .as_array()
        .map(|keys| keys.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
