//! Turn a raw model reply into the record stored under a page's key.
//!
//! Models drift from their instructions in a few predictable ways:
//!
//! - Wrapping the JSON in ` ```json ... ``` ` fences
//! - Typographic quotes and dashes inside the JSON text
//! - More than two achievements per role, or more than two projects
//! - Plain prose instead of JSON
//!
//! [`merge`] repairs the first three and turns the last into a
//! parse-failure record that keeps the original reply for inspection.

use crate::normalize::{normalize, normalize_value};
use crate::output::PageRecord;
use crate::prompts::required_fields;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Maximum achievements kept per work-experience entry.
pub const MAX_ACHIEVEMENTS: usize = 2;

/// Maximum projects kept per record.
pub const MAX_PROJECTS: usize = 2;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap());

/// Parse, clean and annotate one model reply.
///
/// Never fails: a reply that is not a JSON object becomes a
/// [`PageRecord::ParseFailure`] carrying `raw`.
pub fn merge(raw: &str, linkedin: &str) -> PageRecord {
    let Some(parsed) = parse_reply(strip_fences(raw)) else {
        return PageRecord::parse_failure(raw);
    };

    let Value::Object(object) = normalize_value(parsed) else {
        warn!("Model reply is JSON but not an object");
        return PageRecord::parse_failure(raw);
    };

    let missing: Vec<&str> = required_fields()
        .into_iter()
        .filter(|k| !object.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        warn!("Candidate record is missing fields: {}", missing.join(", "));
    }

    let mut record = clamp_lists(object);
    insert_linkedin(&mut record, linkedin);
    PageRecord::Candidate(record)
}

/// Parse the reply as sent; only when that fails, retry on its normalised
/// form (typographic quotes used as delimiters become `"`).
///
/// Strings of a reply that parses as sent are cleaned afterwards by
/// `normalize_value`, so curly quotes inside values never break parsing.
fn parse_reply(body: &str) -> Option<Value> {
    match serde_json::from_str(body) {
        Ok(v) => Some(v),
        Err(first) => match serde_json::from_str(&normalize(body)) {
            Ok(v) => {
                debug!("Model reply parsed after normalisation ({})", first);
                Some(v)
            }
            Err(e) => {
                warn!("Model reply is not valid JSON: {}", e);
                None
            }
        },
    }
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    RE_OUTER_FENCES
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str())
}

/// Cap `projects` and every role's `achievements`.
fn clamp_lists(mut record: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Array(projects)) = record.get_mut("projects") {
        projects.truncate(MAX_PROJECTS);
    }
    if let Some(Value::Array(roles)) = record.get_mut("work_experience") {
        for role in roles.iter_mut() {
            if let Some(Value::Array(achievements)) = role.get_mut("achievements") {
                achievements.truncate(MAX_ACHIEVEMENTS);
            }
        }
    }
    record
}

/// Place `linkedin` right after `full_name`, or last when there is no name.
///
/// Any `linkedin` the model produced is replaced by the one from the PDF.
fn insert_linkedin(record: &mut Map<String, Value>, linkedin: &str) {
    record.remove("linkedin");
    let value = Value::String(linkedin.to_string());

    if !record.contains_key("full_name") {
        record.insert("linkedin".to_string(), value);
        return;
    }

    let entries = std::mem::take(record);
    for (key, v) in entries {
        let after_name = key == "full_name";
        record.insert(key, v);
        if after_name {
            record.insert("linkedin".to_string(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{NO_LINKEDIN, PARSE_FAILURE_MESSAGE};
    use serde_json::json;

    fn keys(record: &PageRecord) -> Vec<String> {
        record.as_candidate().unwrap().keys().cloned().collect()
    }

    #[test]
    fn minimal_record_gets_linkedin_after_name() {
        let raw = r#"{"full_name":"Jane Doe","education":[],"work_experience":[],"projects":[]}"#;
        let record = merge(raw, NO_LINKEDIN);
        assert_eq!(
            keys(&record),
            ["full_name", "linkedin", "education", "work_experience", "projects"]
        );
        assert_eq!(record.as_candidate().unwrap()["linkedin"], NO_LINKEDIN);
    }

    #[test]
    fn name_not_first_still_followed_by_linkedin() {
        let raw = r#"{"skills":"SQL","full_name":"Jane","projects":[]}"#;
        let record = merge(raw, "https://linkedin.com/in/jane");
        assert_eq!(keys(&record), ["skills", "full_name", "linkedin", "projects"]);
    }

    #[test]
    fn linkedin_appended_without_name() {
        let record = merge(r#"{"education":[]}"#, NO_LINKEDIN);
        assert_eq!(keys(&record), ["education", "linkedin"]);
    }

    #[test]
    fn model_linkedin_is_replaced() {
        let raw = r#"{"linkedin":"made-up","full_name":"Jane"}"#;
        let record = merge(raw, "https://linkedin.com/in/real");
        let map = record.as_candidate().unwrap();
        assert_eq!(keys(&record), ["full_name", "linkedin"]);
        assert_eq!(map["linkedin"], "https://linkedin.com/in/real");
    }

    #[test]
    fn not_json_becomes_parse_failure() {
        let record = merge("not json", NO_LINKEDIN);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "error": PARSE_FAILURE_MESSAGE, "raw_response": "not json" })
        );
    }

    #[test]
    fn non_object_becomes_parse_failure() {
        assert!(matches!(merge("[1, 2]", NO_LINKEDIN), PageRecord::ParseFailure { .. }));
        assert!(matches!(merge("\"text\"", NO_LINKEDIN), PageRecord::ParseFailure { .. }));
    }

    #[test]
    fn lists_are_clamped() {
        let raw = json!({
            "full_name": "Jane",
            "education": [],
            "work_experience": [
                { "role": "DS", "company": "Acme", "achievements": ["a", "b", "c", "d"] },
                { "role": "DA", "company": "Beta", "achievements": ["x"] }
            ],
            "projects": [
                { "project_name": "p1" }, { "project_name": "p2" }, { "project_name": "p3" }
            ]
        })
        .to_string();
        let record = merge(&raw, NO_LINKEDIN);
        let map = record.as_candidate().unwrap();
        assert_eq!(map["projects"].as_array().unwrap().len(), 2);
        assert_eq!(map["work_experience"][0]["achievements"], json!(["a", "b"]));
        assert_eq!(map["work_experience"][1]["achievements"], json!(["x"]));
    }

    #[test]
    fn strings_are_normalised() {
        let raw = r#"{"full_name":"José Müller","skills":"R – Python"}"#;
        let record = merge(raw, NO_LINKEDIN);
        let map = record.as_candidate().unwrap();
        assert_eq!(map["full_name"], "Jose Muller");
        assert_eq!(map["skills"], "R - Python");
    }

    #[test]
    fn fenced_reply_is_accepted() {
        let raw = "```json\n{\"full_name\": \"Jane\"}\n```";
        assert!(merge(raw, NO_LINKEDIN).is_candidate());
    }

    #[test]
    fn curly_quotes_inside_values_still_parse() {
        let raw = "{\"full_name\":\"Jane Doe\",\"education\":[],\"work_experience\":[],\
                   \"projects\":[{\"project_name\":\"Churn\",\
                   \"description\":\"Built a \u{201C}real-time\u{201D} churn model\",\
                   \"technologies\":\"Python\"}]}";
        let record = merge(raw, NO_LINKEDIN);
        let map = record.as_candidate().expect("valid reply must not become a parse failure");
        assert_eq!(map["full_name"], "Jane Doe");
        assert_eq!(
            map["projects"][0]["description"],
            "Built a \"real-time\" churn model"
        );
    }

    #[test]
    fn curly_quote_delimiters_parse_after_normalisation() {
        let raw = "{\u{201C}full_name\u{201D}: \u{201C}Jane\u{201D}, \u{201C}projects\u{201D}: []}";
        let record = merge(raw, NO_LINKEDIN);
        assert_eq!(record.as_candidate().unwrap()["full_name"], "Jane");
    }

    #[test]
    fn missing_fields_keep_the_record() {
        let record = merge(r#"{"full_name":"Jane"}"#, NO_LINKEDIN);
        assert!(record.is_candidate());
    }
}
