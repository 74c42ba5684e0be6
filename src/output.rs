//! Output types: pages, keys, per-page records and the keyed result set.

use crate::error::PageError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Sentinel stored in `linkedin` when a page carries no LinkedIn profile link.
pub const NO_LINKEDIN: &str = "NO_LINKEDIN";

/// Prefix of the synthesised key for pages without an email address.
pub const NO_EMAIL_PREFIX: &str = "NO_EMAIL_";

/// `error` value of a record whose model reply was not valid JSON.
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse response";

/// `error` value of a record whose model call failed.
pub const EXTRACTION_FAILURE_MESSAGE: &str = "Extraction failed";

// ── Page ────────────────────────────────────────────────────────────────────

/// One page of a PDF that produced text.
///
/// Text and LinkedIn link come from two passes over the same document and are
/// joined by page number, so they can never drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Normalised page text. Empty when the raw text held only characters
    /// outside ASCII.
    pub text: String,
    /// First `linkedin.com/in/` URI on the page, or [`NO_LINKEDIN`].
    pub linkedin: String,
}

impl Page {
    pub fn new(page_num: usize, text: impl Into<String>, linkedin: impl Into<String>) -> Self {
        Self {
            page_num,
            text: text.into(),
            linkedin: linkedin.into(),
        }
    }

    pub fn has_linkedin(&self) -> bool {
        self.linkedin != NO_LINKEDIN
    }
}

// ── EmailKey ────────────────────────────────────────────────────────────────

/// Key of a record in the [`ResultSet`]: a real email or `NO_EMAIL_<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailKey(String);

impl EmailKey {
    pub fn email(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The `n`-th placeholder (1-indexed).
    pub fn placeholder(n: usize) -> Self {
        Self(format!("{NO_EMAIL_PREFIX}{n}"))
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(NO_EMAIL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── PageRecord ──────────────────────────────────────────────────────────────

/// The value stored under one key.
///
/// Serialised untagged so a persisted file reads as plain JSON objects:
/// candidates as the model produced them, failures as `{"error": …}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRecord {
    /// The model reply could not be parsed as a JSON object.
    ParseFailure { error: String, raw_response: String },
    /// The model call itself failed for this page.
    ExtractionFailure { error: String, detail: PageError },
    /// A cleaned candidate object; `full_name` (if any) comes first, then `linkedin`.
    Candidate(Map<String, Value>),
}

impl PageRecord {
    pub fn parse_failure(raw_response: impl Into<String>) -> Self {
        PageRecord::ParseFailure {
            error: PARSE_FAILURE_MESSAGE.to_string(),
            raw_response: raw_response.into(),
        }
    }

    pub fn extraction_failure(detail: PageError) -> Self {
        PageRecord::ExtractionFailure {
            error: EXTRACTION_FAILURE_MESSAGE.to_string(),
            detail,
        }
    }

    pub fn is_candidate(&self) -> bool {
        matches!(self, PageRecord::Candidate(_))
    }

    /// The raw candidate object, if this record holds one.
    pub fn as_candidate(&self) -> Option<&Map<String, Value>> {
        match self {
            PageRecord::Candidate(map) => Some(map),
            _ => None,
        }
    }

    /// Typed view of a candidate record.
    ///
    /// Returns `None` for failure records or when the model's output does not
    /// fit the typed shape (the raw object is still available through
    /// [`PageRecord::as_candidate`]).
    pub fn candidate(&self) -> Option<CandidateRecord> {
        self.as_candidate()
            .and_then(|map| serde_json::from_value(Value::Object(map.clone())).ok())
    }
}

// ── Typed candidate view ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "no_linkedin")]
    pub linkedin: String,
    /// Comma-separated list of job-relevant skills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl CandidateRecord {
    /// Skills split on commas, trimmed, empty entries removed.
    pub fn skill_list(&self) -> Vec<&str> {
        self.skills
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default, deserialize_with = "lenient_string")]
    pub institution: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub degree: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gpa: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub graduation_year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "lenient_string")]
    pub project_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub technologies: String,
}

fn no_linkedin() -> String {
    NO_LINKEDIN.to_string()
}

/// Models regularly emit `"gpa": 3.8` or `"graduation_year": 2021` despite the
/// schema; accept any scalar and render it as a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

// ── ResultSet ───────────────────────────────────────────────────────────────

/// Ordered mapping from [`EmailKey`] to [`PageRecord`].
///
/// Iteration order is insertion order (page order). Inserting a key that is
/// already present replaces its record in place: last write wins, first
/// position is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<(EmailKey, PageRecord)>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous record for the key, if any.
    pub fn insert(&mut self, key: EmailKey, record: PageRecord) -> Option<PageRecord> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, record)),
            None => {
                self.entries.push((key, record));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&PageRecord> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, r)| r)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &EmailKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EmailKey, &PageRecord)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }

    /// Number of records holding a parsed candidate.
    pub fn candidate_count(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_candidate()).count()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, record) in &self.entries {
            map.serialize_entry(key, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResultSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResultSetVisitor;

        impl<'de> Visitor<'de> for ResultSetVisitor {
            type Value = ResultSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of email keys to candidate records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ResultSet, A::Error> {
                let mut set = ResultSet::new();
                while let Some((key, record)) = access.next_entry::<EmailKey, PageRecord>()? {
                    set.insert(key, record);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(ResultSetVisitor)
    }
}

// ── Run output ──────────────────────────────────────────────────────────────

/// Counters and timings for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages dropped by the text pass because they carried no text.
    pub dropped_pages: usize,
    /// Records holding a parsed candidate.
    pub candidates: usize,
    /// Records whose model reply did not parse.
    pub parse_failures: usize,
    /// Pages whose model call failed or timed out.
    pub failed_pages: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// Result of processing one PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Pages that produced text and were sent for extraction.
    pub pages_processed: usize,
    /// Number of resolved email keys (one per processed page, duplicates included).
    pub resumes_found: usize,
    /// Records keyed by email, in page order.
    pub data: ResultSet,
    pub stats: ExtractionStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(name: &str) -> PageRecord {
        let mut m = Map::new();
        m.insert("full_name".into(), json!(name));
        m.insert("linkedin".into(), json!(NO_LINKEDIN));
        PageRecord::Candidate(m)
    }

    #[test]
    fn placeholder_keys() {
        assert_eq!(EmailKey::placeholder(1).as_str(), "NO_EMAIL_1");
        assert!(EmailKey::placeholder(7).is_placeholder());
        assert!(!EmailKey::email("a@x.com").is_placeholder());
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut set = ResultSet::new();
        set.insert(EmailKey::email("a@x.com"), candidate("First"));
        set.insert(EmailKey::placeholder(1), candidate("Second"));
        let prev = set.insert(EmailKey::email("a@x.com"), candidate("Third"));

        assert!(prev.is_some());
        assert_eq!(set.len(), 2);
        let keys: Vec<&str> = set.keys().map(EmailKey::as_str).collect();
        assert_eq!(keys, ["a@x.com", "NO_EMAIL_1"]);
        let name = &set.get("a@x.com").unwrap().as_candidate().unwrap()["full_name"];
        assert_eq!(name, "Third");
    }

    #[test]
    fn result_set_serialises_as_ordered_map() {
        let mut set = ResultSet::new();
        set.insert(EmailKey::email("z@x.com"), candidate("Zed"));
        set.insert(EmailKey::placeholder(1), PageRecord::parse_failure("not json"));
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(
            json,
            r#"{"z@x.com":{"full_name":"Zed","linkedin":"NO_LINKEDIN"},"NO_EMAIL_1":{"error":"Failed to parse response","raw_response":"not json"}}"#
        );
        let back: ResultSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn extraction_failure_reads_back() {
        let mut set = ResultSet::new();
        set.insert(
            EmailKey::email("b@x.com"),
            PageRecord::extraction_failure(PageError::Timeout { page: 2, secs: 60 }),
        );
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains(EXTRACTION_FAILURE_MESSAGE));
        let back: ResultSet = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back.get("b@x.com"),
            Some(PageRecord::ExtractionFailure { .. })
        ));
    }

    #[test]
    fn typed_view_accepts_numeric_scalars() {
        let record = PageRecord::Candidate(
            json!({
                "full_name": "Jane Doe",
                "linkedin": "https://linkedin.com/in/jane",
                "skills": "Python, SQL,  ,Spark",
                "education": [{ "institution": "MIT", "degree": "BSc", "gpa": 3.9, "graduation_year": 2021 }],
                "work_experience": [{ "role": "DS", "company": "Acme", "achievements": ["a", "b"] }],
                "projects": []
            })
            .as_object()
            .unwrap()
            .clone(),
        );
        let c = record.candidate().unwrap();
        assert_eq!(c.education[0].gpa, "3.9");
        assert_eq!(c.education[0].graduation_year, "2021");
        assert_eq!(c.skill_list(), vec!["Python", "SQL", "Spark"]);
        assert_eq!(c.linkedin, "https://linkedin.com/in/jane");
    }

    #[test]
    fn failure_records_have_no_typed_view() {
        assert!(PageRecord::parse_failure("x").candidate().is_none());
        assert!(!PageRecord::parse_failure("x").is_candidate());
    }
}
