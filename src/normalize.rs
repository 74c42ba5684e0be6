//! Unicode text normalisation for resume text and model replies.
//!
//! PDF text layers and LLM output are full of typographic characters: curly
//! quotes, en/em dashes, non-breaking and thin spaces, assorted bullets. They
//! break downstream JSON parsing (a model that delimits keys with `“…”`) and
//! make keys and skill lists compare unequal for no visible reason.
//!
//! [`normalize`] flattens all of that to plain ASCII, keeping a single
//! canonical bullet `•` so list structure survives:
//!
//! 1. NFKD decomposition (`é` → `e` + combining acute, `ﬁ` → `fi`)
//! 2. Substitution table for characters decomposition does not flatten
//! 3. Drop every remaining non-ASCII codepoint except `•`
//! 4. Collapse whitespace runs to one space and trim
//!
//! The function is total and idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

/// The one non-ASCII character that survives normalisation.
pub const BULLET: char = '\u{2022}';

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise a string to its canonical ASCII-leaning form.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let flattened: String = text
        .nfkd()
        .map(substitute)
        .filter(|c| c.is_ascii() || *c == BULLET)
        .collect();

    RE_WHITESPACE
        .replace_all(&flattened, " ")
        .trim()
        .to_string()
}

/// Apply [`normalize`] to every string inside a JSON value.
///
/// Objects keep their key order; numbers, booleans and nulls are returned
/// untouched. Keys are not rewritten.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

fn substitute(c: char) -> char {
    match c {
        // hyphen, non-breaking hyphen, figure dash, en dash, em dash, horizontal bar
        '\u{2010}'..='\u{2015}' => '-',
        '\u{2018}' | '\u{2019}' | '\u{201A}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
        // no-break space, en quad … hair space
        '\u{00A0}' | '\u{2000}'..='\u{200A}' => ' ',
        '\u{2022}' | '\u{2023}' | '\u{25E6}' => BULLET,
        other => other,
    }
}
