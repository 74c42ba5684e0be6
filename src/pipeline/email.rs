//! Email resolution: one key per page.
//!
//! The first email-looking substring on a page becomes that page's key. Pages
//! without one get `NO_EMAIL_1`, `NO_EMAIL_2`, … in page order; the counter
//! advances only on such pages, so keys stay stable when pages with real
//! emails are added or removed around them.

use crate::output::EmailKey;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_.+-]+@[A-Za-z0-9-]+\.[A-Za-z0-9.-]+").unwrap());

/// First email in `text`, by position.
pub fn first_email(text: &str) -> Option<&str> {
    RE_EMAIL.find(text).map(|m| m.as_str())
}

/// Resolve one key per page text, in order.
///
/// Identical emails on different pages are not deduplicated.
pub fn resolve_emails<S: AsRef<str>>(page_texts: &[S]) -> Vec<EmailKey> {
    let mut next_placeholder = 1;
    page_texts
        .iter()
        .map(|text| match first_email(text.as_ref()) {
            Some(email) => EmailKey::email(email),
            None => {
                let key = EmailKey::placeholder(next_placeholder);
                next_placeholder += 1;
                key
            }
        })
        .collect()
}
