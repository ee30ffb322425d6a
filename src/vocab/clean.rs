//! Headword cleaning.
//!
//! The source tables number homographs with subscript digits
//! (`가다₀₁`, `가다₀₂`). The web front end shows the bare word, so the
//! markers are stripped before deduplication and category lookup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Optional whitespace followed by a run of U+2080..U+2089.
static SUBSCRIPT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[₀-₉]+").expect("subscript pattern is valid"));

/// Remove subscript-digit markers (and the whitespace before them), then trim.
///
/// Idempotent: a cleaned word contains no subscript digits.
///
/// ```
/// use topik_prep::vocab::clean_word;
///
/// assert_eq!(clean_word("가다₀₁"), "가다");
/// assert_eq!(clean_word("사람"), "사람");
/// ```
pub fn clean_word(word: &str) -> String {
    SUBSCRIPT_RUN.replace_all(word, "").trim().to_string()
}
