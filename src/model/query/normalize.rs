//! Pure helpers that turn raw filter text into safe query fragments.

use std::fmt::{Display, Formatter};
use std::ops::Deref;

/// Characters with special meaning inside a MongoDB (PCRE) pattern.
const PATTERN_METACHARACTERS: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// A trimmed filter value that is guaranteed to contain something.
///
/// Query parameters that are missing, empty, or whitespace-only never become a
/// `NonEmpty`, which is how the compiler tells "filter supplied" from "filter absent".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmpty(String);

impl NonEmpty {
    /// Trim the input, returning `None` if nothing is left.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Normalize an optional raw value, as received from a query string.
    pub fn from_field(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for NonEmpty {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for NonEmpty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backslash-escape every pattern metacharacter so the input only ever matches literally.
pub fn escape_for_pattern_match(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if PATTERN_METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// All the zero-padding conventions a stored ward number might use.
///
/// Leading zeros are stripped, then the stripped value is padded to widths 2 and 3.
/// The result is deduplicated but keeps that order. A ward made only of zeros is
/// treated as ward `0`.
pub fn ward_variants(raw: &str) -> Vec<String> {
    let stripped = raw.trim().trim_start_matches('0');
    let stripped = if stripped.is_empty() { "0" } else { stripped };

    let mut variants: Vec<String> = Vec::with_capacity(3);
    for candidate in [
        stripped.to_string(),
        format!("{stripped:0>2}"),
        format!("{stripped:0>3}"),
    ] {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// Remove a trailing run of ASCII letters, e.g. `"12A"` -> `"12"`.
pub fn split_house_suffix(raw: &str) -> &str {
    raw.trim_end_matches(|c: char| c.is_ascii_alphabetic()).trim()
}

/// Anchored pattern matching the house number's base with any (or no) letter suffix.
///
/// Use case-insensitively: `"12"` matches `"12"` and `"12a"` but never `"123"`.
/// Input made only of letters has no base, so it has to match exactly.
pub fn house_number_pattern(raw: &str) -> String {
    let base = split_house_suffix(raw);
    if base.is_empty() {
        return format!("^{}$", escape_for_pattern_match(raw.trim()));
    }
    format!("^{}(?:[A-Za-z]+)?$", escape_for_pattern_match(base))
}
