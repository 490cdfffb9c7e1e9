// 🔤 Name Normalizer - canonical keys for entity matching
//
// "Acme, Inc.", "ACME INC" and "acme" all map to the key "ACME".
// The step order is significant: legal suffix tokens are removed while
// punctuation still marks word boundaries, then punctuation is stripped.

use once_cell::sync::Lazy;
use regex::Regex;

/// Standalone legal-suffix tokens (after uppercasing)
static SUFFIX_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(INC|LLC|CORPORATION)\b").expect("suffix regex is valid"));

/// Anything that is neither a word character nor whitespace
static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation regex is valid"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

// ============================================================================
// CANONICAL ENTITY NAMES
// ============================================================================

/// Canonical merge key for a broker name.
///
/// Missing names map to the empty string. The result is stable under
/// repeated application: when stripping punctuation exposes a new suffix
/// token (e.g. `"I.N.C"`), the pass is repeated until nothing changes.
pub fn normalize_name(name: Option<&str>) -> String {
    let Some(name) = name else {
        return String::new();
    };

    let mut current = normalize_pass(name);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(name: &str) -> String {
    let upper = name.to_uppercase();
    let without_suffix = SUFFIX_TOKENS.replace_all(&upper, "");
    let without_punctuation = PUNCTUATION.replace_all(&without_suffix, "");
    WHITESPACE_RUN
        .replace_all(&without_punctuation, " ")
        .trim()
        .to_string()
}

// ============================================================================
// POLICY DATASET CLEANERS
// ============================================================================

/// Lowercase a company name and drop all whitespace
pub fn clean_name(name: Option<&str>) -> String {
    squash_lowercase(name)
}

/// Lowercase a privacy-policy URL and drop all whitespace
pub fn clean_policy_url(url: Option<&str>) -> String {
    squash_lowercase(url)
}

fn squash_lowercase(value: Option<&str>) -> String {
    value
        .map(|v| {
            v.to_lowercase()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect()
        })
        .unwrap_or_default()
}

/// `snake_case` key → "Title Case" label (first letter of every word
/// uppercased, the rest lowercased).
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut previous_is_letter = false;

    for c in key.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }

    out
}

// ============================================================================
// TESTS
// ============================================================================
