//! Identifier normalization: the only place raw spreadsheet text becomes
//! part of a rule operand.

use crate::config::ValueCase;
use regex::Regex;
use std::sync::OnceLock;

fn special_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn size_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)([a-z]\d+)").expect("valid regex"))
}

fn size_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2,})").expect("valid regex"))
}

/// Canonicalize a raw string into a rule-safe identifier: strip characters
/// that are neither word characters nor whitespace, collapse whitespace runs
/// to a single underscore, lowercase. Idempotent.
pub fn normalize(s: &str) -> String {
    normalize_with_case(s, ValueCase::Lower)
}

/// `normalize` with configurable casing for value segments. `Preserve` skips
/// only the lowercase step; structural cleanup still applies, so the result
/// is still idempotent.
pub fn normalize_with_case(s: &str, case: ValueCase) -> String {
    let stripped = special_chars().replace_all(s.trim(), "");
    let joined = whitespace_runs().replace_all(stripped.trim(), "_");
    match case {
        ValueCase::Lower => joined.to_lowercase(),
        ValueCase::Preserve => joined.into_owned(),
    }
}

/// Extract the size token from a raw key value: first an alphanumeric size
/// code ("P12"), then any run of two or more digits, else the input
/// unchanged. Size codes are lowercased to match normalized output.
pub fn extract_size_token(s: &str) -> String {
    if let Some(m) = size_code().captures(s).and_then(|c| c.get(1)) {
        return m.as_str().to_lowercase();
    }
    if let Some(m) = size_number().captures(s).and_then(|c| c.get(1)) {
        return m.as_str().to_string();
    }
    s.to_string()
}
