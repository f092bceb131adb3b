//! Keyword candidates pulled from a natural-language query.

use once_cell::sync::Lazy;
use regex::Regex;

/// Door, room and grid codes: `D-101`, `RM205`, `r-12`.
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[A-Z]{1,3}-?\d+\b").expect("valid code regex"));

/// Number followed by a unit: `900mm`, `2100 mm`, `1 hour`.
static MEASUREMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+\s*(?:mm|cm|m|ft|in|hour|hr|min)\b").expect("valid measurement regex")
});

/// Construction vocabulary matched as case-insensitive substrings.
pub const DOMAIN_TERMS: &[&str] = &[
    "door",
    "room",
    "corridor",
    "lobby",
    "fire rating",
    "partition",
    "ceiling",
    "floor",
    "wall",
    "finish",
    "hardware",
    "accessibility",
    "schedule",
    "equipment",
    "MEP",
    "HVAC",
    "plumbing",
    "electrical",
];

/// Extracts keyword candidates from `query`.
///
/// Three passes run independently (codes, measurements, domain terms) and
/// their union is de-duplicated keeping first-seen order. Codes and
/// measurements keep the query's spelling; domain terms use the list's.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();

    let codes = CODE_PATTERN.find_iter(query).map(|m| m.as_str());
    let measurements = MEASUREMENT_PATTERN.find_iter(query).map(|m| m.as_str());
    let terms = DOMAIN_TERMS
        .iter()
        .copied()
        .filter(|term| lowered.contains(&term.to_lowercase()));

    let mut keywords: Vec<String> = Vec::new();
    for candidate in codes.chain(measurements).chain(terms) {
        if !keywords.iter().any(|k| k == candidate) {
            keywords.push(candidate.to_string());
        }
    }
    keywords
}
