//! Value coercion and normalization shared by the comparators

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::Value;

/// Tokens ignored by keyword coverage unless the comparator supplies its own list.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "about", "also", "been", "being", "both", "could", "does", "each", "from", "have", "into",
    "just", "more", "most", "must", "only", "other", "over", "same", "should", "some", "such",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "those", "very",
    "were", "what", "when", "where", "which", "while", "will", "with", "would", "your",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("token pattern is valid"))
}

fn currency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\s,_$€£]").expect("currency pattern is valid"))
}

/// Numbers pass through; strings like `"$1,234.50"` parse after stripping
/// currency symbols, separators and whitespace. Non-finite results are rejected.
pub fn to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::String(s) => {
            let cleaned = currency_pattern().replace_all(s.trim(), "");
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Canonical text for scalars; `None` for null and containers.
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(format_number(*f)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Integral floats print without a fractional part so `1.0` and `1` agree.
pub fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

/// Trim, collapse internal whitespace runs, and optionally lower-case.
pub fn normalize_text(s: &str, case_sensitive: bool) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if case_sensitive {
        collapsed
    } else {
        collapsed.to_lowercase()
    }
}

pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" => Some(true),
            "false" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Text for one list element; containers fall back to compact JSON.
fn item_text(value: &Value) -> String {
    to_text(value).unwrap_or_else(|| value.to_string())
}

/// Arrays element-wise, strings split on `,` or `;`, scalars as a singleton.
pub fn to_items(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(arr) => Some(arr.iter().map(item_text).collect()),
        Value::String(s) => Some(
            s.split([',', ';'])
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect(),
        ),
        Value::Null | Value::Object(_) => None,
        scalar => to_text(scalar).map(|t| vec![t]),
    }
}

pub fn to_set(value: &Value) -> Option<BTreeSet<String>> {
    let items = to_items(value)?;
    Some(
        items
            .iter()
            .map(|item| normalize_text(item, false))
            .filter(|item| !item.is_empty())
            .collect(),
    )
}

/// Text searched by keyword coverage and required substrings: scalars as-is,
/// arrays joined by spaces, objects as compact JSON.
pub fn searchable_text(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(item_text).collect::<Vec<_>>().join(" "),
        other => item_text(other),
    }
}

/// Split text into lower-cased keywords, dropping short tokens and stop words.
/// Stop words match regardless of case and surrounding whitespace.
/// First-occurrence order is kept and duplicates removed.
pub fn keywords(text: &str, min_token_len: usize, stop_words: &[String]) -> Vec<String> {
    let stop_words: BTreeSet<String> = stop_words.iter().map(|sw| sw.trim().to_lowercase()).collect();
    let mut seen = BTreeSet::new();
    token_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|token| token.chars().count() >= min_token_len)
        .filter(|token| !stop_words.contains(token))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

pub fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect()
}
