//! Value comparators
//!
//! A [`Comparator`] decides whether one submitted value matches the expected
//! value from the answer key. Comparison is total: missing values and values
//! that cannot be coerced produce a non-matching [`Verdict`] with a reason,
//! never an error.
//!
//! `keyword_coverage` is a deterministic substring heuristic. It counts
//! keywords; it does not understand the text.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::coerce;
use crate::types::{ConfigError, ObjectMap, Result, Value};

pub const MISSING_FIELD: &str = "missing field";
pub const INVALID_FORMAT: &str = "invalid format";
pub const MISSING_EXPECTED: &str = "missing expected value in answer key";

/// Slack applied to tolerance boundaries to absorb binary floating-point error.
const FLOAT_SLACK: f64 = 1e-9;
/// Floor for the relative-error denominator.
const RELATIVE_EPSILON: f64 = 1e-9;

/// Answer-key keys that mark an annotated expectation.
pub const KEY_VALUE: &str = "$value";
pub const KEY_ALTERNATES: &str = "$alternates";
pub const KEY_TOLERANCE: &str = "$tolerance";
pub const KEY_REQUIRE: &str = "$require";

// =============================================================================
// Comparator
// =============================================================================

/// Named, parameterized matching strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Comparator {
    StringEqual { case_sensitive: bool },
    NumericTolerance { abs_tol: f64 },
    PercentageTolerance { pct_tol: f64 },
    RangeMatch { min: Option<f64>, max: Option<f64> },
    SetEqual,
    OrderedListEqual { case_sensitive: bool },
    KeywordCoverage(KeywordCoverage),
    BooleanEqual,
}

/// Parameters for [`Comparator::KeywordCoverage`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordCoverage {
    pub threshold: f64,
    pub min_token_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,
}

impl Default for KeywordCoverage {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            min_token_len: 4,
            keywords: None,
            stop_words: None,
        }
    }
}

/// Outcome of applying a comparator once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub matched: bool,
    pub weight_earned: f64,
    pub detail: VerdictDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictDetail {
    pub submitted: Option<Value>,
    pub expected: Option<Value>,
    pub reason: String,
}

impl Verdict {
    /// Credit the verdict with `weight` when matched, zero otherwise.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight_earned = if self.matched { weight } else { 0.0 };
        self
    }
}

struct Outcome {
    matched: bool,
    reason: String,
}

impl Outcome {
    fn pass(reason: impl Into<String>) -> Self {
        Self { matched: true, reason: reason.into() }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self { matched: false, reason: reason.into() }
    }

    fn invalid(what: &str, value: &Value) -> Self {
        Self::fail(format!("{}: expected {}, got {} {}", INVALID_FORMAT, what, value.type_name(), value))
    }
}

impl Comparator {
    pub fn string_equal() -> Self {
        Comparator::StringEqual { case_sensitive: false }
    }

    pub fn exact() -> Self {
        Comparator::StringEqual { case_sensitive: true }
    }

    pub fn numeric_tolerance(abs_tol: f64) -> Self {
        Comparator::NumericTolerance { abs_tol }
    }

    pub fn percentage_tolerance(pct_tol: f64) -> Self {
        Comparator::PercentageTolerance { pct_tol }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Comparator::RangeMatch { min: Some(min), max: Some(max) }
    }

    pub fn set_equal() -> Self {
        Comparator::SetEqual
    }

    pub fn ordered_list_equal() -> Self {
        Comparator::OrderedListEqual { case_sensitive: false }
    }

    pub fn keyword_coverage(threshold: f64) -> Self {
        Comparator::KeywordCoverage(KeywordCoverage {
            threshold,
            ..KeywordCoverage::default()
        })
    }

    pub fn boolean_equal() -> Self {
        Comparator::BooleanEqual
    }

    /// Build a comparator from its configuration name and parameter table.
    /// Unknown names, unknown parameters and out-of-range values are rejected.
    pub fn from_name(name: &str, params: &ObjectMap<String, Value>) -> Result<Self> {
        let normalized = name.trim().to_lowercase();
        let mut p = Params::new(&normalized, params);

        let comparator = match normalized.as_str() {
            "string_equal" | "case_insensitive" => Comparator::StringEqual {
                case_sensitive: p.bool_or("case_sensitive", false)?,
            },
            "exact" => Comparator::StringEqual {
                case_sensitive: p.bool_or("case_sensitive", true)?,
            },
            "numeric_tolerance" => Comparator::NumericTolerance {
                abs_tol: p.required_f64(&["abs_tol", "abs"])?,
            },
            "percentage_tolerance" => Comparator::PercentageTolerance {
                pct_tol: p.required_f64(&["pct_tol", "pct"])?,
            },
            "range_match" | "range" => Comparator::RangeMatch {
                min: p.f64_opt(&["min"])?,
                max: p.f64_opt(&["max"])?,
            },
            "set_equal" => Comparator::SetEqual,
            "ordered_list_equal" => Comparator::OrderedListEqual {
                case_sensitive: p.bool_or("case_sensitive", false)?,
            },
            "keyword_coverage" => {
                let defaults = KeywordCoverage::default();
                Comparator::KeywordCoverage(KeywordCoverage {
                    threshold: p.f64_opt(&["threshold"])?.unwrap_or(defaults.threshold),
                    min_token_len: p.usize_opt("min_token_len")?.unwrap_or(defaults.min_token_len),
                    keywords: p.strings_opt("keywords")?,
                    stop_words: p.strings_opt("stop_words")?,
                })
            }
            "boolean_equal" => Comparator::BooleanEqual,
            _ => return Err(ConfigError::UnknownComparator(name.to_string())),
        };

        p.finish()?;
        comparator.validate()?;
        Ok(comparator)
    }

    /// Configuration name of this comparator.
    pub fn name(&self) -> &'static str {
        match self {
            Comparator::StringEqual { .. } => "string_equal",
            Comparator::NumericTolerance { .. } => "numeric_tolerance",
            Comparator::PercentageTolerance { .. } => "percentage_tolerance",
            Comparator::RangeMatch { .. } => "range_match",
            Comparator::SetEqual => "set_equal",
            Comparator::OrderedListEqual { .. } => "ordered_list_equal",
            Comparator::KeywordCoverage(_) => "keyword_coverage",
            Comparator::BooleanEqual => "boolean_equal",
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        let bad = |param: &str, reason: String| ConfigError::InvalidParam {
            comparator: self.name().to_string(),
            param: param.to_string(),
            reason,
        };

        match self {
            Comparator::NumericTolerance { abs_tol } => {
                if !abs_tol.is_finite() || *abs_tol < 0.0 {
                    return Err(bad("abs_tol", format!("must be a non-negative number, got {}", abs_tol)));
                }
            }
            Comparator::PercentageTolerance { pct_tol } => {
                if !pct_tol.is_finite() || *pct_tol < 0.0 {
                    return Err(bad("pct_tol", format!("must be a non-negative fraction, got {}", pct_tol)));
                }
            }
            Comparator::RangeMatch { min, max } => {
                for (param, bound) in [("min", min), ("max", max)] {
                    if let Some(b) = bound {
                        if !b.is_finite() {
                            return Err(bad(param, format!("must be finite, got {}", b)));
                        }
                    }
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(bad("min", format!("min {} is greater than max {}", lo, hi)));
                    }
                }
            }
            Comparator::KeywordCoverage(kc) => {
                if !(kc.threshold > 0.0 && kc.threshold <= 1.0) {
                    return Err(bad("threshold", format!("must be in (0, 1], got {}", kc.threshold)));
                }
                if kc.min_token_len == 0 {
                    return Err(bad("min_token_len", "must be at least 1".to_string()));
                }
            }
            Comparator::StringEqual { .. }
            | Comparator::SetEqual
            | Comparator::OrderedListEqual { .. }
            | Comparator::BooleanEqual => {}
        }
        Ok(())
    }

    /// Compare a submitted value against an answer-key node.
    ///
    /// `null` on the submitted side counts as missing. The answer-key node may
    /// be an annotated expectation (see [`KEY_VALUE`]); alternates are tried in
    /// order after the primary value. `weight_earned` is 1.0 on a match; the
    /// owning criterion rescales it.
    pub fn compare(&self, submitted: Option<&Value>, expected: Option<&Value>) -> Verdict {
        let submitted = submitted.filter(|v| !v.is_null());
        let expectation = expected.map(Expectation::from_node).unwrap_or_default();

        let mut outcome = match submitted {
            None => Outcome::fail(MISSING_FIELD),
            Some(sub) => self.compare_expectation(sub, &expectation),
        };

        if let Some(bad) = expectation.rejected_tolerance {
            tracing::warn!(
                comparator = self.name(),
                tolerance = %bad,
                "Ignoring invalid {} in answer key", KEY_TOLERANCE
            );
            outcome.reason = format!("{} (ignored invalid {} {})", outcome.reason, KEY_TOLERANCE, bad);
        }

        Verdict {
            matched: outcome.matched,
            weight_earned: if outcome.matched { 1.0 } else { 0.0 },
            detail: VerdictDetail {
                submitted: submitted.cloned(),
                expected: expectation.value.cloned(),
                reason: outcome.reason,
            },
        }
    }

    fn compare_expectation(&self, submitted: &Value, expectation: &Expectation<'_>) -> Outcome {
        let primary = match (expectation.value, self) {
            (Some(v), _) => Some(v),
            (None, c) if c.has_own_expectation() => None,
            (None, _) => return Outcome::fail(MISSING_EXPECTED),
        };

        let first = self.compare_values(submitted, primary, expectation.tolerance);
        let outcome = if first.matched {
            first
        } else {
            expectation
                .alternates
                .iter()
                .enumerate()
                .map(|(i, alt)| (i, self.compare_values(submitted, Some(alt), expectation.tolerance)))
                .find(|(_, o)| o.matched)
                .map(|(i, o)| Outcome::pass(format!("matched alternate #{}: {}", i + 1, o.reason)))
                .unwrap_or(first)
        };

        if outcome.matched && !expectation.require.is_empty() {
            let haystack = coerce::searchable_text(submitted).to_lowercase();
            if let Some(missing) = expectation
                .require
                .iter()
                .find(|needle| !haystack.contains(&needle.to_lowercase()))
            {
                return Outcome::fail(format!("missing required substring '{}'", missing));
            }
        }
        outcome
    }

    /// Range bounds or explicit keywords in the params stand in for the answer key.
    fn has_own_expectation(&self) -> bool {
        match self {
            Comparator::RangeMatch { min, max } => min.is_some() || max.is_some(),
            Comparator::KeywordCoverage(kc) => kc.keywords.is_some(),
            _ => false,
        }
    }

    fn compare_values(&self, submitted: &Value, expected: Option<&Value>, tolerance: Option<f64>) -> Outcome {
        match self {
            Comparator::StringEqual { case_sensitive } => {
                compare_strings(submitted, expected, *case_sensitive)
            }
            Comparator::NumericTolerance { abs_tol } => {
                compare_absolute(submitted, expected, tolerance.unwrap_or(*abs_tol))
            }
            Comparator::PercentageTolerance { pct_tol } => {
                compare_relative(submitted, expected, tolerance.unwrap_or(*pct_tol))
            }
            Comparator::RangeMatch { min, max } => compare_range(submitted, expected, *min, *max),
            Comparator::SetEqual => compare_sets(submitted, expected),
            Comparator::OrderedListEqual { case_sensitive } => {
                compare_lists(submitted, expected, *case_sensitive)
            }
            Comparator::KeywordCoverage(kc) => compare_keywords(submitted, expected, kc),
            Comparator::BooleanEqual => compare_booleans(submitted, expected),
        }
    }
}

// =============================================================================
// Annotated expectations
// =============================================================================

/// Answer-key node unpacked into the primary value plus auxiliary metadata.
#[derive(Default)]
struct Expectation<'a> {
    value: Option<&'a Value>,
    alternates: Vec<&'a Value>,
    tolerance: Option<f64>,
    /// `$tolerance` that was present but not a non-negative number.
    rejected_tolerance: Option<&'a Value>,
    require: Vec<String>,
}

impl<'a> Expectation<'a> {
    fn from_node(node: &'a Value) -> Self {
        let obj = match node {
            Value::Object(obj) if obj.contains_key(KEY_VALUE) => obj,
            Value::Null => return Self::default(),
            other => {
                return Self {
                    value: Some(other),
                    ..Self::default()
                }
            }
        };

        let raw_tolerance = obj.get(KEY_TOLERANCE).filter(|v| !v.is_null());
        let tolerance = raw_tolerance
            .and_then(coerce::to_number)
            .filter(|t| *t >= 0.0);

        Self {
            value: obj.get(KEY_VALUE).filter(|v| !v.is_null()),
            alternates: obj
                .get(KEY_ALTERNATES)
                .and_then(Value::as_array)
                .map(|alts| alts.iter().filter(|v| !v.is_null()).collect())
                .unwrap_or_default(),
            tolerance,
            rejected_tolerance: raw_tolerance.filter(|_| tolerance.is_none()),
            require: obj
                .get(KEY_REQUIRE)
                .and_then(coerce::to_items)
                .unwrap_or_default(),
        }
    }
}

// =============================================================================
// Strategies
// =============================================================================

fn compare_strings(submitted: &Value, expected: Option<&Value>, case_sensitive: bool) -> Outcome {
    let Some(expected) = expected else {
        return Outcome::fail(MISSING_EXPECTED);
    };
    let Some(sub) = coerce::to_text(submitted) else {
        return Outcome::invalid("text", submitted);
    };
    let Some(exp) = coerce::to_text(expected) else {
        return Outcome::invalid("text in answer key", expected);
    };

    if coerce::normalize_text(&sub, case_sensitive) == coerce::normalize_text(&exp, case_sensitive) {
        Outcome::pass("match")
    } else {
        Outcome::fail(format!("expected '{}', got '{}'", exp.trim(), sub.trim()))
    }
}

fn numbers(submitted: &Value, expected: Option<&Value>) -> std::result::Result<(f64, f64), Outcome> {
    let expected = expected.ok_or_else(|| Outcome::fail(MISSING_EXPECTED))?;
    let sub = coerce::to_number(submitted).ok_or_else(|| Outcome::invalid("number", submitted))?;
    let exp = coerce::to_number(expected)
        .ok_or_else(|| Outcome::invalid("number in answer key", expected))?;
    Ok((sub, exp))
}

fn within(diff: f64, limit: f64, scale: f64) -> bool {
    diff <= limit + FLOAT_SLACK * scale.max(1.0)
}

fn compare_absolute(submitted: &Value, expected: Option<&Value>, abs_tol: f64) -> Outcome {
    let (sub, exp) = match numbers(submitted, expected) {
        Ok(pair) => pair,
        Err(outcome) => return outcome,
    };

    let diff = if exp == 0.0 { sub.abs() } else { (sub - exp).abs() };
    if within(diff, abs_tol, exp.abs()) {
        Outcome::pass(format!("within tolerance (difference {})", coerce::format_number(diff)))
    } else {
        Outcome::fail(format!(
            "difference {} exceeds tolerance {} (expected {}, got {})",
            coerce::format_number(diff),
            abs_tol,
            coerce::format_number(exp),
            coerce::format_number(sub),
        ))
    }
}

fn compare_relative(submitted: &Value, expected: Option<&Value>, pct_tol: f64) -> Outcome {
    let (sub, exp) = match numbers(submitted, expected) {
        Ok(pair) => pair,
        Err(outcome) => return outcome,
    };

    let rel = (sub - exp).abs() / exp.abs().max(RELATIVE_EPSILON);
    if within(rel, pct_tol, 1.0) {
        Outcome::pass(format!("within tolerance (relative error {:.4}%)", rel * 100.0))
    } else {
        Outcome::fail(format!(
            "relative error {:.4}% exceeds tolerance {:.4}% (expected {}, got {})",
            rel * 100.0,
            pct_tol * 100.0,
            coerce::format_number(exp),
            coerce::format_number(sub),
        ))
    }
}

/// Range from params, falling back to an answer-key `[min, max]` or `{min, max}`.
fn range_bounds(expected: Option<&Value>, min: Option<f64>, max: Option<f64>) -> Option<(Option<f64>, Option<f64>)> {
    if min.is_some() || max.is_some() {
        return Some((min, max));
    }
    match expected? {
        Value::Array(arr) if arr.len() == 2 => {
            Some((coerce::to_number(&arr[0]), coerce::to_number(&arr[1])))
        }
        Value::Object(obj) => {
            let lo = obj.get("min").and_then(coerce::to_number);
            let hi = obj.get("max").and_then(coerce::to_number);
            (lo.is_some() || hi.is_some()).then_some((lo, hi))
        }
        _ => None,
    }
}

fn compare_range(submitted: &Value, expected: Option<&Value>, min: Option<f64>, max: Option<f64>) -> Outcome {
    let Some((lo, hi)) = range_bounds(expected, min, max) else {
        return Outcome::fail(format!("{}: no range defined for this field", INVALID_FORMAT));
    };
    let Some(sub) = coerce::to_number(submitted) else {
        return Outcome::invalid("number", submitted);
    };

    let above_min = lo.map_or(true, |lo| sub >= lo);
    let below_max = hi.map_or(true, |hi| sub <= hi);
    let shown = |b: Option<f64>, open: &str| b.map(coerce::format_number).unwrap_or_else(|| open.to_string());

    if above_min && below_max {
        Outcome::pass("within range")
    } else {
        Outcome::fail(format!(
            "{} outside range [{}, {}]",
            coerce::format_number(sub),
            shown(lo, "-inf"),
            shown(hi, "inf"),
        ))
    }
}

fn list_preview(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn compare_sets(submitted: &Value, expected: Option<&Value>) -> Outcome {
    let Some(expected) = expected else {
        return Outcome::fail(MISSING_EXPECTED);
    };
    let Some(sub) = coerce::to_set(submitted) else {
        return Outcome::invalid("list", submitted);
    };
    let Some(exp) = coerce::to_set(expected) else {
        return Outcome::invalid("list in answer key", expected);
    };

    if sub == exp {
        return Outcome::pass("match");
    }
    let missing: BTreeSet<String> = exp.difference(&sub).cloned().collect();
    let unexpected: BTreeSet<String> = sub.difference(&exp).cloned().collect();
    Outcome::fail(format!(
        "sets differ: missing [{}], unexpected [{}]",
        list_preview(&missing),
        list_preview(&unexpected),
    ))
}

fn compare_lists(submitted: &Value, expected: Option<&Value>, case_sensitive: bool) -> Outcome {
    let Some(expected) = expected else {
        return Outcome::fail(MISSING_EXPECTED);
    };
    let Some(sub) = coerce::to_items(submitted) else {
        return Outcome::invalid("list", submitted);
    };
    let Some(exp) = coerce::to_items(expected) else {
        return Outcome::invalid("list in answer key", expected);
    };

    if sub.len() != exp.len() {
        return Outcome::fail(format!(
            "length mismatch: expected {} items, got {}",
            exp.len(),
            sub.len()
        ));
    }

    let mismatch = sub
        .iter()
        .zip(exp.iter())
        .position(|(s, e)| coerce::normalize_text(s, case_sensitive) != coerce::normalize_text(e, case_sensitive));

    match mismatch {
        None => Outcome::pass("match"),
        Some(i) => Outcome::fail(format!(
            "item {} differs: expected '{}', got '{}'",
            i,
            exp[i].trim(),
            sub[i].trim()
        )),
    }
}

fn compare_keywords(submitted: &Value, expected: Option<&Value>, kc: &KeywordCoverage) -> Outcome {
    let keywords = match &kc.keywords {
        Some(list) => list
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>(),
        None => {
            let Some(expected) = expected else {
                return Outcome::fail(MISSING_EXPECTED);
            };
            let stop_words = kc.stop_words.clone().unwrap_or_else(coerce::default_stop_words);
            coerce::keywords(&coerce::searchable_text(expected), kc.min_token_len, &stop_words)
        }
    };

    if keywords.is_empty() {
        return Outcome::pass("no keywords to cover");
    }

    let text = coerce::searchable_text(submitted).to_lowercase();
    let found = keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
    let coverage = found as f64 / keywords.len() as f64;

    if coverage + FLOAT_SLACK >= kc.threshold {
        Outcome::pass(format!(
            "keyword coverage {:.2} ({}/{})",
            coverage,
            found,
            keywords.len()
        ))
    } else {
        let missing: Vec<&str> = keywords
            .iter()
            .filter(|kw| !text.contains(kw.as_str()))
            .map(String::as_str)
            .collect();
        Outcome::fail(format!(
            "keyword coverage {:.2} ({}/{}) below threshold {:.2}; missing [{}]",
            coverage,
            found,
            keywords.len(),
            kc.threshold,
            missing.join(", "),
        ))
    }
}

fn compare_booleans(submitted: &Value, expected: Option<&Value>) -> Outcome {
    let Some(expected) = expected else {
        return Outcome::fail(MISSING_EXPECTED);
    };
    let Some(sub) = coerce::to_bool(submitted) else {
        return Outcome::invalid("boolean", submitted);
    };
    let Some(exp) = coerce::to_bool(expected) else {
        return Outcome::invalid("boolean in answer key", expected);
    };

    if sub == exp {
        Outcome::pass("match")
    } else {
        Outcome::fail(format!("expected {}, got {}", exp, sub))
    }
}

// =============================================================================
// Parameter parsing
// =============================================================================

/// Reads typed comparator parameters and rejects keys nobody asked for.
struct Params<'a> {
    comparator: &'a str,
    map: &'a ObjectMap<String, Value>,
    consumed: Vec<&'a str>,
}

impl<'a> Params<'a> {
    fn new(comparator: &'a str, map: &'a ObjectMap<String, Value>) -> Self {
        Self {
            comparator,
            map,
            consumed: Vec::new(),
        }
    }

    fn error(&self, param: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidParam {
            comparator: self.comparator.to_string(),
            param: param.to_string(),
            reason: reason.into(),
        }
    }

    fn take(&mut self, keys: &[&'a str]) -> Option<(&'a str, &'a Value)> {
        let mut found = None;
        for key in keys {
            if let Some((k, v)) = self.map.get_key_value(*key) {
                self.consumed.push(k.as_str());
                found = found.or(Some((k.as_str(), v)));
            }
        }
        found
    }

    fn f64_opt(&mut self, keys: &[&'a str]) -> Result<Option<f64>> {
        match self.take(keys) {
            None => Ok(None),
            Some((key, v)) => v
                .as_float()
                .map(Some)
                .ok_or_else(|| self.error(key, format!("expected a number, got {}", v.type_name()))),
        }
    }

    fn required_f64(&mut self, keys: &[&'a str]) -> Result<f64> {
        self.f64_opt(keys)?
            .ok_or_else(|| self.error(keys[0], "required parameter is missing"))
    }

    fn bool_or(&mut self, key: &'a str, default: bool) -> Result<bool> {
        match self.take(&[key]) {
            None => Ok(default),
            Some((key, v)) => v
                .as_bool()
                .ok_or_else(|| self.error(key, format!("expected a boolean, got {}", v.type_name()))),
        }
    }

    fn usize_opt(&mut self, key: &'a str) -> Result<Option<usize>> {
        match self.take(&[key]) {
            None => Ok(None),
            Some((key, v)) => v
                .as_int()
                .and_then(|i| usize::try_from(i).ok())
                .map(Some)
                .ok_or_else(|| self.error(key, format!("expected a non-negative integer, got {}", v))),
        }
    }

    fn strings_opt(&mut self, key: &'a str) -> Result<Option<Vec<String>>> {
        match self.take(&[key]) {
            None => Ok(None),
            Some((key, v)) => v
                .as_array()
                .and_then(|arr| arr.iter().map(|item| item.as_str().map(String::from)).collect::<Option<Vec<_>>>())
                .map(Some)
                .ok_or_else(|| self.error(key, "expected a list of strings")),
        }
    }

    fn finish(self) -> Result<()> {
        match self.map.keys().find(|k| !self.consumed.contains(&k.as_str())) {
            Some(unknown) => Err(self.error(unknown, "unknown parameter")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(json: &str) -> Value {
        Value::from_json(json).unwrap()
    }

    fn check(c: &Comparator, submitted: &str, expected: &str) -> Verdict {
        c.compare(Some(&v(submitted)), Some(&v(expected)))
    }

    fn params(json: &str) -> ObjectMap<String, Value> {
        v(json).as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_string_equal_default_normalizes() {
        let c = Comparator::string_equal();
        assert!(check(&c, r#""  acme   INSURANCE ""#, r#""Acme Insurance""#).matched);
        assert!(!check(&c, r#""Acme""#, r#""Acme Insurance""#).matched);
        assert!(check(&c, "42", r#""42""#).matched);
    }

    #[test]
    fn test_string_equal_case_sensitive() {
        let c = Comparator::exact();
        assert!(!check(&c, r#""acme""#, r#""Acme""#).matched);
        assert!(check(&c, r#"" Acme ""#, r#""Acme""#).matched);
    }

    #[test]
    fn test_numeric_tolerance_boundary_inclusive() {
        let c = Comparator::numeric_tolerance(0.01);
        assert!(check(&c, "100.01", "100.00").matched);
        assert!(!check(&c, "100.02", "100.00").matched);
        assert!(check(&c, "99.99", "100").matched);
    }

    #[test]
    fn test_numeric_tolerance_zero_expected() {
        let c = Comparator::numeric_tolerance(0.5);
        assert!(check(&c, "-0.4", "0").matched);
        assert!(!check(&c, "0.6", "0").matched);
    }

    #[test]
    fn test_numeric_tolerance_accepts_currency_strings() {
        let c = Comparator::numeric_tolerance(1.0);
        assert!(check(&c, r#""$1,250.40""#, "1250").matched);
    }

    #[test]
    fn test_numeric_invalid_format() {
        let c = Comparator::numeric_tolerance(0.01);
        let verdict = check(&c, r#""about a hundred""#, "100");
        assert!(!verdict.matched);
        assert!(verdict.detail.reason.starts_with(INVALID_FORMAT));
        assert_eq!(verdict.weight_earned, 0.0);
    }

    #[test]
    fn test_percentage_tolerance() {
        let c = Comparator::percentage_tolerance(0.005);
        assert!(check(&c, "201", "200").matched);
        assert!(!check(&c, "202", "200").matched);
        assert!(check(&c, "199", "200").matched);
    }

    #[test]
    fn test_range_match_inclusive() {
        let c = Comparator::range(10.0, 20.0);
        assert!(check(&c, "10", "null").matched);
        assert!(check(&c, "20", "null").matched);
        assert!(!check(&c, "20.5", "null").matched);
        let verdict = check(&c, r#""n/a""#, "null");
        assert!(verdict.detail.reason.starts_with(INVALID_FORMAT));
    }

    #[test]
    fn test_range_from_answer_key() {
        let c = Comparator::RangeMatch { min: None, max: None };
        assert!(check(&c, "15", "[10, 20]").matched);
        assert!(check(&c, "15", r#"{"min": 10}"#).matched);
        assert!(!check(&c, "25", r#"{"min": 10, "max": 20}"#).matched);
        assert!(!check(&c, "15", r#""ten""#).matched);
    }

    #[test]
    fn test_set_vs_ordered_list() {
        let set = Comparator::set_equal();
        let list = Comparator::ordered_list_equal();
        assert!(check(&set, r#"["B","A"]"#, r#"["A","B"]"#).matched);
        assert!(!check(&list, r#"["B","A"]"#, r#"["A","B"]"#).matched);
        assert!(check(&list, r#"["a"," b "]"#, r#"["A","B"]"#).matched);
    }

    #[test]
    fn test_set_ignores_duplicates_and_reports_difference() {
        let c = Comparator::set_equal();
        assert!(check(&c, r#"["a","A","b"]"#, r#"["b","a"]"#).matched);
        let verdict = check(&c, r#"["a","c"]"#, r#"["a","b"]"#);
        assert!(!verdict.matched);
        assert!(verdict.detail.reason.contains("missing [b]"));
        assert!(verdict.detail.reason.contains("unexpected [c]"));
    }

    #[test]
    fn test_ordered_list_length_mismatch() {
        let c = Comparator::ordered_list_equal();
        let verdict = check(&c, r#"["a","b","c"]"#, r#"["a","b"]"#);
        assert!(!verdict.matched);
        assert!(verdict.detail.reason.starts_with("length mismatch"));
    }

    #[test]
    fn test_keyword_coverage() {
        let c = Comparator::keyword_coverage(0.6);
        let expected = r#""must reference subrogation and liability""#;
        assert!(check(&c, r#""The insurer pursues subrogation; liability rests with the driver.""#, expected).matched);
        assert!(!check(&c, r#""The weather was nice.""#, expected).matched);
    }

    #[test]
    fn test_keyword_coverage_explicit_keywords() {
        let c = Comparator::from_name(
            "keyword_coverage",
            &params(r#"{"keywords": ["deductible", "premium"], "threshold": 1.0}"#),
        )
        .unwrap();
        assert!(check(&c, r#""Premium rises after the deductible.""#, "null").matched);
        assert!(!check(&c, r#""Premium only.""#, "null").matched);
    }

    #[test]
    fn test_boolean_equal() {
        let c = Comparator::boolean_equal();
        assert!(check(&c, r#""TRUE""#, "true").matched);
        assert!(check(&c, "false", r#""no""#).matched);
        assert!(!check(&c, r#""yes""#, "false").matched);
        assert!(check(&c, "1", "true").detail.reason.starts_with(INVALID_FORMAT));
    }

    #[test]
    fn test_missing_and_null_submitted() {
        let c = Comparator::string_equal();
        let verdict = c.compare(None, Some(&Value::from("x")));
        assert!(!verdict.matched);
        assert_eq!(verdict.detail.reason, MISSING_FIELD);
        let verdict = c.compare(Some(&Value::Null), Some(&Value::from("x")));
        assert_eq!(verdict.detail.reason, MISSING_FIELD);
    }

    #[test]
    fn test_missing_expected() {
        let verdict = Comparator::string_equal().compare(Some(&Value::from("x")), None);
        assert!(!verdict.matched);
        assert_eq!(verdict.detail.reason, MISSING_EXPECTED);
    }

    #[test]
    fn test_annotated_alternates() {
        let c = Comparator::string_equal();
        let expected = v(r#"{"$value": "Acme Insurance", "$alternates": ["Acme", "Acme Ins."]}"#);
        let verdict = c.compare(Some(&Value::from("acme ins.")), Some(&expected));
        assert!(verdict.matched);
        assert!(verdict.detail.reason.starts_with("matched alternate #2"));
        assert_eq!(verdict.detail.expected, Some(Value::from("Acme Insurance")));
    }

    #[test]
    fn test_annotated_tolerance_override() {
        let c = Comparator::numeric_tolerance(0.01);
        let expected = v(r#"{"$value": 100, "$tolerance": 5}"#);
        assert!(c.compare(Some(&Value::Int(104)), Some(&expected)).matched);
        assert!(!c.compare(Some(&Value::Int(106)), Some(&expected)).matched);
    }

    #[test]
    fn test_invalid_annotated_tolerance_is_reported() {
        let c = Comparator::numeric_tolerance(0.01);
        for raw in [r#"-5"#, r#""wide""#] {
            let expected = v(&format!(r#"{{"$value": 100, "$tolerance": {}}}"#, raw));
            let verdict = c.compare(Some(&Value::Int(104)), Some(&expected));
            assert!(!verdict.matched, "param tolerance applies for {}", raw);
            assert!(verdict.detail.reason.contains("ignored invalid $tolerance"), "{}", verdict.detail.reason);

            let exact = c.compare(Some(&Value::Int(100)), Some(&expected));
            assert!(exact.matched);
            assert!(exact.detail.reason.contains("ignored invalid $tolerance"));
        }
    }

    #[test]
    fn test_keyword_stop_words_ignore_case() {
        let c = Comparator::KeywordCoverage(KeywordCoverage {
            threshold: 1.0,
            stop_words: Some(vec!["Must".into(), " Reference ".into()]),
            ..KeywordCoverage::default()
        });
        let expected = Value::from("must reference subrogation and liability");
        let verdict = c.compare(Some(&Value::from("subrogation and liability")), Some(&expected));
        assert!(verdict.matched, "{}", verdict.detail.reason);
    }

    #[test]
    fn test_annotated_required_substrings() {
        let c = Comparator::keyword_coverage(0.5);
        let expected = v(r#"{"$value": "driver liability negligence", "$require": ["negligence"]}"#);
        let ok = c.compare(Some(&Value::from("Driver negligence caused it")), Some(&expected));
        assert!(ok.matched);
        let missing = c.compare(Some(&Value::from("driver liability")), Some(&expected));
        assert!(!missing.matched);
        assert_eq!(missing.detail.reason, "missing required substring 'negligence'");
    }

    #[test]
    fn test_from_name_and_aliases() {
        let c = Comparator::from_name("numeric_tolerance", &params(r#"{"abs": 0.5}"#)).unwrap();
        assert_eq!(c, Comparator::numeric_tolerance(0.5));
        let c = Comparator::from_name("percentage_tolerance", &params(r#"{"pct": 0.005}"#)).unwrap();
        assert_eq!(c, Comparator::percentage_tolerance(0.005));
        let c = Comparator::from_name("exact", &ObjectMap::new()).unwrap();
        assert_eq!(c, Comparator::exact());
        let c = Comparator::from_name("Keyword_Coverage", &ObjectMap::new()).unwrap();
        assert_eq!(c, Comparator::keyword_coverage(0.6));
    }

    #[test]
    fn test_from_name_rejects_bad_config() {
        assert_eq!(
            Comparator::from_name("fuzzy_match", &ObjectMap::new()),
            Err(ConfigError::UnknownComparator("fuzzy_match".to_string()))
        );
        let cases = [
            ("numeric_tolerance", "{}"),
            ("numeric_tolerance", r#"{"abs_tol": -1}"#),
            ("numeric_tolerance", r#"{"abs_tol": "0.1"}"#),
            ("range_match", r#"{"min": 5, "max": 1}"#),
            ("keyword_coverage", r#"{"threshold": 0}"#),
            ("keyword_coverage", r#"{"min_token_len": 0}"#),
            ("set_equal", r#"{"case_sensitive": true}"#),
            ("string_equal", r#"{"case_sensitive": "yes"}"#),
        ];
        for (name, p) in cases {
            assert!(
                matches!(Comparator::from_name(name, &params(p)), Err(ConfigError::InvalidParam { .. })),
                "{} {} should be rejected",
                name,
                p
            );
        }
    }

    #[test]
    fn test_with_weight() {
        let verdict = check(&Comparator::string_equal(), r#""a""#, r#""a""#).with_weight(2.5);
        assert_eq!(verdict.weight_earned, 2.5);
        let verdict = check(&Comparator::string_equal(), r#""a""#, r#""b""#).with_weight(2.5);
        assert_eq!(verdict.weight_earned, 0.0);
    }
}
