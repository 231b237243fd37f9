//! Evaluation reports

use serde::Serialize;

use crate::comparator::Verdict;
use crate::policy::GateFailure;
use crate::rubric::SectionThreshold;

/// Earned and maximum weight with their ratio. `pct` is 0 when `max` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub earned: f64,
    pub max: f64,
    pub pct: f64,
}

impl Score {
    pub fn new(earned: f64, max: f64) -> Self {
        let pct = if max > 0.0 { earned / max } else { 0.0 };
        Self { earned, max, pct }
    }
}

/// Verdict of one criterion, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionResult {
    pub criterion_id: String,
    pub section: String,
    pub field_path: String,
    pub comparator: String,
    pub weight: f64,
    pub critical: bool,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionScore {
    pub name: String,
    pub earned: f64,
    pub max: f64,
    pub pct: f64,
    pub correct: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<SectionThreshold>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalFailure {
    pub criterion_id: String,
    pub section: String,
    pub field_path: String,
    pub reason: String,
}

/// Full result of evaluating one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub rubric: String,
    pub per_criterion: Vec<CriterionResult>,
    pub per_section: Vec<SectionScore>,
    pub overall: Score,
    pub critical_failures: Vec<CriticalFailure>,
    pub passed: bool,
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<GateFailure>,
    /// Human-readable form of the decision, e.g. `pass (Excellent)`.
    pub decision: String,
}

impl EvaluationReport {
    pub fn section(&self, name: &str) -> Option<&SectionScore> {
        self.per_section.iter().find(|s| s.name == name)
    }

    pub fn criterion(&self, id: &str) -> Option<&CriterionResult> {
        self.per_criterion.iter().find(|c| c.criterion_id == id)
    }

    pub fn matched_count(&self) -> usize {
        self.per_criterion.iter().filter(|c| c.verdict.matched).count()
    }

    /// Results that did not match, in rubric order.
    pub fn misses(&self) -> impl Iterator<Item = &CriterionResult> {
        self.per_criterion.iter().filter(|c| !c.verdict.matched)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
