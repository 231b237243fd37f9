//! Pass/fail decision and performance labels
//!
//! Gates run in a fixed order and the first one that fails decides:
//!
//! 1. critical criteria (when `critical_must_all_pass`)
//! 2. overall percentage against `overall_min_pct`
//! 3. every section against its own threshold, or the policy-wide default
//!
//! The label comes from the ladder, highest `min_pct` first. A pass vetoed by
//! the critical or section gate always gets the fallback label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::report::{EvaluationReport, SectionScore};
use crate::rubric::SectionThreshold;
use crate::types::{ConfigError, Result};

/// Tolerance for comparing percentages against thresholds.
const PCT_SLACK: f64 = 1e-9;

fn default_overall_min_pct() -> f64 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_label_thresholds() -> Vec<LabelThreshold> {
    vec![
        LabelThreshold::new(0.85, "Excellent"),
        LabelThreshold::new(0.70, "Satisfactory"),
        LabelThreshold::new(0.60, "Conditional"),
    ]
}

fn default_fallback_label() -> String {
    "Unsatisfactory".to_string()
}

/// Rules turning an evaluation into a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassPolicy {
    #[serde(default = "default_overall_min_pct")]
    pub overall_min_pct: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_section_min_pct: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_section_min_correct: Option<usize>,

    #[serde(default = "default_true")]
    pub critical_must_all_pass: bool,

    #[serde(default = "default_label_thresholds")]
    pub label_thresholds: Vec<LabelThreshold>,

    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,
}

impl Default for PassPolicy {
    fn default() -> Self {
        Self {
            overall_min_pct: default_overall_min_pct(),
            per_section_min_pct: None,
            per_section_min_correct: None,
            critical_must_all_pass: default_true(),
            label_thresholds: default_label_thresholds(),
            fallback_label: default_fallback_label(),
        }
    }
}

/// One rung of the label ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelThreshold {
    pub min_pct: f64,
    pub label: String,
}

impl LabelThreshold {
    pub fn new(min_pct: f64, label: impl Into<String>) -> Self {
        Self {
            min_pct,
            label: label.into(),
        }
    }
}

fn check_fraction(scope: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            scope: scope.to_string(),
            reason: format!("{} is outside [0, 1]", value),
        })
    }
}

impl PassPolicy {
    pub fn overall_min_pct(mut self, pct: f64) -> Self {
        self.overall_min_pct = pct;
        self
    }

    pub fn per_section_min_pct(mut self, pct: f64) -> Self {
        self.per_section_min_pct = Some(pct);
        self
    }

    pub fn per_section_min_correct(mut self, count: usize) -> Self {
        self.per_section_min_correct = Some(count);
        self
    }

    pub fn critical_must_all_pass(mut self, enabled: bool) -> Self {
        self.critical_must_all_pass = enabled;
        self
    }

    pub fn labels(mut self, ladder: Vec<LabelThreshold>) -> Self {
        self.label_thresholds = ladder;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_fraction("policy.overall_min_pct", self.overall_min_pct)?;
        if let Some(pct) = self.per_section_min_pct {
            check_fraction("policy.per_section_min_pct", pct)?;
        }
        for rung in &self.label_thresholds {
            check_fraction(&format!("label '{}'", rung.label), rung.min_pct)?;
            if rung.label.trim().is_empty() {
                return Err(ConfigError::InvalidThreshold {
                    scope: "policy.label_thresholds".to_string(),
                    reason: "label text is empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Section thresholds applied to sections that declare none.
    pub fn default_section_thresholds(&self) -> Vec<SectionThreshold> {
        self.per_section_min_pct
            .map(SectionThreshold::MinPct)
            .into_iter()
            .chain(self.per_section_min_correct.map(SectionThreshold::MinCorrect))
            .collect()
    }

    /// Ladder label for `pct`, or the fallback when no rung is reached.
    /// An empty ladder yields no label.
    pub fn label_for(&self, pct: f64) -> Option<String> {
        if self.label_thresholds.is_empty() {
            return None;
        }
        let mut ladder: Vec<&LabelThreshold> = self.label_thresholds.iter().collect();
        ladder.sort_by(|a, b| b.min_pct.total_cmp(&a.min_pct));
        let label = ladder
            .into_iter()
            .find(|rung| pct + PCT_SLACK >= rung.min_pct)
            .map(|rung| rung.label.clone())
            .unwrap_or_else(|| self.fallback_label.clone());
        Some(label)
    }
}

// =============================================================================
// Decision
// =============================================================================

/// The gate that blocked a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateFailure {
    CriticalFailed {
        criteria: Vec<String>,
    },
    OverallBelowMinimum {
        pct: f64,
        min_pct: f64,
    },
    SectionBelowMinimum {
        section: String,
        pct: f64,
        correct: usize,
        threshold: SectionThreshold,
    },
}

impl GateFailure {
    /// Critical and section failures veto the ladder label.
    pub fn vetoes_label(&self) -> bool {
        !matches!(self, GateFailure::OverallBelowMinimum { .. })
    }
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateFailure::CriticalFailed { criteria } => {
                write!(f, "critical criteria failed: {}", criteria.join(", "))
            }
            GateFailure::OverallBelowMinimum { pct, min_pct } => write!(
                f,
                "overall score {:.1}% is below the minimum {:.1}%",
                pct * 100.0,
                min_pct * 100.0
            ),
            GateFailure::SectionBelowMinimum {
                section,
                pct,
                correct,
                threshold,
            } => match threshold {
                SectionThreshold::MinPct(min) => write!(
                    f,
                    "section '{}' scored {:.1}%, below its minimum {:.1}%",
                    section,
                    pct * 100.0,
                    min * 100.0
                ),
                SectionThreshold::MinCorrect(min) => write!(
                    f,
                    "section '{}' has {} correct, below its minimum {}",
                    section, correct, min
                ),
            },
        }
    }
}

/// Final outcome of applying a [`PassPolicy`] to a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub passed: bool,
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<GateFailure>,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            None => write!(f, "pass")?,
            Some(failure) => write!(f, "fail: {}", failure)?,
        }
        if let Some(label) = &self.label {
            write!(f, " ({})", label)?;
        }
        Ok(())
    }
}

fn section_shortfall(section: &SectionScore, policy: &PassPolicy) -> Option<GateFailure> {
    let thresholds = match section.threshold {
        Some(own) => vec![own],
        None => policy.default_section_thresholds(),
    };
    thresholds
        .into_iter()
        .find(|t| !t.is_met(section.pct, section.correct))
        .map(|threshold| GateFailure::SectionBelowMinimum {
            section: section.name.clone(),
            pct: section.pct,
            correct: section.correct,
            threshold,
        })
}

fn first_failure(report: &EvaluationReport, policy: &PassPolicy) -> Option<GateFailure> {
    if policy.critical_must_all_pass && !report.critical_failures.is_empty() {
        return Some(GateFailure::CriticalFailed {
            criteria: report
                .critical_failures
                .iter()
                .map(|cf| cf.criterion_id.clone())
                .collect(),
        });
    }

    if report.overall.pct + PCT_SLACK < policy.overall_min_pct {
        return Some(GateFailure::OverallBelowMinimum {
            pct: report.overall.pct,
            min_pct: policy.overall_min_pct,
        });
    }

    report
        .per_section
        .iter()
        .find_map(|section| section_shortfall(section, policy))
}

/// Apply `policy` to the scores in `report`. The report's own decision
/// fields are ignored.
pub fn decide(report: &EvaluationReport, policy: &PassPolicy) -> Decision {
    let failure = first_failure(report, policy);
    let label = match &failure {
        Some(f) if f.vetoes_label() && !policy.label_thresholds.is_empty() => {
            Some(policy.fallback_label.clone())
        }
        _ => policy.label_for(report.overall.pct),
    };

    Decision {
        passed: failure.is_none(),
        label,
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CriticalFailure, Score};

    fn section(name: &str, earned: f64, max: f64, correct: usize, threshold: Option<SectionThreshold>) -> SectionScore {
        let score = Score::new(earned, max);
        SectionScore {
            name: name.to_string(),
            earned: score.earned,
            max: score.max,
            pct: score.pct,
            correct,
            total: max as usize,
            threshold,
        }
    }

    fn report(sections: Vec<SectionScore>, critical: &[&str]) -> EvaluationReport {
        let earned = sections.iter().map(|s| s.earned).sum();
        let max = sections.iter().map(|s| s.max).sum();
        EvaluationReport {
            rubric: "test".to_string(),
            per_criterion: Vec::new(),
            per_section: sections,
            overall: Score::new(earned, max),
            critical_failures: critical
                .iter()
                .map(|id| CriticalFailure {
                    criterion_id: id.to_string(),
                    section: "s".to_string(),
                    field_path: id.to_string(),
                    reason: "expected 'x', got 'y'".to_string(),
                })
                .collect(),
            passed: false,
            label: None,
            failure: None,
            decision: String::new(),
        }
    }

    #[test]
    fn test_defaults() {
        let policy = PassPolicy::default();
        assert_eq!(policy.overall_min_pct, 0.7);
        assert!(policy.critical_must_all_pass);
        assert_eq!(policy.label_thresholds.len(), 3);
        assert_eq!(policy.fallback_label, "Unsatisfactory");
    }

    #[test]
    fn test_deserialize_partial() {
        let policy: PassPolicy = toml::from_str("overall_min_pct = 0.8\nper_section_min_pct = 0.5\n").unwrap();
        assert_eq!(policy.overall_min_pct, 0.8);
        assert_eq!(policy.per_section_min_pct, Some(0.5));
        assert!(policy.critical_must_all_pass);
        assert_eq!(policy.label_thresholds, default_label_thresholds());
    }

    #[test]
    fn test_unknown_policy_key_rejected() {
        assert!(toml::from_str::<PassPolicy>("overall_minimum = 0.8\n").is_err());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(PassPolicy::default().overall_min_pct(1.2).validate().is_err());
        assert!(PassPolicy::default().per_section_min_pct(-0.1).validate().is_err());
        assert!(PassPolicy::default()
            .labels(vec![LabelThreshold::new(0.9, " ")])
            .validate()
            .is_err());
        assert!(PassPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_critical_gate_vetoes_high_score() {
        let r = report(vec![section("a", 19.0, 20.0, 19, None)], &["a.policy_number"]);
        let decision = decide(&r, &PassPolicy::default());
        assert!(!decision.passed);
        assert_eq!(decision.label.as_deref(), Some("Unsatisfactory"));
        assert!(matches!(decision.failure, Some(GateFailure::CriticalFailed { .. })));
    }

    #[test]
    fn test_critical_gate_disabled() {
        let r = report(vec![section("a", 19.0, 20.0, 19, None)], &["a.policy_number"]);
        let decision = decide(&r, &PassPolicy::default().critical_must_all_pass(false));
        assert!(decision.passed);
        assert_eq!(decision.label.as_deref(), Some("Excellent"));
    }

    #[test]
    fn test_overall_gate_keeps_ladder_label() {
        let r = report(vec![section("a", 13.0, 20.0, 13, None)], &[]);
        let decision = decide(&r, &PassPolicy::default());
        assert!(!decision.passed);
        assert_eq!(decision.label.as_deref(), Some("Conditional"));
        assert!(matches!(decision.failure, Some(GateFailure::OverallBelowMinimum { .. })));
    }

    #[test]
    fn test_overall_boundary_inclusive() {
        let r = report(vec![section("a", 7.0, 10.0, 7, None)], &[]);
        assert!(decide(&r, &PassPolicy::default()).passed);
    }

    #[test]
    fn test_section_gate_own_threshold() {
        let r = report(
            vec![
                section("a", 10.0, 10.0, 10, None),
                section("b", 1.0, 3.0, 1, Some(SectionThreshold::MinCorrect(2))),
            ],
            &[],
        );
        let decision = decide(&r, &PassPolicy::default());
        assert!(!decision.passed);
        assert_eq!(decision.label.as_deref(), Some("Unsatisfactory"));
        assert_eq!(
            decision.failure.map(|f| f.to_string()).as_deref(),
            Some("section 'b' has 1 correct, below its minimum 2")
        );
    }

    #[test]
    fn test_section_gate_policy_default() {
        let r = report(
            vec![section("a", 12.0, 12.0, 12, None), section("b", 1.0, 3.0, 1, None)],
            &[],
        );
        assert!(decide(&r, &PassPolicy::default()).passed);
        let decision = decide(&r, &PassPolicy::default().per_section_min_pct(0.5));
        assert!(!decision.passed);
        assert!(matches!(
            decision.failure,
            Some(GateFailure::SectionBelowMinimum { ref section, .. }) if section == "b"
        ));
    }

    #[test]
    fn test_label_ladder_unsorted_and_empty() {
        let policy = PassPolicy::default().labels(vec![
            LabelThreshold::new(0.5, "Pass"),
            LabelThreshold::new(0.9, "Distinction"),
        ]);
        assert_eq!(policy.label_for(0.95).as_deref(), Some("Distinction"));
        assert_eq!(policy.label_for(0.6).as_deref(), Some("Pass"));
        assert_eq!(policy.label_for(0.1).as_deref(), Some("Unsatisfactory"));

        let r = report(vec![section("a", 1.0, 1.0, 1, None)], &["x"]);
        let decision = decide(&r, &PassPolicy::default().labels(Vec::new()));
        assert!(!decision.passed);
        assert_eq!(decision.label, None);
    }

    #[test]
    fn test_decision_display() {
        let r = report(vec![section("a", 9.0, 10.0, 9, None)], &[]);
        assert_eq!(decide(&r, &PassPolicy::default()).to_string(), "pass (Excellent)");
    }
}
