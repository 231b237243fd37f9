//! Walks a rubric over a submission and answer key

use crate::policy::decide;
use crate::report::{CriterionResult, CriticalFailure, EvaluationReport, Score, SectionScore};
use crate::rubric::Rubric;
use crate::types::Value;

/// Evaluate one submission. Never fails: missing or malformed fields become
/// non-matching verdicts.
pub fn evaluate(rubric: &Rubric, submission: &Value, answer_key: &Value) -> EvaluationReport {
    let mut per_criterion = Vec::with_capacity(rubric.criterion_count());
    let mut per_section = Vec::with_capacity(rubric.sections().len());
    let mut critical_failures = Vec::new();

    for section in rubric.sections() {
        let mut earned = 0.0;
        let mut correct = 0;

        for criterion in section.criteria() {
            let verdict = criterion.judge(submission, answer_key);
            earned += verdict.weight_earned;
            if verdict.matched {
                correct += 1;
            } else if criterion.critical {
                critical_failures.push(CriticalFailure {
                    criterion_id: criterion.id.clone(),
                    section: section.name().to_string(),
                    field_path: criterion.field_path.to_string(),
                    reason: verdict.detail.reason.clone(),
                });
            }

            per_criterion.push(CriterionResult {
                criterion_id: criterion.id.clone(),
                section: section.name().to_string(),
                field_path: criterion.field_path.to_string(),
                comparator: criterion.comparator.name().to_string(),
                weight: criterion.weight,
                critical: criterion.critical,
                verdict,
            });
        }

        let score = Score::new(earned, section.max_weight());
        per_section.push(SectionScore {
            name: section.name().to_string(),
            earned: score.earned,
            max: score.max,
            pct: score.pct,
            correct,
            total: section.criteria().len(),
            threshold: section.section_threshold(),
        });
    }

    let overall = Score::new(
        per_section.iter().map(|s| s.earned).sum(),
        per_section.iter().map(|s| s.max).sum(),
    );

    let mut report = EvaluationReport {
        rubric: rubric.name().to_string(),
        per_criterion,
        per_section,
        overall,
        critical_failures,
        passed: false,
        label: None,
        failure: None,
        decision: String::new(),
    };

    let decision = decide(&report, rubric.policy());
    report.decision = decision.to_string();
    report.passed = decision.passed;
    report.label = decision.label;
    report.failure = decision.failure;

    tracing::debug!(
        rubric = %report.rubric,
        earned = report.overall.earned,
        max = report.overall.max,
        passed = report.passed,
        "submission evaluated"
    );
    report
}

/// Evaluates many submissions against one rubric and answer key.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    rubric: &'a Rubric,
    answer_key: &'a Value,
}

impl<'a> Evaluator<'a> {
    pub fn new(rubric: &'a Rubric, answer_key: &'a Value) -> Self {
        Self { rubric, answer_key }
    }

    pub fn rubric(&self) -> &'a Rubric {
        self.rubric
    }

    pub fn evaluate(&self, submission: &Value) -> EvaluationReport {
        evaluate(self.rubric, submission, self.answer_key)
    }

    /// Evaluate submissions in order; one report per submission.
    pub fn evaluate_all<'s, I>(&self, submissions: I) -> Vec<EvaluationReport>
    where
        I: IntoIterator<Item = &'s Value>,
    {
        submissions
            .into_iter()
            .map(|submission| self.evaluate(submission))
            .collect()
    }
}
