//! Report output

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use rubric::EvaluationReport;

/// One graded submission, as written to disk
#[derive(Debug, Clone, Serialize)]
pub struct ReportEnvelope {
    pub submission_id: String,
    pub exam_id: String,
    pub graded_at: String,
    pub report: EvaluationReport,
}

impl ReportEnvelope {
    pub fn new(submission_id: impl Into<String>, exam_id: impl Into<String>, report: EvaluationReport) -> Self {
        Self {
            submission_id: submission_id.into(),
            exam_id: exam_id.into(),
            graded_at: chrono::Utc::now().to_rfc3339(),
            report,
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>, pretty: bool) -> std::io::Result<()> {
        let json = self
            .to_json(pretty)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    pub fn file_name(&self) -> String {
        format!("{}.report.json", self.submission_id)
    }
}

/// Per-submission line of a batch summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub submission_id: String,
    pub earned: f64,
    pub max: f64,
    pub pct: f64,
    pub passed: bool,
    pub label: Option<String>,
    pub decision: String,
}

/// Batch summary export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingSummary {
    pub exam_id: String,
    pub timestamp: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub average_pct: f64,
    pub label_counts: IndexMap<String, usize>,
    pub results: Vec<SummaryRow>,
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl GradingSummary {
    pub fn from_envelopes(exam_id: impl Into<String>, envelopes: &[ReportEnvelope], skipped: Vec<String>) -> Self {
        let results: Vec<SummaryRow> = envelopes
            .iter()
            .map(|env| SummaryRow {
                submission_id: env.submission_id.clone(),
                earned: env.report.overall.earned,
                max: env.report.overall.max,
                pct: env.report.overall.pct,
                passed: env.report.passed,
                label: env.report.label.clone(),
                decision: env.report.decision.clone(),
            })
            .collect();

        let passed = results.iter().filter(|r| r.passed).count();
        let average_pct = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.pct).sum::<f64>() / results.len() as f64
        };

        let mut label_counts = IndexMap::new();
        for label in results.iter().filter_map(|r| r.label.as_ref()) {
            *label_counts.entry(label.clone()).or_insert(0) += 1;
        }

        Self {
            exam_id: exam_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            total: results.len(),
            passed,
            failed: results.len() - passed,
            average_pct,
            label_counts,
            results,
            skipped,
        }
    }

    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Print one graded submission to the console
pub fn print_console_report(envelope: &ReportEnvelope) {
    let report = &envelope.report;
    println!("\n=== {} / {} ===\n", envelope.exam_id, envelope.submission_id);

    println!("Sections:");
    println!("{:-<50}", "");
    for section in &report.per_section {
        println!(
            "  {} - {:.1}/{:.1} ({:.1}%), {}/{} correct",
            section.name,
            section.earned,
            section.max,
            section.pct * 100.0,
            section.correct,
            section.total
        );
    }

    let misses: Vec<_> = report.misses().collect();
    if !misses.is_empty() {
        println!("\nMissed Criteria:");
        println!("{:-<50}", "");
        for result in misses {
            let marker = if result.critical { " [critical]" } else { "" };
            println!("  {}{}: {}", result.criterion_id, marker, result.verdict.detail.reason);
        }
    }

    println!(
        "\nOverall: {:.1}/{:.1} ({:.1}%)",
        report.overall.earned,
        report.overall.max,
        report.overall.pct * 100.0
    );
    println!("Result: {}", if report.passed { "PASS" } else { "FAIL" });
    if let Some(label) = &report.label {
        println!("Label: {}", label);
    }
    if let Some(failure) = &report.failure {
        println!("Reason: {}", failure);
    }
    println!("\n{:=<50}", "");
}

/// Print a batch summary to the console
pub fn print_summary(summary: &GradingSummary) {
    println!("\n=== Grading Summary: {} ===\n", summary.exam_id);
    println!(
        "Submissions: {} (passed {}, failed {})",
        summary.total, summary.passed, summary.failed
    );
    println!("Average score: {:.1}%\n", summary.average_pct * 100.0);

    println!("Results:");
    println!("{:-<50}", "");
    for row in &summary.results {
        println!(
            "  {} - {:.1}% {} {}",
            row.submission_id,
            row.pct * 100.0,
            if row.passed { "PASS" } else { "FAIL" },
            row.label.as_deref().unwrap_or("")
        );
    }

    if !summary.label_counts.is_empty() {
        println!("\nLabels:");
        println!("{:-<50}", "");
        for (label, count) in &summary.label_counts {
            println!("  {}: {}", label, count);
        }
    }

    if !summary.skipped.is_empty() {
        println!("\nSkipped:");
        println!("{:-<50}", "");
        for path in &summary.skipped {
            println!("  {}", path);
        }
    }

    println!("\n{:=<50}", "");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubric::{evaluate, Comparator, Criterion, Rubric, Section, Value};

    fn envelope(id: &str, answer: &str) -> ReportEnvelope {
        let rubric = Rubric::builder("r")
            .section(Section::new("s").criterion(Criterion::new("a", Comparator::string_equal()).unwrap()))
            .build()
            .unwrap();
        let key = Value::from_json(r#"{"a": "yes"}"#).unwrap();
        let submission = Value::from_json(&format!(r#"{{"a": "{}"}}"#, answer)).unwrap();
        ReportEnvelope::new(id, "exam", evaluate(&rubric, &submission, &key))
    }

    #[test]
    fn test_summary_counts() {
        let envelopes = vec![envelope("a", "yes"), envelope("b", "no"), envelope("c", "yes")];
        let summary = GradingSummary::from_envelopes("exam", &envelopes, vec!["bad.json".to_string()]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert!((summary.average_pct - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.label_counts.get("Excellent"), Some(&2));
        assert_eq!(summary.label_counts.get("Unsatisfactory"), Some(&1));
        assert_eq!(summary.skipped, vec!["bad.json"]);
    }

    #[test]
    fn test_empty_summary() {
        let summary = GradingSummary::from_envelopes("exam", &[], Vec::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_pct, 0.0);
    }

    #[test]
    fn test_envelope_json() {
        let env = envelope("alice", "yes");
        assert_eq!(env.file_name(), "alice.report.json");
        let parsed: serde_json::Value = serde_json::from_str(&env.to_json(false).unwrap()).unwrap();
        assert_eq!(parsed["submission_id"], "alice");
        assert_eq!(parsed["report"]["passed"], true);
        assert!(parsed["graded_at"].as_str().is_some());
    }
}
