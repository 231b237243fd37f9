//! Grading runner for rubric exams
//!
//! Loads exam definitions (a rubric plus an answer key), reads candidate
//! submissions from JSON or TOML files, evaluates them with the `rubric`
//! engine and writes JSON reports.
//!
//! # Example
//!
//! ```no_run
//! use grading_runner::{documents::load_submission, exam::Exam, reporting::ReportEnvelope};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exam = Exam::load("exams/claims.toml")?;
//!     let submission = load_submission("submissions/alice.json")?;
//!
//!     let report = exam.evaluator().evaluate(&submission.document);
//!     let envelope = ReportEnvelope::new(&submission.id, &exam.id, report);
//!     envelope.write_to_file("results/alice.report.json", true)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod documents;
pub mod exam;
pub mod reporting;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{Config, GradingConfig, OutputConfig};
    pub use crate::documents::{
        load_document, load_submission, load_submissions_from_directory, LoadError, Submission,
        SubmissionSet,
    };
    pub use crate::exam::Exam;
    pub use crate::reporting::{print_console_report, print_summary, GradingSummary, ReportEnvelope};
}
