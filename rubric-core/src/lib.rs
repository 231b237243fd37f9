//! Rubric - declarative grading of structured answers
//!
//! A [`Rubric`] groups weighted [`Criterion`]s into sections. Each criterion
//! reads one field from the submission and the answer key and compares the two
//! with a named [`Comparator`]. The [`evaluate`] function scores every
//! criterion, totals sections and the overall score, and applies the rubric's
//! [`PassPolicy`] to reach a pass/fail decision and a label.
//!
//! # Example
//!
//! ```rust
//! use rubric::{evaluate, Rubric, Value};
//!
//! let rubric = Rubric::from_toml(r#"
//!     name = "claims-exam"
//!
//!     [policy]
//!     overall_min_pct = 0.5
//!
//!     [[sections]]
//!     name = "task_1"
//!
//!     [[sections.criteria]]
//!     field = "task_1.reserve_amount"
//!     comparator = "numeric_tolerance"
//!     params = { abs_tol = 0.01 }
//!     critical = true
//!
//!     [[sections.criteria]]
//!     field = "task_1.parties"
//!     comparator = "set_equal"
//! "#).unwrap();
//!
//! let key = Value::from_json(r#"{"task_1": {"reserve_amount": 1500, "parties": ["insurer", "claimant"]}}"#).unwrap();
//! let submission = Value::from_json(r#"{"task_1": {"reserve_amount": "$1,500.00", "parties": "Claimant; Insurer"}}"#).unwrap();
//!
//! let report = evaluate(&rubric, &submission, &key);
//! assert!(report.passed);
//! assert_eq!(report.overall.pct, 1.0);
//! ```

mod types;
mod path;
mod coerce;
mod comparator;
mod criterion;
mod rubric;
mod report;
mod policy;
mod evaluator;

pub use types::{ConfigError, ObjectMap, Result, Value};
pub use path::{FieldPath, Segment};
pub use comparator::{
    Comparator, KeywordCoverage, Verdict, VerdictDetail, INVALID_FORMAT, KEY_ALTERNATES,
    KEY_REQUIRE, KEY_TOLERANCE, KEY_VALUE, MISSING_EXPECTED, MISSING_FIELD,
};
pub use coerce::DEFAULT_STOP_WORDS;
pub use criterion::Criterion;
pub use rubric::{CriterionSpec, Rubric, RubricBuilder, RubricSpec, Section, SectionSpec, SectionThreshold};
pub use report::{CriterionResult, CriticalFailure, EvaluationReport, Score, SectionScore};
pub use policy::{decide, Decision, GateFailure, LabelThreshold, PassPolicy};
pub use evaluator::{evaluate, Evaluator};
