//! Exam definitions: a rubric plus its answer key
//!
//! ```toml
//! id = "claims-2024-q3"
//! title = "Claims adjuster certification"
//! answer_key = "answer_key.json"   # relative to this file, or an inline table
//!
//! [rubric]
//! name = "claims-exam"
//!
//! [[rubric.sections]]
//! name = "task_1"
//!
//! [[rubric.sections.criteria]]
//! field = "task_1.reserve_amount"
//! comparator = "numeric_tolerance"
//! params = { abs_tol = 0.01 }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use rubric::{Evaluator, Rubric, RubricSpec, Value};

use crate::config::Config;
use crate::documents::{load_document, LoadError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExamFile {
    id: String,
    #[serde(default)]
    title: Option<String>,
    answer_key: AnswerKeySource,
    rubric: RubricSpec,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnswerKeySource {
    Path(String),
    Inline(Value),
}

/// A loaded, validated exam
#[derive(Debug, Clone)]
pub struct Exam {
    pub id: String,
    pub title: Option<String>,
    pub rubric: Rubric,
    pub answer_key: Value,
}

impl Exam {
    /// Load an exam file. A relative `answer_key` path is resolved against
    /// the exam file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml(&content, base_dir)
            .map_err(|e| match e {
                LoadError::Parse(msg) => LoadError::Parse(format!("{}: {}", path.display(), msg)),
                other => other,
            })
    }

    /// Parse an exam from TOML, resolving answer-key paths against `base_dir`
    pub fn from_toml(content: &str, base_dir: &Path) -> Result<Self, LoadError> {
        let file: ExamFile = toml::from_str(content)
            .map_err(|e| LoadError::Parse(format!("Invalid exam definition: {}", e)))?;

        let rubric = Rubric::from_spec(file.rubric)?;
        let answer_key = match file.answer_key {
            AnswerKeySource::Inline(value) => value,
            AnswerKeySource::Path(relative) => {
                let key_path = resolve_relative(base_dir, &relative);
                if !key_path.is_file() {
                    return Err(LoadError::MissingAnswerKey(key_path));
                }
                load_document(&key_path)?
            }
        };

        tracing::debug!(
            exam = %file.id,
            sections = rubric.sections().len(),
            criteria = rubric.criterion_count(),
            "Loaded exam"
        );

        Ok(Self {
            id: file.id,
            title: file.title,
            rubric,
            answer_key,
        })
    }

    /// Apply runner-level overrides to the exam's pass policy
    pub fn with_config(mut self, config: &Config) -> Result<Self, LoadError> {
        let policy = config.apply_to(self.rubric.policy());
        self.rubric = self.rubric.with_policy(policy)?;
        Ok(self)
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.rubric, &self.answer_key)
    }
}

fn resolve_relative(base_dir: &Path, relative: &str) -> PathBuf {
    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}

/// Starter exam written by `grade init-exam`
pub const EXAM_TEMPLATE: &str = r#"id = "sample-exam"
title = "Sample claims exam"

[answer_key.task_1]
claim_number = "CLM-1001"
reserve_amount = 2500.00
coverage_confirmed = true
parties = ["insured", "claimant"]

[answer_key.task_2]
rationale = "Liability rests with the other driver, so the carrier pursues subrogation."
steps = ["acknowledge", "investigate", "settle"]

[rubric]
name = "sample-exam"

[rubric.policy]
overall_min_pct = 0.7
critical_must_all_pass = true
per_section_min_pct = 0.5

[[rubric.sections]]
name = "task_1"

[[rubric.sections.criteria]]
field = "task_1.claim_number"
comparator = "exact"
critical = true

[[rubric.sections.criteria]]
field = "task_1.reserve_amount"
comparator = "numeric_tolerance"
params = { abs_tol = 5.0 }
weight = 2.0

[[rubric.sections.criteria]]
field = "task_1.coverage_confirmed"
comparator = "boolean_equal"

[[rubric.sections.criteria]]
field = "task_1.parties"
comparator = "set_equal"

[[rubric.sections]]
name = "task_2"
min_correct = 1

[[rubric.sections.criteria]]
field = "task_2.rationale"
comparator = "keyword_coverage"
params = { threshold = 0.6 }

[[rubric.sections.criteria]]
field = "task_2.steps"
comparator = "ordered_list_equal"
"#;
