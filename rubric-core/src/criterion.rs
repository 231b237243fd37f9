//! Criteria: one field, one comparator, one weight

use serde::Serialize;

use crate::comparator::{Comparator, Verdict};
use crate::path::FieldPath;
use crate::types::{ConfigError, Result, Value};

/// A single checkable field of a rubric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Criterion {
    pub id: String,
    pub field_path: FieldPath,
    pub comparator: Comparator,
    pub weight: f64,
    pub critical: bool,
    /// Owning section; filled in when the criterion is added to a section.
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Criterion {
    /// Create a criterion with weight 1. The id defaults to the field path.
    pub fn new(field: &str, comparator: Comparator) -> Result<Self> {
        let field_path = FieldPath::parse(field)?;
        Ok(Self {
            id: field_path.to_string(),
            field_path,
            comparator,
            weight: 1.0,
            critical: false,
            section: String::new(),
            description: None,
        })
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::InvalidCriterionId {
                path: self.field_path.to_string(),
                reason: "id is empty".to_string(),
            });
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(ConfigError::InvalidWeight {
                criterion: self.id.clone(),
                weight: self.weight,
            });
        }
        self.comparator.validate()
    }

    /// Resolve this criterion's field in both documents and compare.
    pub fn judge(&self, submission: &Value, answer_key: &Value) -> Verdict {
        let submitted = self.field_path.resolve(submission);
        let expected = self.field_path.resolve(answer_key);
        let verdict = self
            .comparator
            .compare(submitted, expected)
            .with_weight(self.weight);

        tracing::debug!(
            criterion = %self.id,
            comparator = self.comparator.name(),
            matched = verdict.matched,
            reason = %verdict.detail.reason,
            "criterion judged"
        );
        verdict
    }
}
