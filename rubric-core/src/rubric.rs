//! Rubrics: ordered sections of weighted criteria plus a pass policy
//!
//! Rubrics are built either in code:
//!
//! ```
//! use rubric::{Comparator, Criterion, Rubric, Section};
//!
//! # fn main() -> rubric::Result<()> {
//! let rubric = Rubric::builder("claims-exam")
//!     .section(
//!         Section::new("task_1")
//!             .min_pct(0.5)
//!             .criterion(Criterion::new("task_1.reserve", Comparator::numeric_tolerance(0.01))?.critical(true))
//!             .criterion(Criterion::new("task_1.insurer", Comparator::string_equal())?),
//!     )
//!     .build()?;
//! assert_eq!(rubric.criterion_count(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! or declaratively from a [`RubricSpec`] in TOML or JSON.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::comparator::Comparator;
use crate::criterion::Criterion;
use crate::policy::PassPolicy;
use crate::types::{ConfigError, ObjectMap, Result, Value};

// =============================================================================
// Sections
// =============================================================================

/// Minimum a section must reach for the rubric to pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionThreshold {
    /// Fraction of the section's weight, in `[0, 1]`.
    MinPct(f64),
    /// Number of matched criteria.
    MinCorrect(usize),
}

impl SectionThreshold {
    pub fn is_met(&self, pct: f64, correct: usize) -> bool {
        match *self {
            SectionThreshold::MinPct(min) => pct + 1e-9 >= min,
            SectionThreshold::MinCorrect(min) => correct >= min,
        }
    }

    fn validate(&self, section: &str, criteria: usize) -> Result<()> {
        let invalid = |reason: String| ConfigError::InvalidThreshold {
            scope: format!("section '{}'", section),
            reason,
        };
        match *self {
            SectionThreshold::MinPct(min) if !(0.0..=1.0).contains(&min) => {
                Err(invalid(format!("min_pct {} is outside [0, 1]", min)))
            }
            SectionThreshold::MinCorrect(min) if min > criteria => Err(invalid(format!(
                "min_correct {} exceeds its {} criteria",
                min, criteria
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    name: String,
    criteria: Vec<Criterion>,
    threshold: Option<SectionThreshold>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            criteria: Vec::new(),
            threshold: None,
        }
    }

    /// Add a criterion; it is tagged with this section's name.
    pub fn criterion(mut self, mut criterion: Criterion) -> Self {
        criterion.section = self.name.clone();
        self.criteria.push(criterion);
        self
    }

    pub fn min_pct(mut self, pct: f64) -> Self {
        self.threshold = Some(SectionThreshold::MinPct(pct));
        self
    }

    pub fn min_correct(mut self, count: usize) -> Self {
        self.threshold = Some(SectionThreshold::MinCorrect(count));
        self
    }

    pub fn threshold(mut self, threshold: Option<SectionThreshold>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn section_threshold(&self) -> Option<SectionThreshold> {
        self.threshold
    }

    pub fn max_weight(&self) -> f64 {
        self.criteria.iter().map(|c| c.weight).sum()
    }
}

// =============================================================================
// Rubric
// =============================================================================

/// A validated rubric. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Rubric {
    name: String,
    sections: Vec<Section>,
    policy: PassPolicy,
}

pub struct RubricBuilder {
    name: String,
    sections: Vec<Section>,
    policy: PassPolicy,
}

impl RubricBuilder {
    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn policy(mut self, policy: PassPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<Rubric> {
        let rubric = Rubric {
            name: self.name,
            sections: self.sections,
            policy: self.policy,
        };
        rubric.validate()?;
        Ok(rubric)
    }
}

impl Rubric {
    pub fn builder(name: impl Into<String>) -> RubricBuilder {
        RubricBuilder {
            name: name.into(),
            sections: Vec::new(),
            policy: PassPolicy::default(),
        }
    }

    pub fn from_spec(spec: RubricSpec) -> Result<Self> {
        let mut builder = Rubric::builder(spec.name).policy(spec.policy);
        for section_spec in spec.sections {
            builder = builder.section(section_spec.into_section()?);
        }
        builder.build()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let spec: RubricSpec = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Invalid rubric TOML: {}", e)))?;
        Self::from_spec(spec)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let spec: RubricSpec = serde_json::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Invalid rubric JSON: {}", e)))?;
        Self::from_spec(spec)
    }

    /// Replace the pass policy, re-validating it.
    pub fn with_policy(mut self, policy: PassPolicy) -> Result<Self> {
        self.policy = policy;
        self.validate()?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn policy(&self) -> &PassPolicy {
        &self.policy
    }

    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.sections.iter().flat_map(|s| s.criteria.iter())
    }

    pub fn criterion_count(&self) -> usize {
        self.sections.iter().map(|s| s.criteria.len()).sum()
    }

    pub fn max_weight(&self) -> f64 {
        self.sections.iter().map(Section::max_weight).sum()
    }

    fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(ConfigError::EmptyRubric);
        }
        self.policy.validate()?;

        let mut section_names = HashSet::new();
        let mut criterion_ids = HashSet::new();
        for section in &self.sections {
            if !section_names.insert(section.name.as_str()) {
                return Err(ConfigError::DuplicateSection(section.name.clone()));
            }
            if section.criteria.is_empty() {
                return Err(ConfigError::EmptySection(section.name.clone()));
            }

            let thresholds = match section.threshold {
                Some(own) => vec![own],
                None => self.policy.default_section_thresholds(),
            };
            for threshold in thresholds {
                threshold.validate(&section.name, section.criteria.len())?;
            }

            for criterion in &section.criteria {
                criterion.validate()?;
                if !criterion_ids.insert(criterion.id.as_str()) {
                    return Err(ConfigError::DuplicateCriterion(criterion.id.clone()));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Declarative form
// =============================================================================

fn default_weight() -> f64 {
    1.0
}

/// Serialized rubric, as written in exam files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RubricSpec {
    pub name: String,
    #[serde(default)]
    pub policy: PassPolicy,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_correct: Option<usize>,
    #[serde(default)]
    pub criteria: Vec<CriterionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriterionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub field: String,
    pub comparator: String,
    #[serde(default)]
    pub params: ObjectMap<String, Value>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub critical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SectionSpec {
    fn into_section(self) -> Result<Section> {
        let threshold = match (self.min_pct, self.min_correct) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidThreshold {
                    scope: format!("section '{}'", self.name),
                    reason: "set either min_pct or min_correct, not both".to_string(),
                })
            }
            (Some(pct), None) => Some(SectionThreshold::MinPct(pct)),
            (None, Some(count)) => Some(SectionThreshold::MinCorrect(count)),
            (None, None) => None,
        };

        let mut section = Section::new(self.name).threshold(threshold);
        for spec in self.criteria {
            section = section.criterion(spec.into_criterion()?);
        }
        Ok(section)
    }
}

impl CriterionSpec {
    fn into_criterion(self) -> Result<Criterion> {
        let comparator = Comparator::from_name(&self.comparator, &self.params)?;
        let mut criterion = Criterion::new(&self.field, comparator)?
            .weight(self.weight)
            .critical(self.critical);
        if let Some(id) = self.id {
            criterion = criterion.with_id(id);
        }
        if let Some(description) = self.description {
            criterion = criterion.describe(description);
        }
        Ok(criterion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAIMS_RUBRIC: &str = r#"
name = "claims-exam"

[policy]
overall_min_pct = 0.8
per_section_min_pct = 0.5

[[sections]]
name = "task_1"
min_correct = 1

[[sections.criteria]]
field = "task_1.reserve_amount"
comparator = "numeric_tolerance"
params = { abs_tol = 0.01 }
weight = 2.0
critical = true

[[sections.criteria]]
id = "insurer"
field = "task_1.insurer"
comparator = "exact"

[[sections]]
name = "task_2"

[[sections.criteria]]
field = "task_2.summary"
comparator = "keyword_coverage"
params = { threshold = 0.5 }
description = "Explains the liability split"
"#;

    #[test]
    fn test_from_toml() {
        let rubric = Rubric::from_toml(CLAIMS_RUBRIC).unwrap();
        assert_eq!(rubric.name(), "claims-exam");
        assert_eq!(rubric.sections().len(), 2);
        assert_eq!(rubric.criterion_count(), 3);
        assert_eq!(rubric.max_weight(), 4.0);
        assert_eq!(rubric.policy().overall_min_pct, 0.8);

        let first = &rubric.sections()[0];
        assert_eq!(first.section_threshold(), Some(SectionThreshold::MinCorrect(1)));
        assert_eq!(first.criteria()[0].id, "task_1.reserve_amount");
        assert!(first.criteria()[0].critical);
        assert_eq!(first.criteria()[1].id, "insurer");
        assert_eq!(first.criteria()[1].comparator, Comparator::exact());
        assert!(rubric.criteria().all(|c| !c.section.is_empty()));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "name": "mini",
            "sections": [{"name": "s", "criteria": [{"field": "a", "comparator": "boolean_equal"}]}]
        }"#;
        let rubric = Rubric::from_json(json).unwrap();
        assert_eq!(rubric.criteria().next().map(|c| c.weight), Some(1.0));
    }

    fn one_section(criteria: &str) -> String {
        format!("name = \"r\"\n[[sections]]\nname = \"s\"\n{}", criteria)
    }

    #[test]
    fn test_validation_errors() {
        let err = |toml: &str| Rubric::from_toml(toml).unwrap_err();

        assert_eq!(err("name = \"r\"\n"), ConfigError::EmptyRubric);
        assert_eq!(err(&one_section("")), ConfigError::EmptySection("s".to_string()));
        assert!(matches!(
            err(&one_section("[[sections.criteria]]\nfield = \"a..b\"\ncomparator = \"exact\"\n")),
            ConfigError::InvalidPath { .. }
        ));
        assert!(matches!(
            err(&one_section("[[sections.criteria]]\nfield = \"a\"\ncomparator = \"exact\"\nweight = 0\n")),
            ConfigError::InvalidWeight { .. }
        ));
        assert_eq!(
            err(&one_section("[[sections.criteria]]\nfield = \"a\"\ncomparator = \"fuzzy\"\n")),
            ConfigError::UnknownComparator("fuzzy".to_string())
        );
        assert!(matches!(
            err(&one_section("[[sections.criteria]]\nfield = \"a\"\ncomparator = \"numeric_tolerance\"\n")),
            ConfigError::InvalidParam { .. }
        ));
        assert_eq!(
            err(&one_section(
                "[[sections.criteria]]\nfield = \"a\"\ncomparator = \"exact\"\n[[sections.criteria]]\nfield = \"a\"\ncomparator = \"set_equal\"\n"
            )),
            ConfigError::DuplicateCriterion("a".to_string())
        );
        assert!(matches!(err("name = \"r\"\nbogus = 1\n"), ConfigError::Parse(_)));
    }

    #[test]
    fn test_duplicate_section() {
        let c = || Criterion::new("a", Comparator::string_equal()).unwrap();
        let result = Rubric::builder("r")
            .section(Section::new("s").criterion(c()))
            .section(Section::new("s").criterion(c().with_id("b")))
            .build();
        assert_eq!(result, Err(ConfigError::DuplicateSection("s".to_string())));
    }

    #[test]
    fn test_threshold_validation() {
        let c = || Criterion::new("a", Comparator::string_equal()).unwrap();
        let too_many = Rubric::builder("r").section(Section::new("s").min_correct(2).criterion(c())).build();
        assert!(matches!(too_many, Err(ConfigError::InvalidThreshold { .. })));

        let bad_pct = Rubric::builder("r").section(Section::new("s").min_pct(1.5).criterion(c())).build();
        assert!(matches!(bad_pct, Err(ConfigError::InvalidThreshold { .. })));

        let both = one_section("min_pct = 0.5\nmin_correct = 1\n[[sections.criteria]]\nfield = \"a\"\ncomparator = \"exact\"\n");
        assert!(matches!(Rubric::from_toml(&both), Err(ConfigError::InvalidThreshold { .. })));

        let policy_default = Rubric::builder("r")
            .policy(PassPolicy::default().per_section_min_correct(3))
            .section(Section::new("s").criterion(c()))
            .build();
        assert!(matches!(policy_default, Err(ConfigError::InvalidThreshold { .. })));
    }

    #[test]
    fn test_with_policy_revalidates() {
        let rubric = Rubric::from_toml(CLAIMS_RUBRIC).unwrap();
        assert!(rubric.clone().with_policy(PassPolicy::default().overall_min_pct(2.0)).is_err());
        let relaxed = rubric.with_policy(PassPolicy::default().overall_min_pct(0.5)).unwrap();
        assert_eq!(relaxed.policy().overall_min_pct, 0.5);
    }

    #[test]
    fn test_rubric_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Rubric>();
    }
}
