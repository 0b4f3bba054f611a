//! Shared domain types.
//!
//! These types are intentionally plain and serializable so they can be:
//!
//! - parsed from the configuration document
//! - validated once at the boundary (see `grading::validate`)
//! - exported alongside computed results

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Numeric grading scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleSpec {
    pub min: f64,
    pub max: f64,
    /// Digits kept when rounding averages for display and band lookup.
    pub decimal_places: u32,
}

impl Default for ScaleSpec {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            decimal_places: 1,
        }
    }
}

/// A labeled range over the scale that maps an average to a qualitative grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeBand {
    pub label: String,
    pub min: f64,
    pub max: f64,
}

impl QualitativeBand {
    pub fn new(label: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            label: label.into(),
            min,
            max,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// How an average is resolved against the band list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BandPolicy {
    /// The first band in list order with `min <= average <= max` wins.
    #[default]
    FirstMatch,
    /// The band with the highest `min <= average` wins; `max` is ignored.
    /// Averages below every floor get the band with the lowest `min`, the way
    /// a chain of `IF(avg >= min, ...)` formulas ends in a bare else.
    HighestFloor,
}

/// Which of the two weighted groups a project belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoryId {
    #[serde(rename = "set_a")]
    A,
    #[serde(rename = "set_b")]
    B,
}

impl CategoryId {
    pub const ALL: [CategoryId; 2] = [CategoryId::A, CategoryId::B];

    /// Field name in the configuration document.
    pub fn field(self) -> &'static str {
        match self {
            CategoryId::A => "set_a",
            CategoryId::B => "set_b",
        }
    }

    /// Prefix used for grade columns (`A_<project>`).
    pub fn column_prefix(self) -> &'static str {
        match self {
            CategoryId::A => "A",
            CategoryId::B => "B",
        }
    }

    pub fn column_name(self, project: &str) -> String {
        format!("{}_{project}", self.column_prefix())
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

/// A named list of projects carrying a weight fraction of the overall grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCategory {
    pub name: String,
    pub weight: f64,
    pub projects: Vec<String>,
}

impl WeightedCategory {
    pub fn new(name: impl Into<String>, weight: f64, projects: &[&str]) -> Self {
        Self {
            name: name.into(),
            weight,
            projects: projects.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn has_project(&self, project: &str) -> bool {
        self.projects.iter().any(|p| p == project)
    }
}

/// The configuration document, as read from JSON.
///
/// Nothing here is trusted until `MatrixConfig::into_validated` has run; the
/// aggregation engine only accepts the validated form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixConfig {
    pub scale: ScaleSpec,
    pub set_a: WeightedCategory,
    pub set_b: WeightedCategory,
    #[serde(default)]
    pub qualitative_grades: Vec<QualitativeBand>,
    #[serde(default)]
    pub band_policy: BandPolicy,
    pub trimesters: Vec<String>,
    pub output_file: String,
}

impl MatrixConfig {
    pub fn category(&self, id: CategoryId) -> &WeightedCategory {
        match id {
            CategoryId::A => &self.set_a,
            CategoryId::B => &self.set_b,
        }
    }

    pub fn has_period(&self, period: &str) -> bool {
        self.trimesters.iter().any(|t| t == period)
    }

    /// Every grade column in sheet order: Set A projects, then Set B projects.
    pub fn grade_columns(&self) -> Vec<(CategoryId, &str)> {
        CategoryId::ALL
            .iter()
            .flat_map(|&id| {
                self.category(id)
                    .projects
                    .iter()
                    .map(move |p| (id, p.as_str()))
            })
            .collect()
    }

    pub fn project_count(&self) -> usize {
        self.set_a.projects.len() + self.set_b.projects.len()
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            scale: ScaleSpec::default(),
            set_a: WeightedCategory::new(
                "Set A",
                0.70,
                &["Project 1", "Project 2", "Project 3", "Project 4"],
            ),
            set_b: WeightedCategory::new("Set B", 0.30, &["Project 1", "Project 2"]),
            qualitative_grades: vec![
                QualitativeBand::new("Consistent Impact", 90.0, 100.0),
                QualitativeBand::new("Developing Impact", 80.0, 89.0),
                QualitativeBand::new("Emerging", 70.0, 79.0),
                QualitativeBand::new("Needs Support", 60.0, 69.0),
                QualitativeBand::new("Not Yet Meeting", 0.0, 59.0),
            ],
            band_policy: BandPolicy::FirstMatch,
            trimesters: vec![
                "Trimester 1".to_string(),
                "Trimester 2".to_string(),
                "Trimester 3".to_string(),
            ],
            output_file: "grades.xlsx".to_string(),
        }
    }
}

/// Ordered list of student names.
///
/// The roster is replaced wholesale on re-import; validation
/// (`grading::validate_roster`) reports blanks and duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    students: Vec<String>,
}

impl Roster {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            students: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.students.iter().any(|s| s == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.students.iter().map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// Address of a single score in the sparse grade table.
///
/// Field order defines the sort order, so all projects of one
/// `(student, period, category)` are contiguous in a `BTreeMap`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GradeKey {
    pub student: String,
    pub period: String,
    pub category: CategoryId,
    pub project: String,
}

impl GradeKey {
    pub fn new(
        student: impl Into<String>,
        period: impl Into<String>,
        category: CategoryId,
        project: impl Into<String>,
    ) -> Self {
        Self {
            student: student.into(),
            period: period.into(),
            category,
            project: project.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => f.pad("error"),
            Severity::Warning => f.pad("warning"),
        }
    }
}

/// One finding from configuration or roster validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Path of the offending field, e.g. `set_a.projects[2]`.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True if any issue blocks generation.
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}
