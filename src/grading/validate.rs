//! Configuration and roster validation.
//!
//! Validation never fails fast. Every rule runs and appends its findings, so a
//! front-end can show all problems at once and re-run after each edit. Only
//! `Error` findings block generation.

use std::collections::HashMap;
use std::ops::Deref;

use crate::domain::{
    BandPolicy, CategoryId, MatrixConfig, QualitativeBand, Roster, ValidationIssue, has_errors,
};
use crate::grading::bands::{Gap, analyze_coverage};

/// Combined weights may differ from 1.0 by at most this much.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Upper bound on `scale.decimal_places`.
pub const MAX_DECIMAL_PLACES: u32 = 6;

/// A configuration that passed validation with no errors.
///
/// Built once at the boundary; the aggregation engine only accepts this type.
/// Warnings found during validation travel with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    config: MatrixConfig,
    warnings: Vec<ValidationIssue>,
}

impl ValidatedConfig {
    pub fn warnings(&self) -> &[ValidationIssue] {
        &self.warnings
    }

    pub fn into_inner(self) -> MatrixConfig {
        self.config
    }
}

impl Deref for ValidatedConfig {
    type Target = MatrixConfig;

    fn deref(&self) -> &MatrixConfig {
        &self.config
    }
}

impl MatrixConfig {
    /// Run every configuration rule and return all findings in rule order.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        ConfigValidator::new(self).run()
    }

    /// Validate and, if no `Error` was found, wrap as `ValidatedConfig`.
    ///
    /// On failure the full issue list (errors and warnings) is returned.
    pub fn into_validated(self) -> Result<ValidatedConfig, Vec<ValidationIssue>> {
        let issues = self.validate();
        if has_errors(&issues) {
            return Err(issues);
        }
        Ok(ValidatedConfig {
            config: self,
            warnings: issues,
        })
    }
}

/// Check roster names: at least one, none blank, no duplicates.
pub fn validate_roster(roster: &Roster) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if roster.is_empty() {
        issues.push(ValidationIssue::error("students", "No students provided"));
        return issues;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in roster.iter().enumerate() {
        let field = format!("students[{idx}]");
        let trimmed = name.trim();
        if trimmed.is_empty() {
            issues.push(ValidationIssue::error(field, "Student name is blank"));
            continue;
        }
        if let Some(first) = seen.get(trimmed) {
            issues.push(ValidationIssue::error(
                field,
                format!("Duplicate student name '{trimmed}' (first listed at position {})", first + 1),
            ));
        } else {
            seen.insert(trimmed, idx);
        }
    }
    issues
}

/// Orchestrates the configuration rules.
///
/// Each `check_*` method is independent and only appends to `issues`, so the
/// order of findings is stable: scale, weights, categories, bands, periods,
/// output.
struct ConfigValidator<'a> {
    config: &'a MatrixConfig,
    issues: Vec<ValidationIssue>,
}

impl<'a> ConfigValidator<'a> {
    fn new(config: &'a MatrixConfig) -> Self {
        Self {
            config,
            issues: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<ValidationIssue> {
        let scale_ok = self.check_scale();
        self.check_weights();
        for id in CategoryId::ALL {
            self.check_category(id);
        }
        self.check_bands(scale_ok);
        self.check_periods();
        self.check_output();
        self.issues
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue::error(field, message));
    }

    fn warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue::warning(field, message));
    }

    /// Returns whether the scale is usable for band checks.
    fn check_scale(&mut self) -> bool {
        let scale = self.config.scale;
        if !scale.min.is_finite() || !scale.max.is_finite() {
            self.error("scale", "Scale bounds must be finite numbers");
            return false;
        }
        let mut ok = true;
        if scale.min >= scale.max {
            self.error(
                "scale.min",
                format!("Scale minimum ({}) must be below maximum ({})", scale.min, scale.max),
            );
            ok = false;
        }
        if scale.decimal_places > MAX_DECIMAL_PLACES {
            self.error(
                "scale.decimal_places",
                format!(
                    "Decimal places ({}) must be at most {MAX_DECIMAL_PLACES}",
                    scale.decimal_places
                ),
            );
            ok = false;
        }
        ok
    }

    fn check_weights(&mut self) {
        let mut both_valid = true;
        for id in CategoryId::ALL {
            let weight = self.config.category(id).weight;
            if !(weight.is_finite() && weight > 0.0 && weight <= 1.0) {
                self.error(
                    format!("{}.weight", id.field()),
                    format!("Weight {weight} must be greater than 0 and at most 1"),
                );
                both_valid = false;
            }
        }
        if !both_valid {
            return;
        }

        let total = self.config.set_a.weight + self.config.set_b.weight;
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            self.error(
                "weights",
                format!("Weights sum to {:.4}% (should be 100%)", total * 100.0),
            );
        }
    }

    fn check_category(&mut self, id: CategoryId) {
        let config = self.config;
        let category = config.category(id);
        let field = id.field();

        if category.name.trim().is_empty() {
            self.error(format!("{field}.name"), "Category name is blank");
        }

        let label = display_name(&category.name, field);
        if category.projects.is_empty() {
            self.error(format!("{field}.projects"), format!("{label} has no projects defined"));
            return;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (idx, project) in category.projects.iter().enumerate() {
            let path = format!("{field}.projects[{idx}]");
            let trimmed = project.trim();
            if trimmed.is_empty() {
                self.error(path, format!("{label} has a blank project name"));
                continue;
            }
            if trimmed.len() != project.len() {
                self.error(
                    path,
                    format!("{label} project '{project}' has leading or trailing spaces"),
                );
                continue;
            }
            if let Some(first) = seen.get(trimmed) {
                self.error(
                    path,
                    format!(
                        "{label} lists project '{trimmed}' more than once (first at position {})",
                        first + 1
                    ),
                );
            } else {
                seen.insert(trimmed, idx);
            }
        }
    }

    fn check_bands(&mut self, scale_ok: bool) {
        let config = self.config;
        let bands = &config.qualitative_grades;
        if bands.is_empty() {
            self.warning(
                "qualitative_grades",
                "No qualitative grades defined; every student will be unlabeled",
            );
            return;
        }

        let scale = config.scale;
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (idx, band) in bands.iter().enumerate() {
            let field = format!("qualitative_grades[{idx}]");
            let label = band.label.trim();
            if label.is_empty() {
                self.error(format!("{field}.label"), "Qualitative grade label is blank");
            } else if label.len() != band.label.len() {
                self.error(
                    format!("{field}.label"),
                    format!("Qualitative grade '{}' has leading or trailing spaces", band.label),
                );
            } else if let Some(first) = seen.get(label) {
                self.error(
                    format!("{field}.label"),
                    format!(
                        "Qualitative grade '{label}' is defined more than once (first at position {})",
                        first + 1
                    ),
                );
            } else {
                seen.insert(label, idx);
            }

            if !band.min.is_finite() || !band.max.is_finite() {
                self.error(field, format!("Qualitative grade '{label}' has a non-numeric bound"));
                continue;
            }
            if band.min > band.max {
                self.error(
                    format!("{field}.min"),
                    format!(
                        "Qualitative grade '{label}' minimum ({}) is above its maximum ({})",
                        band.min, band.max
                    ),
                );
                continue;
            }
            if scale_ok && (band.min < scale.min || band.max > scale.max) {
                self.error(
                    field,
                    format!(
                        "Qualitative grade '{label}' range ({}-{}) is outside scale ({}-{})",
                        band.min, band.max, scale.min, scale.max
                    ),
                );
            }
        }

        if !scale_ok {
            return;
        }

        let policy = config.band_policy;
        let coverage = analyze_coverage(bands, &scale, policy);
        for gap in coverage.gaps {
            let message = match gap {
                Gap::Below { to } => format!(
                    "Averages from {} up to {to} match no qualitative grade",
                    scale.min
                ),
                Gap::Between { from, to } => format!(
                    "Averages between {from} and {to} (exclusive) match no qualitative grade"
                ),
                Gap::Above { from } => format!(
                    "Averages above {from} up to {} match no qualitative grade",
                    scale.max
                ),
            };
            self.warning("qualitative_grades", message);
        }
        for overlap in coverage.overlaps {
            let first = &bands[overlap.first];
            let second = &bands[overlap.second];
            let winner = &bands[overlap.winner];
            self.warning(
                format!("qualitative_grades[{}]", overlap.second),
                format!(
                    "Qualitative grades {} and {} overlap; shared averages resolve to '{}' ({})",
                    describe(first),
                    describe(second),
                    winner.label,
                    policy_reason(policy),
                ),
            );
        }
    }

    fn check_periods(&mut self) {
        let config = self.config;
        let periods = &config.trimesters;
        if periods.is_empty() {
            self.error("trimesters", "No trimesters defined");
            return;
        }
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (idx, period) in periods.iter().enumerate() {
            let field = format!("trimesters[{idx}]");
            let trimmed = period.trim();
            if trimmed.is_empty() {
                self.error(field, "Trimester name is blank");
            } else if trimmed.len() != period.len() {
                self.error(field, format!("Trimester '{period}' has leading or trailing spaces"));
            } else if let Some(first) = seen.get(trimmed) {
                self.error(
                    field,
                    format!(
                        "Trimester '{trimmed}' is listed more than once (first at position {})",
                        first + 1
                    ),
                );
            } else {
                seen.insert(trimmed, idx);
            }
        }
    }

    fn check_output(&mut self) {
        if self.config.output_file.trim().is_empty() {
            self.error("output_file", "Output file name is blank");
        }
    }
}

fn display_name<'n>(name: &'n str, field: &'n str) -> &'n str {
    let trimmed = name.trim();
    if trimmed.is_empty() { field } else { trimmed }
}

fn describe(band: &QualitativeBand) -> String {
    format!("'{}' ({}-{})", band.label, band.min, band.max)
}

fn policy_reason(policy: BandPolicy) -> &'static str {
    match policy {
        BandPolicy::FirstMatch => "listed first",
        BandPolicy::HighestFloor => "higher minimum",
    }
}
