//! Shared load -> validate -> ingest -> aggregate pipeline.
//!
//! Every command that needs a configuration or roster goes through the loaders
//! here, so blocking validation errors are handled the same way everywhere:
//! they are collected, formatted together and returned with exit code 3.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::{Roster, ValidationIssue, has_errors};
use crate::error::AppError;
use crate::grading::{GradeMatrix, GradeTable, ValidatedConfig, compute_matrix, validate_roster};
use crate::io::{IngestedGrades, load_grades, read_config_json, read_roster};
use crate::report::format_issues;

/// Where a grade CSV comes from and which period it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeSource {
    /// File with its own `period` column.
    Mixed(PathBuf),
    /// File holding a single period; any `period` column wins over this.
    Period { period: String, path: PathBuf },
}

impl GradeSource {
    pub fn path(&self) -> &Path {
        match self {
            GradeSource::Mixed(path) | GradeSource::Period { path, .. } => path,
        }
    }

    fn fixed_period(&self) -> Option<&str> {
        match self {
            GradeSource::Mixed(_) => None,
            GradeSource::Period { period, .. } => Some(period),
        }
    }
}

/// All computed outputs of a single `gm generate` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub config: ValidatedConfig,
    pub roster: Roster,
    pub grades: GradeTable,
    /// One entry per grade file, in the order given.
    pub ingests: Vec<(GradeSource, IngestedGrades)>,
    pub matrix: GradeMatrix,
}

/// Read and validate a configuration. Errors block with exit code 3.
pub fn load_config(path: &Path) -> Result<ValidatedConfig, AppError> {
    let config = read_config_json(path)?;
    let validated = config
        .into_validated()
        .map_err(|issues| blocked("Configuration", &issues))?;

    for issue in validated.warnings() {
        warn!(field = %issue.field, "{}", issue.message);
    }
    info!(
        path = %path.display(),
        periods = validated.trimesters.len(),
        projects = validated.project_count(),
        "configuration loaded"
    );
    Ok(validated)
}

/// Read and validate a roster. Errors block with exit code 3.
pub fn load_roster(path: &Path) -> Result<Roster, AppError> {
    let roster = read_roster(path)?;
    let issues = validate_roster(&roster);
    if has_errors(&issues) {
        return Err(blocked("Roster", &issues));
    }
    for issue in &issues {
        warn!(field = %issue.field, "{}", issue.message);
    }
    info!(path = %path.display(), students = roster.len(), "roster loaded");
    Ok(roster)
}

/// Load everything and compute the grade matrix.
///
/// Grade files are applied in order; a score in a later file replaces the same
/// score from an earlier one.
pub fn run_generate(config_path: &Path, roster_path: &Path, sources: &[GradeSource]) -> Result<RunOutput, AppError> {
    let config = load_config(config_path)?;
    let roster = load_roster(roster_path)?;

    let mut grades = GradeTable::new();
    let mut ingests = Vec::with_capacity(sources.len());
    for source in sources {
        let ingested = load_grades(source.path(), &config, &roster, source.fixed_period())?;
        if !ingested.ignored_columns.is_empty() {
            warn!(
                path = %source.path().display(),
                columns = %ingested.ignored_columns.join(", "),
                "ignored columns that match no configured project"
            );
        }
        grades.merge(ingested.table.clone());
        ingests.push((source.clone(), ingested));
    }
    info!(scores = grades.len(), files = sources.len(), "grades loaded");

    let matrix = compute_matrix(&config, &roster, &grades);

    Ok(RunOutput {
        config,
        roster,
        grades,
        ingests,
        matrix,
    })
}

fn blocked(what: &str, issues: &[ValidationIssue]) -> AppError {
    AppError::new(3, format!("{what} has blocking errors.\n{}", format_issues(issues).trim_end()))
}
