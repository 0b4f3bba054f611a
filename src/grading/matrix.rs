//! Aggregation engine: per-student, per-period averages and labels.
//!
//! The engine is a pure function of (validated config, roster, grade table).
//! It never stores anything, so it can run after every keystroke of entry.
//!
//! Policy for incomplete data:
//! - a category average needs at least one entered score
//! - the overall average needs both category averages
//! - the label is looked up on the overall average rounded to display precision
//!
//! Incomplete results are `None`, never zero.

use serde::Serialize;
use tracing::debug;

use crate::domain::{CategoryId, Roster};
use crate::error::MatrixError;
use crate::grading::bands::label_for;
use crate::grading::category::mean;
use crate::grading::table::GradeTable;
use crate::grading::ValidatedConfig;

/// Result for one student in one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentPeriodResult {
    pub student: String,
    pub period: String,
    /// Full-precision Set A average.
    pub category_a: Option<f64>,
    /// Full-precision Set B average.
    pub category_b: Option<f64>,
    /// Full-precision weighted average, for any further aggregation.
    pub overall: Option<f64>,
    /// `overall` rounded to the scale's decimal places.
    pub overall_display: Option<f64>,
    /// Band label resolved from `overall_display`.
    pub label: Option<String>,
    /// Scores entered for this student and period.
    pub entered: usize,
    /// Scores expected (projects across both categories).
    pub expected: usize,
}

impl StudentPeriodResult {
    pub fn category_average(&self, id: CategoryId) -> Option<f64> {
        match id {
            CategoryId::A => self.category_a,
            CategoryId::B => self.category_b,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.overall.is_some()
    }
}

/// All results for one period, in roster order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSheet {
    pub period: String,
    pub rows: Vec<StudentPeriodResult>,
}

impl PeriodSheet {
    /// Students with an overall average.
    pub fn graded_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_complete()).count()
    }

    pub fn entered_count(&self) -> usize {
        self.rows.iter().map(|r| r.entered).sum()
    }

    pub fn expected_count(&self) -> usize {
        self.rows.iter().map(|r| r.expected).sum()
    }
}

/// Cross-period summary for one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub student: String,
    /// Rounded overall per period, in configured period order.
    pub period_grades: Vec<Option<f64>>,
    pub period_labels: Vec<Option<String>>,
    /// Mean of the full-precision overalls that exist.
    pub year_average: Option<f64>,
    pub year_display: Option<f64>,
    pub year_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeMatrix {
    pub periods: Vec<PeriodSheet>,
    pub totals: Vec<YearSummary>,
}

impl GradeMatrix {
    pub fn period(&self, name: &str) -> Option<&PeriodSheet> {
        self.periods.iter().find(|p| p.period == name)
    }

    pub fn cell(&self, student: &str, period: &str) -> Option<&StudentPeriodResult> {
        self.period(period)?.rows.iter().find(|r| r.student == student)
    }
}

/// Compute a single `(student, period)` cell.
///
/// Asking for a student not on the roster or a period not in the config is a
/// caller bug and is reported as `MatrixError`.
pub fn compute_cell(
    config: &ValidatedConfig,
    roster: &Roster,
    grades: &GradeTable,
    student: &str,
    period: &str,
) -> Result<StudentPeriodResult, MatrixError> {
    if !roster.contains(student) {
        return Err(MatrixError::UnknownStudent(student.to_string()));
    }
    if !config.has_period(period) {
        return Err(MatrixError::UnknownPeriod(period.to_string()));
    }
    Ok(aggregate(config, grades, student, period))
}

/// Compute every cell for every period plus the year totals.
pub fn compute_matrix(config: &ValidatedConfig, roster: &Roster, grades: &GradeTable) -> GradeMatrix {
    let periods: Vec<PeriodSheet> = config
        .trimesters
        .iter()
        .map(|period| PeriodSheet {
            period: period.clone(),
            rows: roster
                .iter()
                .map(|student| aggregate(config, grades, student, period))
                .collect(),
        })
        .collect();

    let totals = roster
        .iter()
        .enumerate()
        .map(|(idx, student)| year_summary(config, student, &periods, idx))
        .collect();

    debug!(
        students = roster.len(),
        periods = periods.len(),
        scores = grades.len(),
        graded = periods.iter().map(PeriodSheet::graded_count).sum::<usize>(),
        "computed grade matrix"
    );

    GradeMatrix { periods, totals }
}

fn aggregate(config: &ValidatedConfig, grades: &GradeTable, student: &str, period: &str) -> StudentPeriodResult {
    let mut averages = [None, None];
    let mut entered = 0;
    for (slot, id) in averages.iter_mut().zip(CategoryId::ALL) {
        let category = config.category(id);
        let scores = grades.category_scores(student, period, id);
        entered += category.entered_count(&scores);
        *slot = category.average_for(&scores);
    }
    let [category_a, category_b] = averages;

    let overall = match (category_a, category_b) {
        (Some(a), Some(b)) => Some(a * config.set_a.weight + b * config.set_b.weight),
        _ => None,
    };
    let overall_display = overall.map(|v| config.scale.round(v));
    let label = overall_display.and_then(|v| resolve_label(config, v));

    StudentPeriodResult {
        student: student.to_string(),
        period: period.to_string(),
        category_a,
        category_b,
        overall,
        overall_display,
        label,
        entered,
        expected: config.project_count(),
    }
}

fn year_summary(config: &ValidatedConfig, student: &str, periods: &[PeriodSheet], row: usize) -> YearSummary {
    let cells: Vec<&StudentPeriodResult> = periods.iter().filter_map(|p| p.rows.get(row)).collect();

    let year_average = mean(cells.iter().filter_map(|c| c.overall));
    let year_display = year_average.map(|v| config.scale.round(v));

    YearSummary {
        student: student.to_string(),
        period_grades: cells.iter().map(|c| c.overall_display).collect(),
        period_labels: cells.iter().map(|c| c.label.clone()).collect(),
        year_average,
        year_display,
        year_label: year_display.and_then(|v| resolve_label(config, v)),
    }
}

fn resolve_label(config: &ValidatedConfig, rounded: f64) -> Option<String> {
    label_for(rounded, &config.qualitative_grades, config.band_policy).map(str::to_string)
}
