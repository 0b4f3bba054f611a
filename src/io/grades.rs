//! Grade entry CSV: template generation and ingest.
//!
//! The layout mirrors one entry sheet per period:
//!
//! ```text
//! period,student,A_Project 1,...,B_Project 1,...
//! ```
//!
//! Ingest is lenient at the row level and strict at the schema level:
//!
//! - a missing `student` column (or `period` column with no fixed period) is a
//!   usage error
//! - bad rows and bad cells are skipped and reported as `RowError`s
//! - blank cells mean "not yet entered" and are never an error
//! - columns that match no configured project are ignored and listed

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{CategoryId, GradeKey, Roster};
use crate::error::AppError;
use crate::grading::{GradeTable, ValidatedConfig};
use crate::io::export::write_atomic;

const STUDENT_HEADERS: [&str; 3] = ["student", "student name", "name"];
const PERIOD_HEADERS: [&str; 2] = ["period", "trimester"];

/// A row- or cell-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub student: Option<String>,
    /// Set when only one cell of the row was rejected.
    pub column: Option<String>,
    pub message: String,
}

/// Ingest output: the accepted scores plus everything that was skipped.
#[derive(Debug, Clone)]
pub struct IngestedGrades {
    pub table: GradeTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    pub cells_recorded: usize,
    pub ignored_columns: Vec<String>,
}

/// Column positions resolved from the header row.
struct Layout {
    student: usize,
    period: Option<usize>,
    grades: Vec<(usize, CategoryId, String)>,
    ignored: Vec<String>,
}

/// Write an empty entry CSV with one row per period and student.
pub fn write_template(path: &Path, config: &ValidatedConfig, roster: &Roster) -> Result<(), AppError> {
    write_atomic(path, "grade template", |w| template_csv(w, config, roster))
}

pub fn template_csv(w: &mut dyn Write, config: &ValidatedConfig, roster: &Roster) -> std::io::Result<()> {
    let mut csv = csv::Writer::from_writer(w);

    let mut header = vec!["period".to_string(), "student".to_string()];
    header.extend(config.grade_columns().into_iter().map(|(id, p)| id.column_name(p)));
    csv.write_record(&header)?;

    let blanks = config.project_count();
    for period in &config.trimesters {
        for student in roster.iter() {
            let mut record = vec![period.as_str(), student];
            record.extend(std::iter::repeat_n("", blanks));
            csv.write_record(&record)?;
        }
    }

    csv.flush()
}

/// Open and ingest a grade CSV. See `parse_grades`.
pub fn load_grades(
    path: &Path,
    config: &ValidatedConfig,
    roster: &Roster,
    fixed_period: Option<&str>,
) -> Result<IngestedGrades, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open grades CSV '{}': {e}", path.display())))?;
    let ingested = parse_grades(file, config, roster, fixed_period)?;

    debug!(
        path = %path.display(),
        rows = ingested.rows_read,
        cells = ingested.cells_recorded,
        "ingested grades"
    );
    for err in &ingested.row_errors {
        warn!(
            path = %path.display(),
            line = err.line,
            column = err.column.as_deref().unwrap_or("-"),
            "{}",
            err.message
        );
    }
    Ok(ingested)
}

/// Parse grade rows into a `GradeTable`.
///
/// `fixed_period` is used when the file has no `period` column (one file per
/// period). When both are present the column wins.
pub fn parse_grades<R: Read>(
    reader: R,
    config: &ValidatedConfig,
    roster: &Roster,
    fixed_period: Option<&str>,
) -> Result<IngestedGrades, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read grades CSV headers: {e}")))?
        .clone();

    let layout = resolve_layout(&headers, config)?;

    if layout.period.is_none() {
        match fixed_period {
            None => {
                return Err(AppError::new(
                    2,
                    "Grades CSV has no `period` column; pass it as PERIOD=FILE instead.",
                ));
            }
            Some(p) if !config.has_period(p) => {
                return Err(AppError::new(2, format!("Unknown period '{p}' for grades CSV.")));
            }
            Some(_) => {}
        }
    }

    let mut table = GradeTable::new();
    let mut row_errors = Vec::new();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut rows_read = 0usize;
    let mut rows_used = 0usize;
    let mut cells_recorded = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    student: None,
                    column: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let student = cell(&record, layout.student);
        let period = match layout.period {
            Some(idx) => cell(&record, idx),
            None => fixed_period,
        };

        let Some(student) = student else {
            // A row with no name and no scores is just spacing.
            if layout.grades.iter().any(|(idx, _, _)| cell(&record, *idx).is_some()) {
                row_errors.push(row_error(line, None, "Missing student name"));
            }
            continue;
        };
        let Some(period) = period else {
            row_errors.push(row_error(line, Some(student), "Missing period"));
            continue;
        };

        if !roster.contains(student) {
            row_errors.push(row_error(line, Some(student), format!("Student '{student}' is not on the roster")));
            continue;
        }
        if !config.has_period(period) {
            row_errors.push(row_error(line, Some(student), format!("Unknown period '{period}'")));
            continue;
        }
        if !seen.insert((student.to_string(), period.to_string())) {
            row_errors.push(row_error(
                line,
                Some(student),
                format!("Duplicate row for '{student}' in '{period}'"),
            ));
            continue;
        }

        let mut recorded = 0usize;
        let mut rejected = 0usize;
        for (idx, category, project) in &layout.grades {
            let Some(raw) = cell(&record, *idx) else {
                continue;
            };
            let column = category.column_name(project);

            let value = match raw.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    rejected += 1;
                    row_errors.push(cell_error(line, student, column, format!("Invalid grade value: `{raw}`")));
                    continue;
                }
            };

            let key = GradeKey::new(student, period, *category, project.as_str());
            match table.record(config, roster, key, value) {
                Ok(_) => recorded += 1,
                Err(e) => {
                    rejected += 1;
                    row_errors.push(cell_error(line, student, column, e.to_string()));
                }
            }
        }
        cells_recorded += recorded;
        // A blank row still counts; one whose every score was rejected does not.
        if recorded > 0 || rejected == 0 {
            rows_used += 1;
        }
    }

    Ok(IngestedGrades {
        table,
        row_errors,
        rows_read,
        rows_used,
        cells_recorded,
        ignored_columns: layout.ignored,
    })
}

fn resolve_layout(headers: &StringRecord, config: &ValidatedConfig) -> Result<Layout, AppError> {
    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();
    let lowered: HashMap<String, usize> = names
        .iter()
        .enumerate()
        .rev()
        .map(|(idx, name)| (name.to_lowercase(), idx))
        .collect();

    let find = |candidates: &[&str]| candidates.iter().find_map(|c| lowered.get(*c).copied());

    let student = find(&STUDENT_HEADERS[..]).ok_or_else(|| {
        AppError::new(
            2,
            "Missing required column: `student` (or `Student Name`) in grades CSV.",
        )
    })?;
    let period = find(&PERIOD_HEADERS[..]);

    let wanted: HashMap<String, (CategoryId, &str)> = config
        .grade_columns()
        .into_iter()
        .map(|(id, project)| (id.column_name(project), (id, project)))
        .collect();

    let mut grades = Vec::new();
    let mut ignored = Vec::new();
    for (idx, name) in names.iter().enumerate() {
        if idx == student || Some(idx) == period {
            continue;
        }
        match wanted.get(name) {
            Some((id, project)) if !grades.iter().any(|(_, i, p)| i == id && p == project) => {
                grades.push((idx, *id, project.to_string()));
            }
            _ => ignored.push(name.clone()),
        }
    }

    for column in wanted.keys() {
        if !names.contains(column) {
            debug!(column = %column, "grades CSV has no column for project");
        }
    }

    Ok(Layout {
        student,
        period,
        grades,
        ignored,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn row_error(line: usize, student: Option<&str>, message: impl Into<String>) -> RowError {
    RowError {
        line,
        student: student.map(str::to_string),
        column: None,
        message: message.into(),
    }
}

fn cell_error(line: usize, student: &str, column: String, message: String) -> RowError {
    RowError {
        line,
        student: Some(student.to_string()),
        column: Some(column),
        message,
    }
}
