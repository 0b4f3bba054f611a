//! Write the computed grade matrix to disk.
//!
//! The artifact is meant to be easy to open in a spreadsheet:
//!
//! - `<stem>.csv`: one row per period and student with the raw project
//!   scores, both category averages, the final grade and the qualitative label
//! - `<stem>_total.csv`: one row per student with each period's grade and
//!   label plus the year average
//! - `<stem>_chart.csv` (only when chart columns are requested): one row per
//!   student with the chosen columns for every period, ready to plot
//!
//! Every file is written to a temporary file in the target directory and then
//! renamed into place, so readers see either the old file or the complete new
//! one. The files of one artifact are all staged before any is renamed.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::{CategoryId, GradeKey, MatrixConfig};
use crate::error::AppError;
use crate::grading::{GradeMatrix, GradeTable, StudentPeriodResult};
use crate::report::{fmt_label, fmt_opt};

/// Where the CSV files of the artifact go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub matrix: PathBuf,
    pub totals: PathBuf,
    /// Only written when chart columns are requested.
    pub chart: PathBuf,
}

/// A per-period value that can be plotted for each student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartColumn {
    /// A raw project score, e.g. `A_Project 1`.
    Score(CategoryId, String),
    /// `Avg A` or `Avg B`.
    Average(CategoryId),
    /// The rounded overall grade.
    Final,
}

impl ChartColumn {
    pub fn name(&self) -> String {
        match self {
            ChartColumn::Score(id, project) => id.column_name(project),
            ChartColumn::Average(id) => format!("Avg {}", id.column_prefix()),
            ChartColumn::Final => "Final Grade".to_string(),
        }
    }

    fn value(&self, row: &StudentPeriodResult, grades: &GradeTable) -> Option<f64> {
        match self {
            ChartColumn::Score(id, project) => grades.get(&GradeKey::new(
                row.student.as_str(),
                row.period.as_str(),
                *id,
                project.as_str(),
            )),
            ChartColumn::Average(id) => row.category_average(*id),
            ChartColumn::Final => row.overall_display,
        }
    }
}

/// Every column `--chart-columns` accepts, in sheet order.
pub fn available_chart_columns(config: &MatrixConfig) -> Vec<ChartColumn> {
    let mut columns: Vec<ChartColumn> = config
        .grade_columns()
        .into_iter()
        .map(|(id, project)| ChartColumn::Score(id, project.to_string()))
        .collect();
    columns.extend(CategoryId::ALL.into_iter().map(ChartColumn::Average));
    columns.push(ChartColumn::Final);
    columns
}

/// Resolve requested chart column names. An unknown name is a usage error.
pub fn resolve_chart_columns(config: &MatrixConfig, requested: &[String]) -> Result<Vec<ChartColumn>, AppError> {
    let available = available_chart_columns(config);
    let mut resolved = Vec::with_capacity(requested.len());
    for name in requested {
        let name = name.trim();
        let Some(column) = available.iter().find(|c| c.name() == name) else {
            let names: Vec<String> = available.iter().map(ChartColumn::name).collect();
            return Err(AppError::new(
                2,
                format!("Unknown chart column '{name}'. Available: {}", names.join(", ")),
            ));
        };
        if !resolved.contains(column) {
            resolved.push(column.clone());
        }
    }
    Ok(resolved)
}

/// Derive artifact paths from `output_file`.
///
/// The extension of `output_file` is replaced (`grades.xlsx` becomes
/// `grades.csv` and `grades_total.csv`). A relative `output_file` is placed
/// under `out_dir` when one is given.
pub fn artifact_paths(config: &MatrixConfig, out_dir: Option<&Path>) -> ArtifactPaths {
    let output = Path::new(config.output_file.trim());
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "grades".to_string());

    let mut dir = output.parent().map(Path::to_path_buf).unwrap_or_default();
    if let Some(out_dir) = out_dir {
        if dir.is_relative() {
            dir = out_dir.join(dir);
        }
    }

    ArtifactPaths {
        matrix: dir.join(format!("{stem}.csv")),
        totals: dir.join(format!("{stem}_total.csv")),
        chart: dir.join(format!("{stem}_chart.csv")),
    }
}

/// Write the CSV files of the artifact; the chart file only when `chart` is
/// non-empty.
///
/// All files are staged first, so a write failure leaves every target as it
/// was.
pub fn write_artifact(
    paths: &ArtifactPaths,
    matrix: &GradeMatrix,
    config: &MatrixConfig,
    grades: &GradeTable,
    chart: &[ChartColumn],
) -> Result<(), AppError> {
    let mut staged = vec![
        StagedFile::write(&paths.matrix, "grade matrix CSV", |w| {
            write_matrix_csv(w, matrix, config, grades)
        })?,
        StagedFile::write(&paths.totals, "totals CSV", |w| write_totals_csv(w, matrix, config))?,
    ];
    if !chart.is_empty() {
        staged.push(StagedFile::write(&paths.chart, "chart CSV", |w| {
            write_chart_csv(w, matrix, config, grades, chart)
        })?);
    }

    for file in staged {
        file.persist()?;
    }
    Ok(())
}

/// Write the full `GradeMatrix` as pretty JSON.
pub fn write_matrix_json(path: &Path, matrix: &GradeMatrix) -> Result<(), AppError> {
    write_atomic(path, "grade matrix JSON", |w| {
        serde_json::to_writer_pretty(&mut *w, matrix)?;
        writeln!(w)
    })
}

/// Per-period sheet rows, in the same column order as the entry sheet.
pub fn write_matrix_csv(
    w: &mut dyn Write,
    matrix: &GradeMatrix,
    config: &MatrixConfig,
    grades: &GradeTable,
) -> std::io::Result<()> {
    let mut csv = csv::Writer::from_writer(w);

    let mut header = vec!["period".to_string(), "student".to_string()];
    for id in CategoryId::ALL {
        for project in &config.category(id).projects {
            header.push(id.column_name(project));
        }
        header.push(format!("Avg {}", id.column_prefix()));
    }
    header.push("Final Grade".to_string());
    header.push("Qualitative".to_string());
    csv.write_record(&header)?;

    for sheet in &matrix.periods {
        for row in &sheet.rows {
            let mut record = vec![sheet.period.clone(), row.student.clone()];
            for id in CategoryId::ALL {
                for project in &config.category(id).projects {
                    let key = GradeKey::new(row.student.as_str(), sheet.period.as_str(), id, project.as_str());
                    record.push(grades.get(&key).map(|v| config.scale.format(v)).unwrap_or_default());
                }
                record.push(fmt_opt(row.category_average(id), &config.scale));
            }
            record.push(fmt_opt(row.overall_display, &config.scale));
            record.push(fmt_label(row.overall_display, row.label.as_deref()).to_string());
            csv.write_record(&record)?;
        }
    }

    csv.flush()
}

/// One row per student across all periods plus the year average.
pub fn write_totals_csv(w: &mut dyn Write, matrix: &GradeMatrix, config: &MatrixConfig) -> std::io::Result<()> {
    let mut csv = csv::Writer::from_writer(w);

    let mut header = vec!["student".to_string()];
    for period in &config.trimesters {
        header.push(format!("{period} Grade"));
        header.push(format!("{period} Qual"));
    }
    header.push("Year Average".to_string());
    header.push("Year Qualitative".to_string());
    csv.write_record(&header)?;

    for total in &matrix.totals {
        let mut record = vec![total.student.clone()];
        for (grade, label) in total.period_grades.iter().zip(&total.period_labels) {
            record.push(fmt_opt(*grade, &config.scale));
            record.push(fmt_label(*grade, label.as_deref()).to_string());
        }
        record.push(fmt_opt(total.year_display, &config.scale));
        record.push(fmt_label(total.year_display, total.year_label.as_deref()).to_string());
        csv.write_record(&record)?;
    }

    csv.flush()
}

/// One row per student; each chosen column repeated for every period.
///
/// Values that do not exist yet are left blank so plotting tools skip them.
pub fn write_chart_csv(
    w: &mut dyn Write,
    matrix: &GradeMatrix,
    config: &MatrixConfig,
    grades: &GradeTable,
    columns: &[ChartColumn],
) -> std::io::Result<()> {
    let mut csv = csv::Writer::from_writer(w);

    let mut header = vec!["student".to_string()];
    for sheet in &matrix.periods {
        for column in columns {
            header.push(format!("{} - {}", sheet.period, column.name()));
        }
    }
    csv.write_record(&header)?;

    for total in &matrix.totals {
        let mut record = vec![total.student.clone()];
        for sheet in &matrix.periods {
            let row = sheet.rows.iter().find(|r| r.student == total.student);
            for column in columns {
                let value = row.and_then(|r| column.value(r, grades));
                record.push(value.map(|v| config.scale.format(v)).unwrap_or_default());
            }
        }
        csv.write_record(&record)?;
    }

    csv.flush()
}

/// Write a file all-or-nothing via a sibling temp file and rename.
pub fn write_atomic<F>(path: &Path, what: &str, write: F) -> Result<(), AppError>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    StagedFile::write(path, what, write)?.persist()
}

/// A fully written temp file waiting to be renamed onto its target.
struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
    what: String,
}

impl StagedFile {
    fn write<F>(path: &Path, what: &str, write: F) -> Result<Self, AppError>
    where
        F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
    {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", dir.display())))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create temp file for {what}: {e}")))?;

        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            write(&mut out)
                .and_then(|()| out.flush())
                .map_err(|e| AppError::new(2, format!("Failed to write {what} '{}': {e}", path.display())))?;
        }

        Ok(Self {
            tmp,
            path: path.to_path_buf(),
            what: what.to_string(),
        })
    }

    fn persist(self) -> Result<(), AppError> {
        let Self { tmp, path, what } = self;
        tmp.persist(&path)
            .map_err(|e| AppError::new(2, format!("Failed to save {what} '{}': {}", path.display(), e.error)))?;

        info!(path = %path.display(), "wrote {what}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QualitativeBand, Roster, ScaleSpec, WeightedCategory};
    use crate::grading::{ValidatedConfig, compute_matrix};

    fn setup() -> (ValidatedConfig, Roster, GradeTable) {
        let config = MatrixConfig {
            scale: ScaleSpec {
                min: 0.0,
                max: 100.0,
                decimal_places: 1,
            },
            set_a: WeightedCategory::new("Set A", 0.7, &["P1", "P2"]),
            set_b: WeightedCategory::new("Set B", 0.3, &["Q1"]),
            qualitative_grades: vec![
                QualitativeBand::new("High", 80.0, 100.0),
                QualitativeBand::new("Low", 0.0, 79.9),
            ],
            trimesters: vec!["T1".into()],
            output_file: "out/grades.xlsx".into(),
            ..MatrixConfig::default()
        }
        .into_validated()
        .unwrap();
        let roster = Roster::new(["Alice", "Bob"]);
        let mut grades = GradeTable::new();
        for (student, cat, project, value) in [
            ("Alice", CategoryId::A, "P1", 80.0),
            ("Alice", CategoryId::A, "P2", 90.0),
            ("Alice", CategoryId::B, "Q1", 70.0),
            ("Bob", CategoryId::A, "P1", 55.5),
        ] {
            grades
                .record(&config, &roster, GradeKey::new(student, "T1", cat, project), value)
                .unwrap();
        }
        (config, roster, grades)
    }

    #[test]
    fn paths_follow_output_file() {
        let (config, _, _) = setup();
        let paths = artifact_paths(&config, None);
        assert_eq!(paths.matrix, PathBuf::from("out/grades.csv"));
        assert_eq!(paths.totals, PathBuf::from("out/grades_total.csv"));
        assert_eq!(paths.chart, PathBuf::from("out/grades_chart.csv"));

        let paths = artifact_paths(&config, Some(Path::new("/tmp/run")));
        assert_eq!(paths.matrix, PathBuf::from("/tmp/run/out/grades.csv"));
    }

    #[test]
    fn matrix_csv_marks_incomplete_rows() {
        let (config, roster, grades) = setup();
        let matrix = compute_matrix(&config, &roster, &grades);

        let mut buf = Vec::new();
        write_matrix_csv(&mut buf, &matrix, &config, &grades).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "period,student,A_P1,A_P2,Avg A,B_Q1,Avg B,Final Grade,Qualitative"
        );
        assert_eq!(lines[1], "T1,Alice,80.0,90.0,85.0,70.0,70.0,80.5,High");
        assert_eq!(lines[2], "T1,Bob,55.5,,55.5,,incomplete,incomplete,incomplete");
    }

    #[test]
    fn totals_csv_has_year_columns() {
        let (config, roster, grades) = setup();
        let matrix = compute_matrix(&config, &roster, &grades);

        let mut buf = Vec::new();
        write_totals_csv(&mut buf, &matrix, &config).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "student,T1 Grade,T1 Qual,Year Average,Year Qualitative");
        assert_eq!(lines[1], "Alice,80.5,High,80.5,High");
        assert_eq!(lines[2], "Bob,incomplete,incomplete,incomplete,incomplete");
    }

    #[test]
    fn artifact_files_are_written_whole() {
        let (config, roster, grades) = setup();
        let matrix = compute_matrix(&config, &roster, &grades);
        let dir = tempfile::tempdir().unwrap();

        let paths = artifact_paths(&config, Some(dir.path()));
        write_artifact(&paths, &matrix, &config, &grades, &[]).unwrap();
        let json = dir.path().join("matrix.json");
        write_matrix_json(&json, &matrix).unwrap();

        let written = fs::read_to_string(&paths.matrix).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert!(paths.totals.exists());

        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed["periods"][0]["rows"][0]["label"], "High");

        // No temp files left next to the CSVs, and no chart unless asked for.
        let leftovers = fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(leftovers, 2);
        assert!(!paths.chart.exists());
    }

    #[test]
    fn failed_write_leaves_no_partial_artifact() {
        let (config, roster, grades) = setup();
        let matrix = compute_matrix(&config, &roster, &grades);
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the totals directory should be.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let paths = ArtifactPaths {
            matrix: dir.path().join("grades.csv"),
            totals: blocker.join("grades_total.csv"),
            chart: dir.path().join("grades_chart.csv"),
        };
        let err = write_artifact(&paths, &matrix, &config, &grades, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(!paths.matrix.exists());
        // Only the blocker remains; the staged matrix temp file was dropped.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn chart_columns_resolve_by_sheet_name() {
        let (config, _, _) = setup();
        let names: Vec<String> = available_chart_columns(&config).iter().map(ChartColumn::name).collect();
        assert_eq!(names, ["A_P1", "A_P2", "B_Q1", "Avg A", "Avg B", "Final Grade"]);

        let requested = vec!["Final Grade".to_string(), " A_P1 ".to_string(), "Final Grade".to_string()];
        assert_eq!(
            resolve_chart_columns(&config, &requested).unwrap(),
            vec![ChartColumn::Final, ChartColumn::Score(CategoryId::A, "P1".into())]
        );

        let err = resolve_chart_columns(&config, &["Qualitative".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("Available: A_P1"));
    }

    #[test]
    fn chart_csv_leaves_missing_values_blank() {
        let (config, roster, grades) = setup();
        let matrix = compute_matrix(&config, &roster, &grades);
        let columns = vec![
            ChartColumn::Score(CategoryId::B, "Q1".into()),
            ChartColumn::Average(CategoryId::A),
            ChartColumn::Final,
        ];

        let mut buf = Vec::new();
        write_chart_csv(&mut buf, &matrix, &config, &grades, &columns).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "student,T1 - B_Q1,T1 - Avg A,T1 - Final Grade");
        assert_eq!(lines[1], "Alice,70.0,85.0,80.5");
        assert_eq!(lines[2], "Bob,,55.5,");
    }

    #[test]
    fn chart_file_is_written_when_requested() {
        let (config, roster, grades) = setup();
        let matrix = compute_matrix(&config, &roster, &grades);
        let dir = tempfile::tempdir().unwrap();

        let paths = artifact_paths(&config, Some(dir.path()));
        write_artifact(&paths, &matrix, &config, &grades, &[ChartColumn::Final]).unwrap();

        let chart = fs::read_to_string(&paths.chart).unwrap();
        assert_eq!(chart.lines().next(), Some("student,T1 - Final Grade"));
        assert_eq!(fs::read_dir(dir.path().join("out")).unwrap().count(), 3);
    }
}
