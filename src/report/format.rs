//! Terminal tables for configuration, validation, per-period results and
//! year totals.

use crate::domain::{BandPolicy, MatrixConfig, ScaleSpec, Severity, ValidationIssue};
use crate::grading::{GradeMatrix, PeriodSheet, round_to};
use crate::io::grades::RowError;
use crate::report::{fmt_label, fmt_opt};

const NAME_WIDTH: usize = 24;
const VALUE_WIDTH: usize = 10;
const LABEL_WIDTH: usize = 20;
const PERIOD_WIDTH: usize = 12;

/// Row errors listed before the rest are summarised as a count.
const MAX_ROW_ERRORS: usize = 20;

/// Configuration summary printed at the top of every run.
pub fn format_config_summary(config: &MatrixConfig) -> String {
    let mut out = String::new();

    out.push_str("=== gm - Student Grading Matrix ===\n");
    out.push_str(&format!(
        "Scale: {} - {} ({} decimal place{})\n",
        config.scale.min,
        config.scale.max,
        config.scale.decimal_places,
        if config.scale.decimal_places == 1 { "" } else { "s" },
    ));
    for category in [&config.set_a, &config.set_b] {
        out.push_str(&format!(
            "{} ({}%): {}\n",
            category.name,
            fmt_percent(category.weight),
            category.projects.join(", "),
        ));
    }
    out.push_str(&format!("Periods: {}\n", config.trimesters.join(", ")));
    out.push_str(&format!("Output: {}\n", config.output_file));

    if config.qualitative_grades.is_empty() {
        out.push_str("Qualitative bands: none\n");
    } else {
        out.push_str(&format!("Qualitative bands ({}):\n", policy_name(config)));
        for band in &config.qualitative_grades {
            out.push_str(&format!(
                "  {:<width$} {} - {}\n",
                truncate(&band.label, LABEL_WIDTH),
                band.min,
                band.max,
                width = LABEL_WIDTH,
            ));
        }
    }

    out
}

/// Validation findings, errors first in the order they were found.
pub fn format_issues(issues: &[ValidationIssue]) -> String {
    let errors = issues.iter().filter(|i| i.is_error()).count();
    let warnings = issues.len() - errors;

    if issues.is_empty() {
        return "Validation: OK\n".to_string();
    }

    let mut out = format!("Validation: {errors} error(s), {warnings} warning(s)\n");
    for severity in [Severity::Error, Severity::Warning] {
        for issue in issues.iter().filter(|i| i.severity == severity) {
            out.push_str(&format!("  {:<8} {}: {}\n", severity, issue.field, issue.message));
        }
    }
    out
}

/// Grade rows and cells skipped during ingest.
pub fn format_row_errors(source: &str, errors: &[RowError]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let mut out = format!("Skipped in {source}: {} problem(s)\n", errors.len());
    for err in errors.iter().take(MAX_ROW_ERRORS) {
        let location = match (&err.student, &err.column) {
            (Some(student), Some(column)) => format!("{student} / {column}"),
            (Some(student), None) => student.clone(),
            (None, _) => "-".to_string(),
        };
        out.push_str(&format!("  line {:>4}  {}: {}\n", err.line, location, err.message));
    }
    if errors.len() > MAX_ROW_ERRORS {
        out.push_str(&format!("  ... {} more\n", errors.len() - MAX_ROW_ERRORS));
    }
    out
}

/// One results table for a single period.
pub fn format_period_table(sheet: &PeriodSheet, scale: &ScaleSpec) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n--- {} ({}/{} graded) ---\n",
        sheet.period,
        sheet.graded_count(),
        sheet.rows.len(),
    ));
    out.push_str(&format!(
        "{:<nw$} {:>vw$} {:>vw$} {:>vw$}  {:<lw$}\n",
        "Student",
        "Avg A",
        "Avg B",
        "Final",
        "Qualitative",
        nw = NAME_WIDTH,
        vw = VALUE_WIDTH,
        lw = LABEL_WIDTH,
    ));

    for row in &sheet.rows {
        out.push_str(&format!(
            "{:<nw$} {:>vw$} {:>vw$} {:>vw$}  {:<lw$}\n",
            truncate(&row.student, NAME_WIDTH),
            fmt_opt(row.category_a, scale),
            fmt_opt(row.category_b, scale),
            fmt_opt(row.overall_display, scale),
            truncate(fmt_label(row.overall_display, row.label.as_deref()), LABEL_WIDTH),
            nw = NAME_WIDTH,
            vw = VALUE_WIDTH,
            lw = LABEL_WIDTH,
        ));
    }
    out
}

/// Year totals: every period's final grade and the year average.
pub fn format_totals(matrix: &GradeMatrix, config: &MatrixConfig) -> String {
    let mut out = String::from("\n--- Year totals ---\n");

    out.push_str(&format!("{:<nw$}", "Student", nw = NAME_WIDTH));
    for period in &config.trimesters {
        out.push_str(&format!(" {:>pw$}", truncate(period, PERIOD_WIDTH), pw = PERIOD_WIDTH));
    }
    out.push_str(&format!(" {:>vw$}  {:<lw$}\n", "Year", "Qualitative", vw = VALUE_WIDTH, lw = LABEL_WIDTH));

    for total in &matrix.totals {
        out.push_str(&format!("{:<nw$}", truncate(&total.student, NAME_WIDTH), nw = NAME_WIDTH));
        for grade in &total.period_grades {
            out.push_str(&format!(" {:>pw$}", fmt_opt(*grade, &config.scale), pw = PERIOD_WIDTH));
        }
        out.push_str(&format!(
            " {:>vw$}  {:<lw$}\n",
            fmt_opt(total.year_display, &config.scale),
            truncate(fmt_label(total.year_display, total.year_label.as_deref()), LABEL_WIDTH),
            vw = VALUE_WIDTH,
            lw = LABEL_WIDTH,
        ));
    }
    out
}

/// How much of each period has been graded.
pub fn format_completeness(matrix: &GradeMatrix) -> String {
    let mut out = String::from("\nCompleteness:\n");
    for sheet in &matrix.periods {
        let students = sheet.rows.len();
        let graded = sheet.graded_count();
        out.push_str(&format!(
            "  {:<pw$} {:>4}/{:<4} students graded  {:>5}/{:<5} scores entered{}\n",
            truncate(&sheet.period, PERIOD_WIDTH),
            graded,
            students,
            sheet.entered_count(),
            sheet.expected_count(),
            if graded < students { "  (incomplete)" } else { "" },
            pw = PERIOD_WIDTH,
        ));
    }
    out
}

/// Everything printed after a successful generation.
pub fn format_matrix_report(matrix: &GradeMatrix, config: &MatrixConfig) -> String {
    let mut out = String::new();
    for sheet in &matrix.periods {
        out.push_str(&format_period_table(sheet, &config.scale));
    }
    out.push_str(&format_totals(matrix, config));
    out.push_str(&format_completeness(matrix));
    out
}

fn policy_name(config: &MatrixConfig) -> &'static str {
    match config.band_policy {
        BandPolicy::FirstMatch => "first match",
        BandPolicy::HighestFloor => "highest floor",
    }
}

fn fmt_percent(weight: f64) -> String {
    format!("{}", round_to(weight * 100.0, 2))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryId, GradeKey, MatrixConfig, QualitativeBand, Roster, WeightedCategory};
    use crate::grading::{GradeTable, compute_matrix};

    fn matrix() -> (MatrixConfig, GradeMatrix) {
        let config = MatrixConfig {
            set_a: WeightedCategory::new("Set A", 0.7, &["P1"]),
            set_b: WeightedCategory::new("Set B", 0.3, &["Q1"]),
            qualitative_grades: vec![
                QualitativeBand::new("Strong", 80.0, 100.0),
                QualitativeBand::new("Growing", 0.0, 79.9),
            ],
            trimesters: vec!["T1".into(), "T2".into()],
            ..MatrixConfig::default()
        }
        .into_validated()
        .unwrap();
        let roster = Roster::new(["Ana", "Bruno"]);
        let mut grades = GradeTable::new();
        for (student, period, cat, project, value) in [
            ("Ana", "T1", CategoryId::A, "P1", 90.0),
            ("Ana", "T1", CategoryId::B, "Q1", 80.0),
            ("Bruno", "T1", CategoryId::A, "P1", 40.0),
        ] {
            grades
                .record(&config, &roster, GradeKey::new(student, period, cat, project), value)
                .unwrap();
        }
        let matrix = compute_matrix(&config, &roster, &grades);
        (config.into_inner(), matrix)
    }

    #[test]
    fn config_summary_lists_weights_and_bands() {
        let text = format_config_summary(&MatrixConfig::default());
        assert!(text.contains("(70%): Project 1, Project 2, Project 3, Project 4"));
        assert!(text.contains("(30%): Project 1, Project 2"));
        assert!(text.contains("Consistent Impact"));
        assert!(text.contains("Periods: Trimester 1, Trimester 2, Trimester 3"));
    }

    #[test]
    fn issues_list_errors_before_warnings() {
        let issues = vec![
            ValidationIssue::warning("qualitative_grades", "gap between 70 and 80"),
            ValidationIssue::error("set_a.weight", "must be between 0 and 1"),
        ];
        let text = format_issues(&issues);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Validation: 1 error(s), 1 warning(s)");
        assert!(lines[1].contains("error") && lines[1].contains("set_a.weight"));
        assert!(lines[2].contains("warning"));
        assert_eq!(format_issues(&[]), "Validation: OK\n");
    }

    #[test]
    fn period_table_marks_incomplete_students() {
        let (config, matrix) = matrix();
        let text = format_period_table(&matrix.periods[0], &config.scale);

        assert!(text.contains("--- T1 (1/2 graded) ---"));
        let ana = text.lines().find(|l| l.starts_with("Ana")).unwrap();
        assert!(ana.contains("87.0") && ana.contains("Strong"));
        let bruno = text.lines().find(|l| l.starts_with("Bruno")).unwrap();
        assert!(bruno.contains("40.0") && bruno.contains("incomplete"));
    }

    #[test]
    fn totals_and_completeness() {
        let (config, matrix) = matrix();

        let totals = format_totals(&matrix, &config);
        let ana = totals.lines().find(|l| l.starts_with("Ana")).unwrap();
        // T2 has no scores, so the year average is T1 alone.
        assert!(ana.contains("incomplete"));
        assert!(ana.trim_end().ends_with("Strong"));

        let completeness = format_completeness(&matrix);
        let t1 = completeness.lines().find(|l| l.trim_start().starts_with("T1")).unwrap();
        assert!(t1.contains("1/2") && t1.contains("3/4") && t1.contains("(incomplete)"));
    }

    #[test]
    fn row_errors_are_capped() {
        let errors: Vec<RowError> = (0..25)
            .map(|i| RowError {
                line: i + 2,
                student: Some("Ana".into()),
                column: Some("A_P1".into()),
                message: "Invalid grade value".into(),
            })
            .collect();
        let text = format_row_errors("t1.csv", &errors);
        assert!(text.starts_with("Skipped in t1.csv: 25 problem(s)"));
        assert!(text.contains("Ana / A_P1"));
        assert!(text.trim_end().ends_with("... 5 more"));
        assert!(format_row_errors("t1.csv", &[]).is_empty());
    }

    #[test]
    fn truncate_basic() {
        assert_eq!(truncate("Consistent Impact", 30), "Consistent Impact");
        assert_eq!(truncate("Consistent Impact", 6), "Consi.");
    }
}
