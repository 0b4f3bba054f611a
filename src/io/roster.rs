//! Roster import.
//!
//! Two formats are accepted:
//!
//! - plain text: one student per line; blank lines and `#` comments skipped
//! - CSV (`.csv` extension): the first column of every row after the header
//!
//! Names are trimmed but otherwise kept as written. Duplicates and blanks are
//! left in place for `grading::validate_roster` to report.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::domain::Roster;
use crate::error::AppError;

/// Load a roster, choosing the format from the file extension.
pub fn read_roster(path: &Path) -> Result<Roster, AppError> {
    let mut file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open roster '{}': {e}", path.display())))?;

    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let roster = if is_csv {
        parse_roster_csv(file)?
    } else {
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|e| AppError::new(2, format!("Failed to read roster '{}': {e}", path.display())))?;
        parse_roster_text(&text)
    };

    debug!(path = %path.display(), students = roster.len(), "loaded roster");
    Ok(roster)
}

pub fn parse_roster_text(text: &str) -> Roster {
    Roster::new(
        text.lines()
            .map(|line| line.trim().trim_start_matches('\u{feff}'))
            .filter(|line| !line.is_empty() && !line.starts_with('#')),
    )
}

pub fn parse_roster_csv<R: Read>(reader: R) -> Result<Roster, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut names = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| AppError::new(2, format!("Roster CSV parse error on line {}: {e}", idx + 2)))?;
        // Rows with an empty first column are spacer rows, not students.
        if let Some(name) = record.get(0).filter(|s| !s.is_empty()) {
            names.push(name.to_string());
        }
    }
    Ok(Roster::new(names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_blank_and_comment_lines() {
        let roster = parse_roster_text("# class 7B\nAna Lima\n\n  Bruno  \n#Carla\nDiego\n");
        assert_eq!(roster.names(), ["Ana Lima", "Bruno", "Diego"]);
    }

    #[test]
    fn text_keeps_duplicates_for_validation() {
        let roster = parse_roster_text("Ana\nAna\n");
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn csv_takes_first_column_after_header() {
        let csv = "Student Name,Email\nAna,ana@school\n,\nBruno,bruno@school\n";
        let roster = parse_roster_csv(csv.as_bytes()).unwrap();
        assert_eq!(roster.names(), ["Ana", "Bruno"]);
    }

    #[test]
    fn extension_selects_format() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("students.csv");
        std::fs::write(&csv_path, "name\n\"Lima, Ana\"\n").unwrap();
        assert_eq!(read_roster(&csv_path).unwrap().names(), ["Lima, Ana"]);

        let txt_path = dir.path().join("students.txt");
        std::fs::write(&txt_path, "name\nLima, Ana\n").unwrap();
        assert_eq!(read_roster(&txt_path).unwrap().names(), ["name", "Lima, Ana"]);
    }

    #[test]
    fn missing_file_is_a_usage_error() {
        let err = read_roster(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
