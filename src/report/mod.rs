//! Reporting utilities: formatted terminal output for a grading run.
//!
//! Formatting lives in one place so the grading core stays free of display
//! concerns. The CSV exporter reuses the value helpers below, so the terminal
//! and the artifact always agree on how a missing value reads.

pub mod format;

pub use format::*;

use crate::domain::ScaleSpec;

/// Shown wherever a derived value is undefined because scores are missing.
pub const INCOMPLETE: &str = "incomplete";

/// Shown when an average exists but no band covers it.
pub const NO_LABEL: &str = "-";

/// Render an optional derived value at scale precision.
pub fn fmt_opt(value: Option<f64>, scale: &ScaleSpec) -> String {
    match value {
        Some(v) => scale.format(v),
        None => INCOMPLETE.to_string(),
    }
}

/// Render a qualitative label next to the value it was derived from.
pub fn fmt_label<'a>(value: Option<f64>, label: Option<&'a str>) -> &'a str {
    match (value, label) {
        (_, Some(label)) => label,
        (None, None) => INCOMPLETE,
        (Some(_), None) => NO_LABEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_read_as_incomplete() {
        let scale = ScaleSpec::default();
        assert_eq!(fmt_opt(Some(80.46), &scale), "80.5");
        assert_eq!(fmt_opt(None, &scale), "incomplete");
    }

    #[test]
    fn labels_distinguish_incomplete_from_unlabeled() {
        assert_eq!(fmt_label(Some(85.0), Some("B")), "B");
        assert_eq!(fmt_label(Some(12.0), None), "-");
        assert_eq!(fmt_label(None, None), "incomplete");
    }
}
