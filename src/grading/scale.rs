//! Score bounds checking and display rounding.

use crate::domain::ScaleSpec;
use crate::error::EntryError;

/// Scaled values within this distance of a half step round away from zero.
///
/// Weighted averages such as `85 * 0.7 + 70 * 0.3` land a hair below the
/// decimal they represent in binary floating point.
const ROUNDING_SLACK: f64 = 1e-9;

impl ScaleSpec {
    /// Accept `value` if it lies within `[min, max]`.
    ///
    /// The check uses the value as entered; rounding only applies to display.
    pub fn validate_score(&self, value: f64) -> Result<f64, EntryError> {
        if !value.is_finite() {
            return Err(EntryError::NonFinite);
        }
        if value < self.min || value > self.max {
            return Err(EntryError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }

    /// Round to the configured number of decimal places.
    pub fn round(&self, value: f64) -> f64 {
        round_to(value, self.decimal_places)
    }

    /// Render a value with exactly `decimal_places` digits.
    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.decimal_places as usize, self.round(value))
    }

    /// Smallest difference two displayed values can have.
    pub fn step(&self) -> f64 {
        10f64.powi(-(self.decimal_places as i32))
    }
}

/// Round half away from zero at `decimal_places`.
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimal_places as i32);
    let scaled = value * factor;
    let nudged = scaled + scaled.signum() * ROUNDING_SLACK;
    nudged.round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> ScaleSpec {
        ScaleSpec {
            min: 0.0,
            max: 100.0,
            decimal_places: 1,
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let s = scale();
        assert_eq!(s.validate_score(0.0), Ok(0.0));
        assert_eq!(s.validate_score(100.0), Ok(100.0));
    }

    #[test]
    fn just_outside_bounds_is_rejected() {
        let s = scale();
        assert!(matches!(
            s.validate_score(-1.0),
            Err(EntryError::OutOfRange { value, .. }) if value == -1.0
        ));
        assert!(matches!(
            s.validate_score(101.0),
            Err(EntryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn validation_ignores_display_precision() {
        // 100.04 would display as 100.0 but is still above the maximum.
        let s = scale();
        assert!(s.validate_score(100.04).is_err());
    }

    #[test]
    fn non_finite_is_rejected() {
        let s = scale();
        assert_eq!(s.validate_score(f64::NAN), Err(EntryError::NonFinite));
        assert_eq!(s.validate_score(f64::INFINITY), Err(EntryError::NonFinite));
    }

    #[test]
    fn negative_scale_bounds() {
        let s = ScaleSpec {
            min: -10.0,
            max: 10.0,
            decimal_places: 0,
        };
        assert!(s.validate_score(-10.0).is_ok());
        assert!(s.validate_score(-11.0).is_err());
    }

    #[test]
    fn rounding_absorbs_binary_error() {
        let weighted = 85.0 * 0.7 + 70.0 * 0.3;
        assert_eq!(round_to(weighted, 1), 80.5);
        assert_eq!(round_to(weighted, 0), 81.0);
        assert_eq!(round_to(89.65, 1), 89.7);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }

    #[test]
    fn format_pads_to_precision() {
        let s = scale();
        assert_eq!(s.format(85.0), "85.0");
        assert_eq!(s.format(80.449), "80.4");
        assert!((s.step() - 0.1).abs() < 1e-12);
    }
}
