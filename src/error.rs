use thiserror::Error;

use crate::domain::CategoryId;

/// Top-level error carried back to `main`, which prints the message and exits
/// with `exit_code`.
///
/// Exit codes:
/// - `2`: usage, file I/O or unparsable input
/// - `3`: blocking validation errors (generation refused)
/// - `4`: internal invariant failure
#[derive(Clone, Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

/// Why a single score was refused at entry time.
///
/// A refused score never reaches the grade table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryError {
    #[error("grade must be a finite number")]
    NonFinite,

    #[error("grade {value} is outside scale ({min}-{max})")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("unknown student '{0}'")]
    UnknownStudent(String),

    #[error("unknown period '{0}'")]
    UnknownPeriod(String),

    #[error("unknown project '{project}' in {category}")]
    UnknownProject { category: CategoryId, project: String },
}

/// Structural misuse of the aggregation engine (asking for a cell that cannot
/// exist). Missing grades are not errors; they surface as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("student '{0}' is not on the roster")]
    UnknownStudent(String),

    #[error("period '{0}' is not configured")]
    UnknownPeriod(String),
}
