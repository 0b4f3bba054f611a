//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the configuration document (`MatrixConfig` and its parts)
//! - roster and grade-table addressing (`Roster`, `GradeKey`)
//! - validation findings (`ValidationIssue`, `Severity`)

pub mod types;

pub use types::*;
