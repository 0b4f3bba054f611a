//! `grade-matrix` library crate.
//!
//! The binary (`gm`) is a thin wrapper around this library so that:
//!
//! - the grading pipeline is testable without spawning processes
//! - an interactive front-end can drive the same validation and aggregation
//!   on every edit without touching files

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod grading;
pub mod io;
pub mod logging;
pub mod report;
