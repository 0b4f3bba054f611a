//! Grading core: score checks, band lookup, validation and aggregation.
//!
//! Responsibilities:
//!
//! - accept or reject individual scores against the scale
//! - map averages to qualitative labels
//! - validate configuration and roster, collecting every issue
//! - aggregate the sparse grade table into the grade matrix

pub mod bands;
pub mod category;
pub mod matrix;
pub mod scale;
pub mod table;
pub mod validate;

pub use bands::*;
pub use category::*;
pub use matrix::*;
pub use scale::*;
pub use table::*;
pub use validate::*;
