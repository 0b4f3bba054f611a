//! Input/output helpers.
//!
//! - configuration JSON read/write with defaults (`config`)
//! - roster import from text or CSV (`roster`)
//! - grade entry template + ingest (`grades`)
//! - matrix exports (CSV/JSON) (`export`)

pub mod config;
pub mod export;
pub mod grades;
pub mod roster;

pub use config::*;
pub use export::*;
pub use grades::*;
pub use roster::*;
