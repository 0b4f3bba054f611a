//! Structured logging setup.
//!
//! Logs go to stderr so report output on stdout stays clean for piping.
//! `GM_LOG` (or `RUST_LOG`) overrides the level given on the command line.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::AppError;

pub fn init(level: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_env("GM_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            EnvFilter::new(if level.contains('=') {
                level.to_string()
            } else {
                format!("grade_matrix={level}")
            })
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| AppError::new(4, format!("Failed to initialise logging: {e}")))
}
