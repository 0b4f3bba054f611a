//! Configuration file read/write.
//!
//! A config file only needs the keys it wants to change. `scale`, `set_a` and
//! `set_b` are merged key by key over the defaults; every other key replaces
//! its default wholesale (a partial band list is never mixed with the default
//! bands).

use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::MatrixConfig;
use crate::error::AppError;
use crate::io::export::write_atomic;

/// Sections merged field by field rather than replaced.
const NESTED_SECTIONS: [&str; 3] = ["scale", "set_a", "set_b"];

const KNOWN_KEYS: [&str; 7] = [
    "scale",
    "set_a",
    "set_b",
    "qualitative_grades",
    "band_policy",
    "trimesters",
    "output_file",
];

/// Read a configuration JSON file and fill missing keys from the defaults.
pub fn read_config_json(path: &Path) -> Result<MatrixConfig, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| AppError::new(2, format!("Failed to parse config '{}': {e}", path.display())))?;

    let config = merge_config(value)
        .map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Merge a user JSON document over `MatrixConfig::default()`.
pub fn merge_config(user: Value) -> Result<MatrixConfig, serde_json::Error> {
    let Value::Object(user) = user else {
        return Err(serde::de::Error::custom("top level must be a JSON object"));
    };

    let mut merged = match serde_json::to_value(MatrixConfig::default())? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for (key, value) in user {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            warn!(key = %key, "ignoring unknown config key");
            continue;
        }

        if NESTED_SECTIONS.contains(&key.as_str()) {
            if let (Some(Value::Object(base)), Value::Object(overrides)) = (merged.get_mut(&key), &value) {
                base.extend(overrides.clone());
                continue;
            }
        }
        merged.insert(key, value);
    }

    serde_json::from_value(Value::Object(merged))
}

/// Write `config` as pretty JSON. Refuses to overwrite unless `force` is set.
pub fn write_config_json(path: &Path, config: &MatrixConfig, force: bool) -> Result<(), AppError> {
    if path.exists() && !force {
        return Err(AppError::new(
            2,
            format!("Config '{}' already exists (use --force to overwrite).", path.display()),
        ));
    }

    write_atomic(path, "config", |w| {
        serde_json::to_writer_pretty(&mut *w, config)?;
        writeln!(w)
    })
}
