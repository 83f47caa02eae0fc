//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HobbySettings::default()`]
//! 2. If `~/.hobbylist/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate ranges
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{HobbySettings, MAX_DEPTH_LIMIT};

/// Resolve the path to the settings file (`~/.hobbylist/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".hobbylist").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HobbySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<HobbySettings> {
    let mut settings = merge_file_over_defaults(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn merge_file_over_defaults(path: &Path) -> Result<HobbySettings> {
    let defaults = serde_json::to_value(HobbySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Reject values the milestone service cannot run with.
pub fn validate(settings: &HobbySettings) -> Result<()> {
    if settings.milestones.max_depth > MAX_DEPTH_LIMIT {
        return Err(SettingsError::InvalidValue(format!(
            "maxDepth {} exceeds {MAX_DEPTH_LIMIT}",
            settings.milestones.max_depth
        )));
    }
    if settings.storage.database_path.trim().is_empty() {
        return Err(SettingsError::InvalidValue(
            "databasePath must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Apply `HOBBYLIST_*` environment variable overrides.
///
/// Invalid values are ignored with a warning (file/default value wins).
pub fn apply_env_overrides(settings: &mut HobbySettings) {
    if let Some(v) = read_env_u32("HOBBYLIST_MAX_DEPTH", 0, MAX_DEPTH_LIMIT) {
        settings.milestones.max_depth = v;
    }
    if let Some(v) = read_env_string("HOBBYLIST_DB_PATH") {
        settings.storage.database_path = v;
    }
    if let Some(v) = read_env_string("HOBBYLIST_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}
