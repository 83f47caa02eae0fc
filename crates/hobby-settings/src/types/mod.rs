//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields keep their compiled default.

mod milestones;
mod storage;

pub use milestones::*;
pub use storage::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "milestones": { "maxDepth": 3 },
///   "storage": { "databasePath": "/var/lib/hobbylist/milestones.db" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HobbySettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Milestone tree limits.
    pub milestones: MilestoneSettings,
    /// Persistence location.
    pub storage: StorageSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for HobbySettings {
    fn default() -> Self {
        Self {
            version: hobby_core::constants::VERSION.to_string(),
            name: hobby_core::constants::NAME.to_string(),
            milestones: MilestoneSettings::default(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(HobbySettings::default()).unwrap();
        assert_eq!(json["milestones"]["maxDepth"], 5);
        assert!(json["storage"]["databasePath"].is_string());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: HobbySettings =
            serde_json::from_str(r#"{"milestones": {"maxDepth": 2}}"#).unwrap();
        assert_eq!(settings.milestones.max_depth, 2);
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.name, "hobbylist");
    }
}
