use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Persistence location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// `SQLite` database file. A leading `~/` expands to `$HOME`.
    pub database_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: "~/.hobbylist/milestones.db".to_string(),
        }
    }
}

impl StorageSettings {
    /// Database path with `~/` expanded.
    pub fn resolved_database_path(&self) -> PathBuf {
        match self.database_path.strip_prefix("~/") {
            Some(rest) => {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(rest)
            }
            None => PathBuf::from(&self.database_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_is_untouched() {
        let storage = StorageSettings {
            database_path: "/data/m.db".to_string(),
        };
        assert_eq!(storage.resolved_database_path(), PathBuf::from("/data/m.db"));
    }

    #[test]
    fn tilde_is_expanded() {
        let resolved = StorageSettings::default().resolved_database_path();
        assert!(!resolved.starts_with("~"));
        assert!(resolved.ends_with(".hobbylist/milestones.db"));
    }
}
