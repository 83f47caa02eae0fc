//! # hobby-settings
//!
//! Configuration for the milestone service, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`HobbySettings::default()`]
//! 2. **User file**: `~/.hobbylist/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `HOBBYLIST_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use hobby_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("max depth: {}", settings.milestones.max_depth);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<HobbySettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads `~/.hobbylist/settings.json` with env overrides and
/// falls back to compiled defaults if loading fails.
pub fn get_settings() -> &'static HobbySettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            HobbySettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: HobbySettings) -> std::result::Result<(), HobbySettings> {
    SETTINGS.set(settings)
}
