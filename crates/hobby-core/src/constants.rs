//! Package-level constants.

/// Current version of the hobbylist crates (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "hobbylist";

/// Deepest level a milestone may sit at. Roots are depth 0, so a tree
/// holds at most `DEFAULT_MAX_DEPTH + 1` levels.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3, "VERSION must be semver (MAJOR.MINOR.PATCH)");
        for part in parts {
            let _: u32 = part.parse().expect("each semver segment must be a number");
        }
    }

    #[test]
    fn name_is_lowercase() {
        assert_eq!(NAME, NAME.to_lowercase());
    }

    #[test]
    fn default_depth_allows_six_levels() {
        assert_eq!(DEFAULT_MAX_DEPTH + 1, 6);
    }
}
