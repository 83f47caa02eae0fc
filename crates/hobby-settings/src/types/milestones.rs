use serde::{Deserialize, Serialize};

/// Upper bound accepted for `maxDepth`.
pub const MAX_DEPTH_LIMIT: u32 = 32;

/// Milestone tree limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MilestoneSettings {
    /// Deepest level a milestone may be created at (roots are depth 0).
    pub max_depth: u32,
}

impl Default for MilestoneSettings {
    fn default() -> Self {
        Self {
            max_depth: hobby_core::DEFAULT_MAX_DEPTH,
        }
    }
}
