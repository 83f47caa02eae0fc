//! Milestone data model.
//!
//! Nodes form an arena keyed by [`MilestoneId`]: parent and child links are
//! stored as IDs, never as live references, and every traversal resolves
//! through a [`MilestoneStore`](crate::store::MilestoneStore).

use chrono::{DateTime, Utc};
use hobby_core::{MilestoneId, PhotoId, UserId};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a user explicitly forced a node's completion state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualState {
    /// State is derived from children (or the leaf's own flag).
    #[default]
    None,
    /// User marked the node complete. Cleared when children regress.
    Complete,
    /// User marked the node incomplete. Never cleared by reconciliation.
    Incomplete,
}

impl ManualState {
    /// SQL string representation (matches the `SQLite` CHECK constraint values).
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
        }
    }

    /// Parse the SQL representation. Unknown values fall back to `None`.
    #[must_use]
    pub fn from_sql(s: &str) -> Self {
        match s {
            "complete" => Self::Complete,
            "incomplete" => Self::Incomplete,
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for ManualState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Nodes
// ─────────────────────────────────────────────────────────────────────────────

/// One milestone, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneNode {
    /// Immutable identifier.
    pub id: MilestoneId,
    /// Owning user.
    pub owner_id: UserId,
    /// Display text.
    pub task: String,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Effective completion flag.
    pub completed: bool,
    /// Derived fractional completion in `[0.0, 1.0]`.
    pub completion_rate: f64,
    /// Explicit user override, if any.
    pub manual_state: ManualState,
    /// Owning ancestor; `None` for roots.
    pub parent_id: Option<MilestoneId>,
    /// Direct children, populated by the store on load.
    #[serde(default)]
    pub children: Vec<MilestoneId>,
    /// 0 for roots, `parent.depth + 1` otherwise.
    pub depth: u32,
    /// Free-form hobby label (normalized to lowercase).
    pub hobby_tag: Option<String>,
    /// Photos this milestone is tagged on.
    #[serde(default)]
    pub tagged_photo_ids: Vec<PhotoId>,
}

impl MilestoneNode {
    /// A fresh, incomplete node with no children.
    pub fn new(owner_id: UserId, task: impl Into<String>, parent: Option<&MilestoneNode>) -> Self {
        Self {
            id: MilestoneId::new(),
            owner_id,
            task: task.into(),
            due_date: None,
            created_at: Utc::now(),
            completed: false,
            completion_rate: 0.0,
            manual_state: ManualState::None,
            parent_id: parent.map(|p| p.id.clone()),
            children: Vec::new(),
            depth: parent.map_or(0, |p| p.depth + 1),
            hobby_tag: None,
            tagged_photo_ids: Vec::new(),
        }
    }

    /// Whether this node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for creating a milestone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneCreateParams {
    /// Display text (required, non-blank).
    pub task: String,
    /// Optional deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Parent milestone; `None` creates a root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MilestoneId>,
    /// Hobby label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hobby_tag: Option<String>,
    /// Photos to tag.
    #[serde(default)]
    pub tagged_photo_ids: Vec<PhotoId>,
}

/// Partial update of a milestone. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneUpdateParams {
    /// New display text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// New deadline. `Some(None)` clears it; JSON `null` is treated as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    /// New hobby label. An empty string clears it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hobby_tag: Option<String>,
    /// Replacement photo tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagged_photo_ids: Option<Vec<PhotoId>>,
    /// Completion toggle, applied as mark-complete / mark-incomplete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl MilestoneUpdateParams {
    /// Whether the update touches any plain (non-completion) field.
    pub fn has_field_edits(&self) -> bool {
        self.task.is_some()
            || self.due_date.is_some()
            || self.hobby_tag.is_some()
            || self.tagged_photo_ids.is_some()
    }
}

/// Filter for listing milestones.
#[derive(Debug, Clone, Default)]
pub struct MilestoneFilter {
    /// Restrict to one owner.
    pub owner_id: Option<UserId>,
    /// Only nodes without a parent.
    pub roots_only: bool,
    /// Only nodes with no tagged photos.
    pub without_photos: bool,
}

impl MilestoneFilter {
    /// All milestones of `owner`.
    pub fn owned_by(owner: &UserId) -> Self {
        Self {
            owner_id: Some(owner.clone()),
            ..Self::default()
        }
    }

    /// Whether `node` passes this filter.
    pub fn matches(&self, node: &MilestoneNode) -> bool {
        self.owner_id.as_ref().is_none_or(|o| *o == node.owner_id)
            && (!self.roots_only || node.is_root())
            && (!self.without_photos || node.tagged_photo_ids.is_empty())
    }
}

/// Trim and lowercase a hobby label; blank labels become `None`.
pub fn normalize_hobby_tag(tag: Option<&str>) -> Option<String> {
    tag.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_state_sql_roundtrip() {
        for state in [ManualState::None, ManualState::Complete, ManualState::Incomplete] {
            assert_eq!(ManualState::from_sql(state.as_sql()), state);
        }
        assert_eq!(ManualState::from_sql("garbage"), ManualState::None);
    }

    #[test]
    fn manual_state_serializes_lowercase() {
        let json = serde_json::to_string(&ManualState::Incomplete).unwrap();
        assert_eq!(json, "\"incomplete\"");
    }

    #[test]
    fn new_root_starts_incomplete_at_depth_zero() {
        let node = MilestoneNode::new(UserId::new(), "Learn scales", None);
        assert!(node.is_root());
        assert!(node.children.is_empty());
        assert_eq!(node.depth, 0);
        assert!(!node.completed);
        assert_eq!(node.completion_rate, 0.0);
        assert_eq!(node.manual_state, ManualState::None);
    }

    #[test]
    fn new_child_inherits_depth_and_parent() {
        let owner = UserId::new();
        let parent = MilestoneNode::new(owner.clone(), "Guitar", None);
        let child = MilestoneNode::new(owner, "Chords", Some(&parent));
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_id.as_ref(), Some(&parent.id));
    }

    #[test]
    fn filter_matches_owner_root_and_photos() {
        let owner = UserId::new();
        let mut root = MilestoneNode::new(owner.clone(), "Root", None);
        let child = MilestoneNode::new(owner.clone(), "Child", Some(&root));

        let roots = MilestoneFilter {
            roots_only: true,
            ..MilestoneFilter::owned_by(&owner)
        };
        assert!(roots.matches(&root));
        assert!(!roots.matches(&child));

        root.tagged_photo_ids.push(PhotoId::new());
        let untagged = MilestoneFilter {
            without_photos: true,
            ..MilestoneFilter::owned_by(&owner)
        };
        assert!(!untagged.matches(&root));
        assert!(untagged.matches(&child));

        assert!(!MilestoneFilter::owned_by(&UserId::new()).matches(&root));
    }

    #[test]
    fn hobby_tag_normalization() {
        assert_eq!(normalize_hobby_tag(Some("  Guitar ")), Some("guitar".to_string()));
        assert_eq!(normalize_hobby_tag(Some("   ")), None);
        assert_eq!(normalize_hobby_tag(None), None);
    }

    #[test]
    fn update_params_field_edits() {
        assert!(!MilestoneUpdateParams::default().has_field_edits());
        let completion_only = MilestoneUpdateParams {
            completed: Some(true),
            ..Default::default()
        };
        assert!(!completion_only.has_field_edits());
        let rename = MilestoneUpdateParams {
            task: Some("x".to_string()),
            ..Default::default()
        };
        assert!(rename.has_field_edits());
    }
}
