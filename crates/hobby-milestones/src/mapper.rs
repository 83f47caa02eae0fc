//! Presentation mapping from nodes to transfer objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MilestoneError;
use crate::store::MilestoneStore;
use crate::types::{ManualState, MilestoneNode};

/// Transfer shape of a milestone, optionally with its nested subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDto {
    /// Milestone ID.
    pub id: String,
    /// Display text.
    pub task: String,
    /// Optional deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Effective completion flag.
    pub completed: bool,
    /// Fractional completion in `[0.0, 1.0]`.
    pub completion_rate: f64,
    /// Completion rate as a percentage, one decimal place.
    pub completion_percent: f64,
    /// Explicit override, if any.
    pub manual_state: ManualState,
    /// Parent ID; absent for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// 0 for roots.
    pub depth: u32,
    /// Nested children (empty for flat mappings).
    #[serde(default)]
    pub sub_milestones: Vec<MilestoneDto>,
    /// Tagged photo IDs.
    #[serde(default)]
    pub tagged_photo_ids: Vec<String>,
    /// Hobby label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hobby_tag: Option<String>,
}

/// Map a node without its children.
pub fn to_dto(node: &MilestoneNode) -> MilestoneDto {
    MilestoneDto {
        id: node.id.to_string(),
        task: node.task.clone(),
        due_date: node.due_date,
        completed: node.completed,
        completion_rate: node.completion_rate,
        completion_percent: completion_percent(node.completion_rate),
        manual_state: node.manual_state,
        parent_id: node.parent_id.as_ref().map(ToString::to_string),
        depth: node.depth,
        sub_milestones: Vec::new(),
        tagged_photo_ids: node.tagged_photo_ids.iter().map(ToString::to_string).collect(),
        hobby_tag: node.hobby_tag.clone(),
    }
}

/// Map a node together with every descendant, resolving through `store`.
///
/// Recursion depth follows tree depth, which the structure guard bounds.
pub fn to_dto_tree<S: MilestoneStore + ?Sized>(
    store: &S,
    node: &MilestoneNode,
) -> Result<MilestoneDto, MilestoneError> {
    let mut dto = to_dto(node);
    for child in store.load_children(&node.id)? {
        dto.sub_milestones.push(to_dto_tree(store, &child)?);
    }
    Ok(dto)
}

/// `rate * 100`, rounded to one decimal.
pub fn completion_percent(rate: f64) -> f64 {
    (rate * 1000.0).round() / 10.0
}
