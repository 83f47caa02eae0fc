//! Completion propagation over milestone trees.
//!
//! The [`CompletionEngine`] applies manual transitions and restores the
//! tree invariants afterwards. It holds no nodes between calls: every step
//! resolves through the injected [`MilestoneStore`].
//!
//! ## Algorithm
//!
//! 1. `mark_complete` forces the target to complete (manual override) and
//!    cascades completion down the whole subtree with an explicit stack.
//!    Descendants are completed as a side effect, so their manual state is
//!    reset to `None`.
//! 2. `mark_incomplete` sets a sticky override on the target only and
//!    recomputes its rate from its direct children.
//! 3. Both then call [`CompletionEngine::reconcile`] on the target's parent,
//!    which walks to the root re-deriving every ancestor.
//!
//! A missing target is a silent no-op. Store failures abort the walk; nodes
//! saved before the failure stay saved, and rerunning `reconcile` from the
//! same point repairs the chain.

use hobby_core::MilestoneId;
use tracing::{debug, info, warn};

use crate::errors::MilestoneError;
use crate::store::MilestoneStore;
use crate::types::{ManualState, MilestoneNode};

/// Applies completion transitions and re-derives ancestor state.
pub struct CompletionEngine<'s, S: MilestoneStore + ?Sized> {
    store: &'s S,
    max_depth: u32,
}

impl<'s, S: MilestoneStore + ?Sized> CompletionEngine<'s, S> {
    /// Create an engine over `store`. `max_depth` bounds the upward walk.
    pub fn new(store: &'s S, max_depth: u32) -> Self {
        Self { store, max_depth }
    }

    /// Mark a node complete, complete its entire subtree, and reconcile
    /// its ancestors. Returns the updated node, or `None` if it is gone.
    pub fn mark_complete(
        &self,
        id: &MilestoneId,
    ) -> Result<Option<MilestoneNode>, MilestoneError> {
        let Some(mut node) = self.store.load_node(id)? else {
            debug!(milestone_id = %id, "mark complete on missing milestone, ignoring");
            return Ok(None);
        };

        node.manual_state = ManualState::Complete;
        node.completed = true;
        node.completion_rate = 1.0;
        self.store.save_node(&node)?;

        let cascaded = self.cascade_complete(&node)?;
        info!(milestone_id = %id, descendants = cascaded, "milestone marked complete");

        let _ = self.reconcile(node.parent_id.as_ref())?;
        Ok(Some(node))
    }

    /// Mark a node incomplete with a sticky override and reconcile its
    /// ancestors. Children are left untouched.
    pub fn mark_incomplete(
        &self,
        id: &MilestoneId,
    ) -> Result<Option<MilestoneNode>, MilestoneError> {
        let Some((mut node, children)) = self.store.load_node_with_children(id)? else {
            debug!(milestone_id = %id, "mark incomplete on missing milestone, ignoring");
            return Ok(None);
        };

        node.manual_state = ManualState::Incomplete;
        node.completed = false;
        node.completion_rate = mean_rate(&children).unwrap_or(0.0);
        self.store.save_node(&node)?;
        info!(
            milestone_id = %id,
            completion_rate = node.completion_rate,
            "milestone marked incomplete"
        );

        let _ = self.reconcile(node.parent_id.as_ref())?;
        Ok(Some(node))
    }

    /// Walk from `start` to the root, re-deriving and saving every node on
    /// the way. Returns how many nodes were reconciled.
    ///
    /// Idempotent: running it twice from the same point changes nothing the
    /// second time.
    pub fn reconcile(&self, start: Option<&MilestoneId>) -> Result<usize, MilestoneError> {
        let mut current = start.cloned();
        let mut limit: Option<u32> = None;
        let mut visited = 0_u32;

        while let Some(id) = current {
            let Some((mut node, children)) = self.store.load_node_with_children(&id)? else {
                break;
            };

            // A healthy chain has at most depth + 1 links above this point.
            let bound = *limit.get_or_insert(self.max_depth.max(node.depth) + 1);
            if visited >= bound {
                warn!(
                    milestone_id = %id,
                    bound,
                    "ancestor chain longer than depth bound, stopping reconciliation"
                );
                break;
            }

            reconcile_node(&mut node, &children);
            self.store.save_node(&node)?;
            debug!(
                milestone_id = %node.id,
                completion_rate = node.completion_rate,
                completed = node.completed,
                manual_state = %node.manual_state,
                "reconciled milestone"
            );

            visited += 1;
            current = node.parent_id;
        }

        Ok(visited as usize)
    }

    /// Force every descendant of `root` complete. Returns how many were
    /// touched.
    fn cascade_complete(&self, root: &MilestoneNode) -> Result<usize, MilestoneError> {
        let mut stack: Vec<MilestoneId> = root.children.clone();
        let mut touched = 0;

        while let Some(id) = stack.pop() {
            let Some(mut node) = self.store.load_node(&id)? else {
                continue;
            };
            node.manual_state = ManualState::None;
            node.completed = true;
            node.completion_rate = 1.0;
            self.store.save_node(&node)?;
            touched += 1;
            stack.extend(node.children.iter().cloned());
        }

        Ok(touched)
    }
}

/// Re-derive `node`'s completion fields from its direct `children`.
///
/// A leaf's own flag stands in for the average it has no children to
/// supply. `Incomplete` overrides are sticky; `Complete` overrides are
/// dropped once children fall below full completion.
pub fn reconcile_node(node: &mut MilestoneNode, children: &[MilestoneNode]) {
    let avg = mean_rate(children).unwrap_or(if node.completed { 1.0 } else { 0.0 });

    match node.manual_state {
        ManualState::Incomplete => {
            node.completed = false;
            node.completion_rate = avg;
        }
        ManualState::Complete if !children.is_empty() && avg < 1.0 => {
            info!(milestone_id = %node.id, completion_rate = avg, "complete override invalidated");
            node.manual_state = ManualState::None;
            node.completed = false;
            node.completion_rate = avg;
        }
        ManualState::Complete => {
            node.completed = true;
            node.completion_rate = 1.0;
        }
        ManualState::None => {
            node.completion_rate = avg;
            node.completed = avg >= 1.0;
        }
    }
}

/// Arithmetic mean of the children's rates; `None` when there are none.
fn mean_rate(children: &[MilestoneNode]) -> Option<f64> {
    if children.is_empty() {
        return None;
    }
    let sum: f64 = children.iter().map(|c| c.completion_rate).sum();
    #[allow(clippy::cast_precision_loss)]
    let len = children.len() as f64;
    Some(sum / len)
}
