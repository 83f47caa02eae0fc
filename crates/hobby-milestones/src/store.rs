//! Persistence contract for milestone trees, plus an in-memory backend.
//!
//! The engine never holds nodes across calls: it loads by ID, mutates a
//! copy, and saves it back. Children lists are owned by the store and are
//! rebuilt from parent links, so `save_node` never re-parents anything.

use std::collections::HashMap;

use hobby_core::MilestoneId;
use parking_lot::Mutex;

use crate::errors::MilestoneError;
use crate::types::{MilestoneFilter, MilestoneNode};

/// Storage operations the completion engine and structure guard depend on.
pub trait MilestoneStore: Send + Sync {
    /// Fetch a single node (with its `children` IDs populated).
    fn load_node(&self, id: &MilestoneId) -> Result<Option<MilestoneNode>, MilestoneError>;

    /// Fetch the direct children of `id`, oldest first.
    fn load_children(&self, id: &MilestoneId) -> Result<Vec<MilestoneNode>, MilestoneError>;

    /// Fetch a node together with its direct children.
    fn load_node_with_children(
        &self,
        id: &MilestoneId,
    ) -> Result<Option<(MilestoneNode, Vec<MilestoneNode>)>, MilestoneError> {
        let Some(node) = self.load_node(id)? else {
            return Ok(None);
        };
        let children = self.load_children(id)?;
        Ok(Some((node, children)))
    }

    /// Persist a brand-new node and link it under its parent.
    fn insert_node(&self, node: &MilestoneNode) -> Result<(), MilestoneError>;

    /// Persist the mutable fields of an existing node. Saving a node that
    /// has since been deleted is a no-op.
    fn save_node(&self, node: &MilestoneNode) -> Result<(), MilestoneError>;

    /// Remove a node and everything below it. Returns whether it existed.
    fn delete_node(&self, id: &MilestoneId) -> Result<bool, MilestoneError>;

    /// List nodes passing `filter`, oldest first.
    fn list_nodes(&self, filter: &MilestoneFilter) -> Result<Vec<MilestoneNode>, MilestoneError>;

    /// Start a unit of work.
    fn begin(&self) -> Result<(), MilestoneError> {
        Ok(())
    }

    /// Make the current unit of work durable.
    fn commit(&self) -> Result<(), MilestoneError> {
        Ok(())
    }

    /// Discard the current unit of work.
    fn rollback(&self) -> Result<(), MilestoneError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory arena
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Arena {
    nodes: HashMap<MilestoneId, MilestoneNode>,
    snapshot: Option<HashMap<MilestoneId, MilestoneNode>>,
    save_budget: Option<usize>,
}

impl Arena {
    fn remove_subtree(&mut self, id: &MilestoneId) -> bool {
        let Some(root) = self.nodes.remove(id) else {
            return false;
        };
        if let Some(parent) = root.parent_id.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| c != id);
        }
        let mut stack = root.children;
        while let Some(child_id) = stack.pop() {
            if let Some(child) = self.nodes.remove(&child_id) {
                stack.extend(child.children);
            }
        }
        true
    }
}

/// Arena of milestone nodes keyed by ID, guarded by a mutex.
///
/// Supports snapshot rollback for `begin`/`rollback` and save-fault
/// injection for exercising mid-walk failures.
#[derive(Default)]
pub struct MemoryStore {
    arena: Mutex<Arena>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the next `n` saves succeed, then fail every later save with a
    /// storage error.
    pub fn fail_saves_after(&self, n: usize) {
        self.arena.lock().save_budget = Some(n);
    }

    /// Stop injecting save failures.
    pub fn clear_save_failures(&self) {
        self.arena.lock().save_budget = None;
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.arena.lock().nodes.len()
    }

    /// Whether the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.arena.lock().nodes.is_empty()
    }

    /// Whether a node with `id` exists.
    pub fn contains(&self, id: &MilestoneId) -> bool {
        self.arena.lock().nodes.contains_key(id)
    }
}

impl MilestoneStore for MemoryStore {
    fn load_node(&self, id: &MilestoneId) -> Result<Option<MilestoneNode>, MilestoneError> {
        Ok(self.arena.lock().nodes.get(id).cloned())
    }

    fn load_children(&self, id: &MilestoneId) -> Result<Vec<MilestoneNode>, MilestoneError> {
        let arena = self.arena.lock();
        let Some(node) = arena.nodes.get(id) else {
            return Ok(Vec::new());
        };
        Ok(node
            .children
            .iter()
            .filter_map(|c| arena.nodes.get(c).cloned())
            .collect())
    }

    fn insert_node(&self, node: &MilestoneNode) -> Result<(), MilestoneError> {
        let mut arena = self.arena.lock();
        if arena.nodes.contains_key(&node.id) {
            return Err(MilestoneError::Storage(format!("duplicate milestone id {}", node.id)));
        }
        if let Some(parent_id) = &node.parent_id {
            let parent = arena
                .nodes
                .get_mut(parent_id)
                .ok_or_else(|| MilestoneError::parent_not_found(parent_id.as_str()))?;
            parent.children.push(node.id.clone());
        }
        let mut stored = node.clone();
        stored.children.clear();
        let _ = arena.nodes.insert(stored.id.clone(), stored);
        Ok(())
    }

    fn save_node(&self, node: &MilestoneNode) -> Result<(), MilestoneError> {
        let mut arena = self.arena.lock();
        if let Some(budget) = arena.save_budget.as_mut() {
            if *budget == 0 {
                return Err(MilestoneError::Storage(format!(
                    "injected save failure for {}",
                    node.id
                )));
            }
            *budget -= 1;
        }
        if let Some(stored) = arena.nodes.get_mut(&node.id) {
            let children = std::mem::take(&mut stored.children);
            *stored = node.clone();
            stored.children = children;
        }
        Ok(())
    }

    fn delete_node(&self, id: &MilestoneId) -> Result<bool, MilestoneError> {
        Ok(self.arena.lock().remove_subtree(id))
    }

    fn list_nodes(&self, filter: &MilestoneFilter) -> Result<Vec<MilestoneNode>, MilestoneError> {
        let arena = self.arena.lock();
        let mut nodes: Vec<MilestoneNode> = arena
            .nodes
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(nodes)
    }

    fn begin(&self) -> Result<(), MilestoneError> {
        let mut arena = self.arena.lock();
        arena.snapshot = Some(arena.nodes.clone());
        Ok(())
    }

    fn commit(&self) -> Result<(), MilestoneError> {
        self.arena.lock().snapshot = None;
        Ok(())
    }

    fn rollback(&self) -> Result<(), MilestoneError> {
        let mut arena = self.arena.lock();
        if let Some(snapshot) = arena.snapshot.take() {
            arena.nodes = snapshot;
        }
        Ok(())
    }
}
