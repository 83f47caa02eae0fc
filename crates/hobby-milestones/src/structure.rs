//! Structural mutations: depth-bounded creation and cascading deletion.
//!
//! Every check (task text, parent existence, ownership, depth) runs before
//! the first write, so a rejected request leaves the tree untouched. After
//! any shape change the former or new parent is reconciled through the
//! [`CompletionEngine`].

use hobby_core::{MilestoneId, UserId};
use tracing::info;

use crate::engine::CompletionEngine;
use crate::errors::MilestoneError;
use crate::store::MilestoneStore;
use crate::types::{MilestoneCreateParams, MilestoneNode, normalize_hobby_tag};

/// Enforces the depth bound and ownership on tree-shape changes.
pub struct StructureGuard<'s, S: MilestoneStore + ?Sized> {
    store: &'s S,
    max_depth: u32,
}

impl<'s, S: MilestoneStore + ?Sized> StructureGuard<'s, S> {
    /// Create a guard over `store` with the configured depth bound.
    pub fn new(store: &'s S, max_depth: u32) -> Self {
        Self { store, max_depth }
    }

    /// Create a root milestone (depth 0).
    pub fn create_root(
        &self,
        owner: &UserId,
        params: MilestoneCreateParams,
    ) -> Result<MilestoneNode, MilestoneError> {
        validate_task(&params.task)?;
        let node = build_node(owner, params, None);
        self.store.insert_node(&node)?;
        info!(milestone_id = %node.id, owner_id = %owner, "root milestone created");
        Ok(node)
    }

    /// Create a child under `parent_id`.
    ///
    /// Fails with `DepthExceeded` when the parent already sits at the depth
    /// bound and with `OwnershipViolation` when it belongs to someone else.
    pub fn create_child(
        &self,
        owner: &UserId,
        parent_id: &MilestoneId,
        params: MilestoneCreateParams,
    ) -> Result<MilestoneNode, MilestoneError> {
        validate_task(&params.task)?;
        let parent = self
            .store
            .load_node(parent_id)?
            .ok_or_else(|| MilestoneError::parent_not_found(parent_id.as_str()))?;
        if parent.owner_id != *owner {
            return Err(MilestoneError::ownership(parent_id.as_str(), owner.as_str()));
        }
        if parent.depth >= self.max_depth {
            return Err(MilestoneError::DepthExceeded {
                parent_id: parent_id.to_string(),
                parent_depth: parent.depth,
                max_depth: self.max_depth,
            });
        }

        let node = build_node(owner, params, Some(&parent));
        self.store.insert_node(&node)?;
        info!(
            milestone_id = %node.id,
            parent_id = %parent_id,
            depth = node.depth,
            "sub-milestone created"
        );

        // The new child's zero rate can pull every ancestor down.
        let _ = self.engine().reconcile(Some(parent_id))?;
        Ok(node)
    }

    /// Delete `id` and its whole subtree, then reconcile the former parent.
    /// Returns the removed IDs, descendants before ancestors.
    pub fn delete_subtree(
        &self,
        caller: &UserId,
        id: &MilestoneId,
    ) -> Result<Vec<MilestoneId>, MilestoneError> {
        let (target, _) = self
            .store
            .load_node_with_children(id)?
            .ok_or_else(|| MilestoneError::milestone_not_found(id.as_str()))?;
        if target.owner_id != *caller {
            return Err(MilestoneError::ownership(id.as_str(), caller.as_str()));
        }

        let order = self.post_order(&target)?;
        for node_id in &order {
            let _ = self.store.delete_node(node_id)?;
        }
        info!(milestone_id = %id, removed = order.len(), "milestone subtree deleted");

        let _ = self.engine().reconcile(target.parent_id.as_ref())?;
        Ok(order)
    }

    /// Subtree IDs ordered so every node follows all of its descendants.
    fn post_order(&self, root: &MilestoneNode) -> Result<Vec<MilestoneId>, MilestoneError> {
        let mut pre = Vec::new();
        let mut stack = vec![root.id.clone()];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.store.load_node(&id)? {
                stack.extend(node.children.iter().cloned());
                pre.push(id);
            }
        }
        // Reversed pre-order puts every child before its parent.
        pre.reverse();
        Ok(pre)
    }

    fn engine(&self) -> CompletionEngine<'s, S> {
        CompletionEngine::new(self.store, self.max_depth)
    }
}

fn validate_task(task: &str) -> Result<(), MilestoneError> {
    if task.trim().is_empty() {
        return Err(MilestoneError::Validation("task must not be empty".to_string()));
    }
    Ok(())
}

fn build_node(
    owner: &UserId,
    params: MilestoneCreateParams,
    parent: Option<&MilestoneNode>,
) -> MilestoneNode {
    let mut node = MilestoneNode::new(owner.clone(), params.task.trim(), parent);
    node.due_date = params.due_date;
    node.hobby_tag = normalize_hobby_tag(params.hobby_tag.as_deref());
    node.tagged_photo_ids = params.tagged_photo_ids;
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::ManualState;
    use assert_matches::assert_matches;

    fn params(task: &str) -> MilestoneCreateParams {
        MilestoneCreateParams {
            task: task.to_string(),
            ..Default::default()
        }
    }

    fn get(store: &MemoryStore, id: &MilestoneId) -> MilestoneNode {
        store.load_node(id).unwrap().unwrap()
    }

    #[test]
    fn create_root_defaults() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let owner = UserId::new();
        let root = guard
            .create_root(
                &owner,
                MilestoneCreateParams {
                    task: "  Learn guitar  ".to_string(),
                    hobby_tag: Some(" Guitar".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(root.depth, 0);
        assert_eq!(root.task, "Learn guitar");
        assert_eq!(root.hobby_tag.as_deref(), Some("guitar"));
        assert!(!root.completed);
        assert_eq!(root.manual_state, ManualState::None);
        assert!(store.contains(&root.id));
    }

    #[test]
    fn blank_task_rejected_before_write() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        assert_matches!(
            guard.create_root(&UserId::new(), params("   ")),
            Err(MilestoneError::Validation(_))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn depth_bound_allows_last_level_and_rejects_beyond() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let owner = UserId::new();
        let mut current = guard.create_root(&owner, params("d0")).unwrap();
        for level in 1..=5 {
            current = guard
                .create_child(&owner, &current.id, params(&format!("d{level}")))
                .unwrap();
            assert_eq!(current.depth, level);
        }
        let before = store.len();
        assert_matches!(
            guard.create_child(&owner, &current.id, params("too deep")),
            Err(MilestoneError::DepthExceeded { parent_depth: 5, max_depth: 5, .. })
        );
        assert_eq!(store.len(), before);
    }

    #[test]
    fn configured_depth_bound_is_respected() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 1);
        let owner = UserId::new();
        let root = guard.create_root(&owner, params("root")).unwrap();
        let child = guard.create_child(&owner, &root.id, params("child")).unwrap();
        assert_matches!(
            guard.create_child(&owner, &child.id, params("grandchild")),
            Err(MilestoneError::DepthExceeded { .. })
        );
    }

    #[test]
    fn create_child_under_foreign_parent_rejected() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let root = guard.create_root(&UserId::new(), params("mine")).unwrap();
        assert_matches!(
            guard.create_child(&UserId::new(), &root.id, params("intruder")),
            Err(MilestoneError::OwnershipViolation { .. })
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn create_child_under_missing_parent_rejected() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        assert_matches!(
            guard.create_child(&UserId::new(), &MilestoneId::from("ms-none"), params("x")),
            Err(MilestoneError::NotFound { entity: "Parent milestone", .. })
        );
    }

    #[test]
    fn new_child_pulls_completed_parent_down() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let owner = UserId::new();
        let root = guard.create_root(&owner, params("root")).unwrap();
        let a = guard.create_child(&owner, &root.id, params("a")).unwrap();
        let _ = CompletionEngine::new(&store, 5).mark_complete(&a.id).unwrap();
        assert!(get(&store, &root.id).completed);

        let _ = guard.create_child(&owner, &root.id, params("b")).unwrap();
        let root_node = get(&store, &root.id);
        assert_eq!(root_node.completion_rate, 0.5);
        assert!(!root_node.completed);
    }

    #[test]
    fn new_grandchild_invalidates_complete_override_up_the_chain() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let owner = UserId::new();
        let root = guard.create_root(&owner, params("root")).unwrap();
        let a = guard.create_child(&owner, &root.id, params("a")).unwrap();
        let _ = CompletionEngine::new(&store, 5).mark_complete(&root.id).unwrap();

        let _ = guard.create_child(&owner, &a.id, params("a1")).unwrap();
        let a_node = get(&store, &a.id);
        assert_eq!(a_node.completion_rate, 0.0);
        assert!(!a_node.completed);
        let root_node = get(&store, &root.id);
        assert_eq!(root_node.manual_state, ManualState::None);
        assert_eq!(root_node.completion_rate, 0.0);
    }

    #[test]
    fn delete_subtree_removes_descendants_in_post_order() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let owner = UserId::new();
        let root = guard.create_root(&owner, params("root")).unwrap();
        let a = guard.create_child(&owner, &root.id, params("a")).unwrap();
        let a1 = guard.create_child(&owner, &a.id, params("a1")).unwrap();
        let a1x = guard.create_child(&owner, &a1.id, params("a1x")).unwrap();

        let removed = guard.delete_subtree(&owner, &a.id).unwrap();
        assert_eq!(removed, vec![a1x.id, a1.id, a.id]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_subtree_reconciles_former_parent() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let owner = UserId::new();
        let root = guard.create_root(&owner, params("root")).unwrap();
        let done = guard.create_child(&owner, &root.id, params("done")).unwrap();
        let pending = guard.create_child(&owner, &root.id, params("pending")).unwrap();
        let _ = CompletionEngine::new(&store, 5).mark_complete(&done.id).unwrap();
        assert_eq!(get(&store, &root.id).completion_rate, 0.5);

        let _ = guard.delete_subtree(&owner, &pending.id).unwrap();
        let root_node = get(&store, &root.id);
        assert_eq!(root_node.completion_rate, 1.0);
        assert!(root_node.completed);
    }

    #[test]
    fn deleting_last_child_falls_back_to_own_flag() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let owner = UserId::new();
        let root = guard.create_root(&owner, params("root")).unwrap();
        let child = guard.create_child(&owner, &root.id, params("only")).unwrap();
        let _ = CompletionEngine::new(&store, 5).mark_complete(&child.id).unwrap();
        assert!(get(&store, &root.id).completed);

        let _ = guard.delete_subtree(&owner, &child.id).unwrap();
        let root_node = get(&store, &root.id);
        assert!(root_node.completed);
        assert_eq!(root_node.completion_rate, 1.0);
    }

    #[test]
    fn delete_missing_and_foreign_rejected() {
        let store = MemoryStore::new();
        let guard = StructureGuard::new(&store, 5);
        let owner = UserId::new();
        assert_matches!(
            guard.delete_subtree(&owner, &MilestoneId::from("ms-none")),
            Err(MilestoneError::NotFound { entity: "Milestone", .. })
        );

        let root = guard.create_root(&owner, params("root")).unwrap();
        assert_matches!(
            guard.delete_subtree(&UserId::new(), &root.id),
            Err(MilestoneError::OwnershipViolation { .. })
        );
        assert!(store.contains(&root.id));
    }
}
