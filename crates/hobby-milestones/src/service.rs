//! Caller-facing milestone operations.
//!
//! Wraps the store, the [`StructureGuard`] and the [`CompletionEngine`] with
//! ownership checks and transactions. Key rules:
//!
//! - **One operation at a time**: every mutation holds the service's
//!   operation lock and runs inside `begin`/`commit`, rolling back on error.
//!   Queries take the same lock, so they never see a half-reconciled chain.
//! - **Silent toggles**: marking a missing milestone complete or incomplete
//!   succeeds with `None`.
//! - **Completion through the engine**: a `completed` flag in an update is
//!   applied as mark-complete / mark-incomplete, never written directly.

use std::collections::BTreeSet;

use hobby_core::{MilestoneId, UserId};
use hobby_settings::HobbySettings;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::engine::CompletionEngine;
use crate::errors::MilestoneError;
use crate::mapper::{MilestoneDto, to_dto, to_dto_tree};
use crate::repository::SqliteStore;
use crate::store::MilestoneStore;
use crate::structure::StructureGuard;
use crate::types::{
    MilestoneCreateParams, MilestoneFilter, MilestoneNode, MilestoneUpdateParams,
    normalize_hobby_tag,
};

/// Milestone service with ownership checks and transactional mutations.
pub struct MilestoneService<S: MilestoneStore> {
    store: S,
    max_depth: u32,
    op_lock: Mutex<()>,
}

impl<S: MilestoneStore> MilestoneService<S> {
    /// Create a service using the depth bound from `settings`.
    pub fn new(store: S, settings: &HobbySettings) -> Self {
        Self::with_max_depth(store, settings.milestones.max_depth)
    }

    /// Create a service with an explicit depth bound.
    pub fn with_max_depth(store: S, max_depth: u32) -> Self {
        Self {
            store,
            max_depth,
            op_lock: Mutex::new(()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configured depth bound.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Create a root, or a child when `params.parent_id` is set.
    pub fn create(
        &self,
        caller: &UserId,
        params: MilestoneCreateParams,
    ) -> Result<MilestoneNode, MilestoneError> {
        self.run_atomic("create", |store| {
            let guard = StructureGuard::new(store, self.max_depth);
            match params.parent_id.clone() {
                Some(parent_id) => guard.create_child(caller, &parent_id, params),
                None => guard.create_root(caller, params),
            }
        })
    }

    /// Mark a milestone (and its subtree) complete.
    pub fn mark_complete(
        &self,
        caller: &UserId,
        id: &MilestoneId,
    ) -> Result<Option<MilestoneNode>, MilestoneError> {
        self.run_atomic("mark_complete", |store| {
            if !owned_or_missing(store, caller, id)? {
                return Ok(None);
            }
            CompletionEngine::new(store, self.max_depth).mark_complete(id)
        })
    }

    /// Mark a milestone incomplete.
    pub fn mark_incomplete(
        &self,
        caller: &UserId,
        id: &MilestoneId,
    ) -> Result<Option<MilestoneNode>, MilestoneError> {
        self.run_atomic("mark_incomplete", |store| {
            if !owned_or_missing(store, caller, id)? {
                return Ok(None);
            }
            CompletionEngine::new(store, self.max_depth).mark_incomplete(id)
        })
    }

    /// Apply a partial edit, then settle completion state.
    pub fn update(
        &self,
        caller: &UserId,
        id: &MilestoneId,
        patch: MilestoneUpdateParams,
    ) -> Result<MilestoneNode, MilestoneError> {
        if let Some(task) = &patch.task {
            if task.trim().is_empty() {
                return Err(MilestoneError::Validation("task must not be empty".to_string()));
            }
        }

        self.run_atomic("update", |store| {
            let mut node = load_owned(store, caller, id)?;
            let engine = CompletionEngine::new(store, self.max_depth);

            if patch.has_field_edits() {
                if let Some(task) = &patch.task {
                    task.trim().clone_into(&mut node.task);
                }
                if let Some(due_date) = patch.due_date {
                    node.due_date = due_date;
                }
                if let Some(tag) = &patch.hobby_tag {
                    node.hobby_tag = normalize_hobby_tag(Some(tag));
                }
                if let Some(photos) = &patch.tagged_photo_ids {
                    node.tagged_photo_ids.clone_from(photos);
                }
                store.save_node(&node)?;
                debug!(milestone_id = %id, "milestone fields updated");
            }

            match patch.completed {
                Some(true) => {
                    let _ = engine.mark_complete(id)?;
                }
                Some(false) => {
                    let _ = engine.mark_incomplete(id)?;
                }
                None => {
                    let _ = engine.reconcile(node.parent_id.as_ref())?;
                }
            }

            store
                .load_node(id)?
                .ok_or_else(|| MilestoneError::milestone_not_found(id.as_str()))
        })
    }

    /// Delete a milestone and its subtree. Returns every removed ID.
    pub fn delete(
        &self,
        caller: &UserId,
        id: &MilestoneId,
    ) -> Result<Vec<MilestoneId>, MilestoneError> {
        self.run_atomic("delete", |store| {
            StructureGuard::new(store, self.max_depth).delete_subtree(caller, id)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// A milestone with its nested subtree.
    pub fn get_tree(
        &self,
        caller: &UserId,
        id: &MilestoneId,
    ) -> Result<MilestoneDto, MilestoneError> {
        let _lock = self.op_lock.lock();
        let node = load_owned(&self.store, caller, id)?;
        to_dto_tree(&self.store, &node)
    }

    /// Every root of `owner`, each with its nested subtree.
    pub fn list_roots(&self, owner: &UserId) -> Result<Vec<MilestoneDto>, MilestoneError> {
        let filter = MilestoneFilter {
            roots_only: true,
            ..MilestoneFilter::owned_by(owner)
        };
        let _lock = self.op_lock.lock();
        self.store
            .list_nodes(&filter)?
            .iter()
            .map(|root| to_dto_tree(&self.store, root))
            .collect()
    }

    /// Every milestone of `owner`, flat.
    pub fn list_all(&self, owner: &UserId) -> Result<Vec<MilestoneDto>, MilestoneError> {
        let _lock = self.op_lock.lock();
        let nodes = self.store.list_nodes(&MilestoneFilter::owned_by(owner))?;
        Ok(nodes.iter().map(to_dto).collect())
    }

    /// Milestones of `owner` with no tagged photos, flat.
    pub fn list_without_photos(&self, owner: &UserId) -> Result<Vec<MilestoneDto>, MilestoneError> {
        let filter = MilestoneFilter {
            without_photos: true,
            ..MilestoneFilter::owned_by(owner)
        };
        let _lock = self.op_lock.lock();
        Ok(self.store.list_nodes(&filter)?.iter().map(to_dto).collect())
    }

    /// Distinct hobby tags used by `owner`, sorted.
    pub fn hobby_tags(&self, owner: &UserId) -> Result<Vec<String>, MilestoneError> {
        let _lock = self.op_lock.lock();
        let tags: BTreeSet<String> = self
            .store
            .list_nodes(&MilestoneFilter::owned_by(owner))?
            .into_iter()
            .filter_map(|n| n.hobby_tag)
            .collect();
        Ok(tags.into_iter().collect())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────

    fn run_atomic<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&S) -> Result<T, MilestoneError>,
    ) -> Result<T, MilestoneError> {
        let _lock = self.op_lock.lock();
        self.store.begin()?;
        let result = f(&self.store).and_then(|value| self.store.commit().map(|()| value));
        if let Err(e) = &result {
            if let Err(rollback_err) = self.store.rollback() {
                warn!(op, error = %rollback_err, "rollback failed");
            }
            debug!(op, error = %e, "milestone operation rolled back");
        }
        result
    }
}

impl MilestoneService<SqliteStore> {
    /// Open the database named by `settings.storage` and build a service
    /// over it.
    pub fn open(settings: &HobbySettings) -> Result<Self, MilestoneError> {
        let path = settings.storage.resolved_database_path();
        let store = SqliteStore::open(&path)?;
        info!(path = %path.display(), max_depth = settings.milestones.max_depth, "milestone service ready");
        Ok(Self::new(store, settings))
    }
}

/// Load `id` and check it belongs to `caller`.
fn load_owned<S: MilestoneStore + ?Sized>(
    store: &S,
    caller: &UserId,
    id: &MilestoneId,
) -> Result<MilestoneNode, MilestoneError> {
    let node = store
        .load_node(id)?
        .ok_or_else(|| MilestoneError::milestone_not_found(id.as_str()))?;
    if node.owner_id != *caller {
        return Err(MilestoneError::ownership(id.as_str(), caller.as_str()));
    }
    Ok(node)
}

/// `Ok(false)` when `id` is gone, an ownership error when it is someone
/// else's, `Ok(true)` otherwise.
fn owned_or_missing<S: MilestoneStore + ?Sized>(
    store: &S,
    caller: &UserId,
    id: &MilestoneId,
) -> Result<bool, MilestoneError> {
    match load_owned(store, caller, id) {
        Ok(_) => Ok(true),
        Err(MilestoneError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}
