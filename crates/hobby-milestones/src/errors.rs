//! Milestone error types.
//!
//! Validation errors (`DepthExceeded`, `OwnershipViolation`, `Validation`)
//! are raised before any write, so the tree is untouched when they surface.
//! Persistence faults can happen mid-walk and are never rolled back by the
//! engine itself.

use thiserror::Error;

/// Coarse error classification for callers mapping errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced node does not exist.
    NotFound,
    /// Parent already sits at the maximum depth.
    DepthExceeded,
    /// Node belongs to a different user.
    OwnershipViolation,
    /// The persistence collaborator failed.
    PersistenceFault,
    /// Malformed request.
    Validation,
}

/// Errors from milestone operations.
#[derive(Debug, Error)]
pub enum MilestoneError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Non-SQL storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type (e.g., "Milestone", "Parent milestone").
        entity: &'static str,
        /// The ID that was looked up.
        id: String,
    },

    /// Creating a child would exceed the depth bound.
    #[error("Cannot create sub-milestone under {parent_id}: parent depth {parent_depth} >= {max_depth}")]
    DepthExceeded {
        /// The would-be parent.
        parent_id: String,
        /// Its depth.
        parent_depth: u32,
        /// Configured bound.
        max_depth: u32,
    },

    /// Node belongs to another user.
    #[error("Milestone {id} does not belong to user {caller}")]
    OwnershipViolation {
        /// The node that was accessed.
        id: String,
        /// The requesting user.
        caller: String,
    },

    /// Validation failure.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl MilestoneError {
    /// Create a not-found error for a milestone.
    pub fn milestone_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Milestone",
            id: id.into(),
        }
    }

    /// Create a not-found error for a parent milestone.
    pub fn parent_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Parent milestone",
            id: id.into(),
        }
    }

    /// Create an ownership error.
    pub fn ownership(id: impl Into<String>, caller: impl Into<String>) -> Self {
        Self::OwnershipViolation {
            id: id.into(),
            caller: caller.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(_) | Self::Storage(_) => ErrorKind::PersistenceFault,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            Self::OwnershipViolation { .. } => ErrorKind::OwnershipViolation,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Whether the persistence collaborator failed.
    pub fn is_persistence_fault(&self) -> bool {
        self.kind() == ErrorKind::PersistenceFault
    }
}
