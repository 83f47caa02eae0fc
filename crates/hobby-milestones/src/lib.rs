//! # hobby-milestones
//!
//! Milestone trees for the hobby tracker: nested tasks whose completion
//! state is either set by the user or derived from their children.
//!
//! - [`engine`]: downward cascade on mark-complete and upward reconciliation
//!   of every ancestor after any change
//! - [`structure`]: depth-bounded creation and cascading deletion
//! - [`store`]: the persistence contract, with in-memory and `SQLite` backends
//! - [`service`]: ownership-checked, transactional entry points for callers
//! - [`mapper`]: flattening nodes into transfer DTOs

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod mapper;
pub mod migrations;
pub mod repository;
pub mod service;
pub mod store;
pub mod structure;
pub mod types;

pub use engine::CompletionEngine;
pub use errors::{ErrorKind, MilestoneError};
pub use mapper::MilestoneDto;
pub use repository::{MilestoneRepository, SqliteStore};
pub use service::MilestoneService;
pub use store::{MemoryStore, MilestoneStore};
pub use structure::StructureGuard;
pub use types::*;
