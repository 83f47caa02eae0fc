//! # hobby-core
//!
//! Shared vocabulary for the hobbylist crates:
//!
//! - **Branded IDs**: `MilestoneId`, `UserId`, `PhotoId` as newtypes for type safety
//! - **Constants**: package name/version and the default milestone depth bound
//! - **Logging**: `tracing` subscriber setup and a capture layer for tests

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod logging;

pub use constants::DEFAULT_MAX_DEPTH;
pub use ids::{MilestoneId, PhotoId, UserId};
