//! SQL DDL for the milestone tables.
//!
//! Creates `milestones` (one row per node, parent link as a self-reference)
//! and `milestone_photos` (photo tags). Both cascade on delete, but the
//! structure guard still removes subtrees explicitly so the in-memory and
//! `SQLite` backends behave the same.

use rusqlite::Connection;

use crate::errors::MilestoneError;

/// Run all milestone migrations.
///
/// Idempotent: safe to call multiple times (uses `IF NOT EXISTS`).
pub fn run_migrations(conn: &Connection) -> Result<(), MilestoneError> {
    conn.execute_batch(MILESTONES_SCHEMA)?;
    Ok(())
}

const MILESTONES_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS milestones (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    task TEXT NOT NULL,
    due_date TEXT,
    created_at TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0
        CHECK(completed IN (0, 1)),
    completion_rate REAL NOT NULL DEFAULT 0.0
        CHECK(completion_rate >= 0.0 AND completion_rate <= 1.0),
    manual_state TEXT NOT NULL DEFAULT 'none'
        CHECK(manual_state IN ('none', 'complete', 'incomplete')),
    parent_id TEXT REFERENCES milestones(id) ON DELETE CASCADE,
    depth INTEGER NOT NULL DEFAULT 0
        CHECK(depth >= 0),
    hobby_tag TEXT
);

CREATE INDEX IF NOT EXISTS idx_milestones_parent
    ON milestones(parent_id, created_at);
CREATE INDEX IF NOT EXISTS idx_milestones_owner_parent
    ON milestones(owner_id, parent_id);

CREATE TABLE IF NOT EXISTS milestone_photos (
    milestone_id TEXT NOT NULL REFERENCES milestones(id) ON DELETE CASCADE,
    photo_id TEXT NOT NULL,
    PRIMARY KEY (milestone_id, photo_id)
);

CREATE INDEX IF NOT EXISTS idx_milestone_photos_photo
    ON milestone_photos(photo_id);
";
