//! SQL data access layer for milestones.
//!
//! [`MilestoneRepository`] is a set of stateless functions over a
//! `&Connection` that translate between [`MilestoneNode`] and rows.
//! [`SqliteStore`] wraps a connection behind a mutex and exposes the
//! repository through the [`MilestoneStore`] contract.

use std::path::Path;

use hobby_core::{MilestoneId, PhotoId, UserId};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::errors::MilestoneError;
use crate::migrations::run_migrations;
use crate::store::MilestoneStore;
use crate::types::{ManualState, MilestoneFilter, MilestoneNode};

const NODE_COLUMNS: &str = "id, owner_id, task, due_date, created_at, completed, \
     completion_rate, manual_state, parent_id, depth, hobby_tag";

/// Milestone repository for SQL CRUD operations.
pub struct MilestoneRepository;

impl MilestoneRepository {
    // ─────────────────────────────────────────────────────────────────────
    // Node CRUD
    // ─────────────────────────────────────────────────────────────────────

    /// Insert a new node and its photo tags.
    pub fn insert_node(conn: &Connection, node: &MilestoneNode) -> Result<(), MilestoneError> {
        if let Some(parent_id) = &node.parent_id {
            if !Self::exists(conn, parent_id)? {
                return Err(MilestoneError::parent_not_found(parent_id.as_str()));
            }
        }

        let _ = conn.execute(
            "INSERT INTO milestones (id, owner_id, task, due_date, created_at, completed,
             completion_rate, manual_state, parent_id, depth, hobby_tag)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                node.id.as_str(),
                node.owner_id.as_str(),
                node.task,
                node.due_date,
                node.created_at,
                node.completed,
                node.completion_rate,
                node.manual_state.as_sql(),
                node.parent_id.as_deref(),
                node.depth,
                node.hobby_tag,
            ],
        )?;
        Self::replace_photos(conn, &node.id, &node.tagged_photo_ids)?;
        Ok(())
    }

    /// Get a node by ID, with children and photo IDs populated.
    pub fn get_node(
        conn: &Connection,
        id: &MilestoneId,
    ) -> Result<Option<MilestoneNode>, MilestoneError> {
        let sql = format!("SELECT {NODE_COLUMNS} FROM milestones WHERE id = ?1");
        let node = conn
            .query_row(&sql, params![id.as_str()], node_from_row)
            .optional()?;
        node.map(|n| Self::hydrate(conn, n)).transpose()
    }

    /// Direct children of `parent_id`, oldest first.
    pub fn get_children(
        conn: &Connection,
        parent_id: &MilestoneId,
    ) -> Result<Vec<MilestoneNode>, MilestoneError> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM milestones WHERE parent_id = ?1 ORDER BY created_at, rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![parent_id.as_str()], node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|n| Self::hydrate(conn, n)).collect()
    }

    /// Write every mutable field of `node`. Returns false if the row is gone.
    pub fn update_node(conn: &Connection, node: &MilestoneNode) -> Result<bool, MilestoneError> {
        let changed = conn.execute(
            "UPDATE milestones SET task = ?1, due_date = ?2, completed = ?3,
             completion_rate = ?4, manual_state = ?5, parent_id = ?6, depth = ?7,
             hobby_tag = ?8
             WHERE id = ?9",
            params![
                node.task,
                node.due_date,
                node.completed,
                node.completion_rate,
                node.manual_state.as_sql(),
                node.parent_id.as_deref(),
                node.depth,
                node.hobby_tag,
                node.id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        Self::replace_photos(conn, &node.id, &node.tagged_photo_ids)?;
        Ok(true)
    }

    /// Delete a node by ID. Descendants and photo tags go with it via
    /// `ON DELETE CASCADE`. Returns true if a row was deleted.
    pub fn delete_node(conn: &Connection, id: &MilestoneId) -> Result<bool, MilestoneError> {
        let changed = conn.execute("DELETE FROM milestones WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }

    /// List nodes matching `filter`, oldest first.
    pub fn list_nodes(
        conn: &Connection,
        filter: &MilestoneFilter,
    ) -> Result<Vec<MilestoneNode>, MilestoneError> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(owner) = &filter.owner_id {
            conditions.push("owner_id = ?");
            values.push(Box::new(owner.as_str().to_string()));
        }
        if filter.roots_only {
            conditions.push("parent_id IS NULL");
        }
        if filter.without_photos {
            conditions.push("NOT EXISTS (SELECT 1 FROM milestone_photos p WHERE p.milestone_id = milestones.id)");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM milestones {where_clause} ORDER BY created_at, rowid"
        );

        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|n| Self::hydrate(conn, n)).collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────

    fn exists(conn: &Connection, id: &MilestoneId) -> Result<bool, MilestoneError> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM milestones WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn hydrate(conn: &Connection, mut node: MilestoneNode) -> Result<MilestoneNode, MilestoneError> {
        let mut stmt = conn.prepare_cached(
            "SELECT id FROM milestones WHERE parent_id = ?1 ORDER BY created_at, rowid",
        )?;
        node.children = stmt
            .query_map(params![node.id.as_str()], |row| {
                row.get::<_, String>(0).map(MilestoneId::from_string)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare_cached(
            "SELECT photo_id FROM milestone_photos WHERE milestone_id = ?1 ORDER BY rowid",
        )?;
        node.tagged_photo_ids = stmt
            .query_map(params![node.id.as_str()], |row| {
                row.get::<_, String>(0).map(PhotoId::from_string)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(node)
    }

    fn replace_photos(
        conn: &Connection,
        id: &MilestoneId,
        photos: &[PhotoId],
    ) -> Result<(), MilestoneError> {
        let _ = conn.execute(
            "DELETE FROM milestone_photos WHERE milestone_id = ?1",
            params![id.as_str()],
        )?;
        let mut stmt = conn.prepare_cached(
            "INSERT OR IGNORE INTO milestone_photos (milestone_id, photo_id) VALUES (?1, ?2)",
        )?;
        for photo in photos {
            let _ = stmt.execute(params![id.as_str(), photo.as_str()])?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row converters
// ─────────────────────────────────────────────────────────────────────────────

fn node_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MilestoneNode> {
    let manual_state: String = row.get("manual_state")?;
    Ok(MilestoneNode {
        id: MilestoneId::from_string(row.get("id")?),
        owner_id: UserId::from_string(row.get("owner_id")?),
        task: row.get("task")?,
        due_date: row.get("due_date")?,
        created_at: row.get("created_at")?,
        completed: row.get("completed")?,
        completion_rate: row.get("completion_rate")?,
        manual_state: ManualState::from_sql(&manual_state),
        parent_id: row
            .get::<_, Option<String>>("parent_id")?
            .map(MilestoneId::from_string),
        children: Vec::new(),
        depth: row.get("depth")?,
        hobby_tag: row.get("hobby_tag")?,
        tagged_photo_ids: Vec::new(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// SqliteStore
// ─────────────────────────────────────────────────────────────────────────────

/// [`MilestoneStore`] backed by a single `SQLite` connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and run migrations.
    pub fn open(path: &Path) -> Result<Self, MilestoneError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                MilestoneError::Storage(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
        debug!(?path, "opening milestone database");
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, MilestoneError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection, enabling foreign keys and running migrations.
    pub fn from_connection(conn: Connection) -> Result<Self, MilestoneError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MilestoneStore for SqliteStore {
    fn load_node(&self, id: &MilestoneId) -> Result<Option<MilestoneNode>, MilestoneError> {
        MilestoneRepository::get_node(&self.conn.lock(), id)
    }

    fn load_children(&self, id: &MilestoneId) -> Result<Vec<MilestoneNode>, MilestoneError> {
        MilestoneRepository::get_children(&self.conn.lock(), id)
    }

    fn insert_node(&self, node: &MilestoneNode) -> Result<(), MilestoneError> {
        MilestoneRepository::insert_node(&self.conn.lock(), node)
    }

    fn save_node(&self, node: &MilestoneNode) -> Result<(), MilestoneError> {
        let _ = MilestoneRepository::update_node(&self.conn.lock(), node)?;
        Ok(())
    }

    fn delete_node(&self, id: &MilestoneId) -> Result<bool, MilestoneError> {
        MilestoneRepository::delete_node(&self.conn.lock(), id)
    }

    fn list_nodes(&self, filter: &MilestoneFilter) -> Result<Vec<MilestoneNode>, MilestoneError> {
        MilestoneRepository::list_nodes(&self.conn.lock(), filter)
    }

    fn begin(&self) -> Result<(), MilestoneError> {
        self.conn.lock().execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&self) -> Result<(), MilestoneError> {
        self.conn.lock().execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<(), MilestoneError> {
        self.conn.lock().execute_batch("ROLLBACK")?;
        Ok(())
    }
}
