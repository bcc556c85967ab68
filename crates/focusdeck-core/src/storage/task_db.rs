//! SQLite-backed task store.
//!
//! One `tasks` table plus a `kv` table for host state (the CLI keeps the
//! serialized cycle timer there between invocations). Implements the same
//! `TaskStore` contract as the in-memory backend; filtering and display
//! ordering run through the shared code paths so both backends agree.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result};
use crate::store::{apply_credit, apply_patch, task_from_new, StorePolicy, TaskStore};
use crate::task::{sort_for_display, NewTask, Priority, Task, TaskFilter, TaskPatch};

// === Helper Functions ===

/// Parse task priority from database string
fn parse_priority(priority_str: &str) -> Priority {
    match priority_str {
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

/// Format task priority for database storage
fn format_priority(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Build a Task from a database row
/// (id, title, priority, category, estimated_units, completed_units,
///  done, scheduled_today, due_date, created_at)
fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
    let priority_str: String = row.get(2)?;
    let due_date_str: Option<String> = row.get(8)?;
    let created_at_str: String = row.get(9)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        priority: parse_priority(&priority_str),
        category: row.get(3)?,
        estimated_units: row.get(4)?,
        completed_units: row.get(5)?,
        done: row.get(6)?,
        scheduled_today: row.get(7)?,
        due_date: due_date_str
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        created_at: parse_datetime_fallback(&created_at_str),
    })
}

const TASK_COLUMNS: &str = "id, title, priority, category, estimated_units, \
     completed_units, done, scheduled_today, due_date, created_at";

/// SQLite database owning the task table and a small kv store.
pub struct TaskDb {
    conn: Connection,
    policy: StorePolicy,
}

impl TaskDb {
    /// Open the database at `~/.config/focusdeck/focusdeck.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(policy: StorePolicy) -> Result<Self> {
        let path = data_dir()?.join("focusdeck.db");
        Self::open_at(&path, policy)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path, policy: StorePolicy) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        let db = Self { conn, policy };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    /// Open an in-memory database (tests and ephemeral hosts).
    pub fn open_memory(policy: StorePolicy) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        let db = Self { conn, policy };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                priority        TEXT NOT NULL DEFAULT 'medium',
                category        TEXT NOT NULL DEFAULT 'general',
                estimated_units INTEGER NOT NULL DEFAULT 1,
                completed_units INTEGER NOT NULL DEFAULT 0,
                done            INTEGER NOT NULL DEFAULT 0,
                scheduled_today INTEGER NOT NULL DEFAULT 0,
                due_date        TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Insertion order is the rowid; these cover the common filters
            CREATE INDEX IF NOT EXISTS idx_tasks_done ON tasks(done);
            CREATE INDEX IF NOT EXISTS idx_tasks_priority ON tasks(priority);",
        )?;
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Task> {
        self.get(id)?
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })
    }

    fn write_back(&self, task: &Task) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE tasks SET title = ?2, priority = ?3, category = ?4,
                 estimated_units = ?5, completed_units = ?6, done = ?7,
                 scheduled_today = ?8, due_date = ?9
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                format_priority(task.priority),
                task.category,
                task.estimated_units,
                task.completed_units,
                task.done,
                task.scheduled_today,
                task.due_date.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl TaskStore for TaskDb {
    fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    fn add(&mut self, new: NewTask) -> Result<Task> {
        let task = task_from_new(new, &self.policy)?;
        self.conn.execute(
            "INSERT INTO tasks (id, title, priority, category, estimated_units,
                 completed_units, done, scheduled_today, due_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.id,
                task.title,
                format_priority(task.priority),
                task.category,
                task.estimated_units,
                task.completed_units,
                task.done,
                task.scheduled_today,
                task.due_date.map(|d| d.to_string()),
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(task)
    }

    fn get(&self, id: &str) -> Result<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
        let task = stmt.query_row(params![id], row_to_task).optional()?;
        Ok(task)
    }

    fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let mut task = self.fetch(id)?;
        apply_patch(&mut task, patch, &self.policy)?;
        self.write_back(&task)?;
        Ok(task)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(CoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    fn credit_unit(&mut self, id: &str) -> Result<Task> {
        let mut task = self.fetch(id)?;
        apply_credit(&mut task, &self.policy);
        self.write_back(&task)?;
        Ok(task)
    }

    fn toggle_done(&mut self, id: &str) -> Result<Task> {
        let mut task = self.fetch(id)?;
        task.done = !task.done;
        self.write_back(&task)?;
        Ok(task)
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY rowid"))?;
        let rows = stmt.query_map([], row_to_task)?;

        let mut tasks = Vec::new();
        for row in rows {
            let task = row?;
            if filter.matches(&task) {
                tasks.push(task);
            }
        }
        sort_for_display(&mut tasks);
        Ok(tasks)
    }

    fn mark_today_by_priority(&mut self, priority: Priority) -> Result<usize> {
        let flipped = self.conn.execute(
            "UPDATE tasks SET scheduled_today = 1
             WHERE priority = ?1 AND scheduled_today = 0",
            params![format_priority(priority)],
        )?;
        Ok(flipped)
    }

    fn clear_done(&mut self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM tasks WHERE done = 1", [])?;
        Ok(removed)
    }

    fn reset_all_progress(&mut self) -> Result<()> {
        self.conn
            .execute("UPDATE tasks SET completed_units = 0, done = 0", [])?;
        Ok(())
    }
}
