use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::errors::TodoError;
use crate::models::{CreateTodo, Todo, UpdateTodo, normalize_description, now_millis};

pub const DEFAULT_TABLE: &str = "todos";

const MAX_TABLE_NAME_LEN: usize = 64;

pub type DbResult<T> = std::result::Result<T, TodoError>;

/// Async-safe handle to the item store.
///
/// Wraps `TodoDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<TodoDb>>,
}

impl DbHandle {
    pub fn new(db: TodoDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the store on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> DbResult<R>
    where
        F: FnOnce(&TodoDb) -> DbResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| TodoError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the store mutex synchronously. Only for startup and tests.
    pub fn lock_sync(&self) -> DbResult<std::sync::MutexGuard<'_, TodoDb>> {
        self.inner.lock().map_err(|_| TodoError::LockPoisoned)
    }
}

/// Key-value table of todo records keyed by `id`.
#[derive(Debug)]
pub struct TodoDb {
    conn: Connection,
    table: String,
}

impl TodoDb {
    /// Open (or create) the store at the given path and ensure the table exists.
    pub fn new(path: &Path, table: &str) -> DbResult<Self> {
        validate_table_name(table)?;
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self {
            conn,
            table: table.to_string(),
        };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory store with the default table (for testing).
    pub fn new_in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self {
            conn,
            table: DEFAULT_TABLE.to_string(),
        };
        db.init()?;
        Ok(db)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn init(&self) -> DbResult<()> {
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" (
                    id TEXT PRIMARY KEY NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT,
                    completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );",
                table = self.table
            ))
            .with_context(|| format!("Failed to create table {}", self.table))?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn drop_table_for_test(&self) {
        self.conn
            .execute_batch(&format!("DROP TABLE \"{}\"", self.table))
            .unwrap();
    }

    fn columns() -> &'static str {
        "id, title, description, completed, created_at, updated_at"
    }

    pub fn list_todos(&self) -> DbResult<Vec<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM \"{}\"",
                Self::columns(),
                self.table
            ))
            .context("Failed to prepare list_todos")?;
        let rows = stmt
            .query_map([], TodoRow::from_row)
            .context("Failed to query todos")?;
        let mut todos = Vec::new();
        for row in rows {
            let r = row.context("Failed to read todo row")?;
            todos.push(r.into_todo()?);
        }
        Ok(todos)
    }

    pub fn get_todo(&self, id: &str) -> DbResult<Option<Todo>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM \"{}\" WHERE id = ?1",
                    Self::columns(),
                    self.table
                ),
                params![id],
                TodoRow::from_row,
            )
            .optional()
            .context("Failed to query todo")?;
        row.map(TodoRow::into_todo).transpose()
    }

    pub fn create_todo(&self, req: CreateTodo) -> DbResult<Todo> {
        req.validate()?;

        let now = now_millis();
        let todo = Todo {
            id: Uuid::now_v7().to_string(),
            title: req.title,
            description: normalize_description(req.description),
            completed: false,
            created_at: now,
            updated_at: now,
        };

        self.conn
            .execute(
                &format!(
                    "INSERT INTO \"{}\" ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    self.table,
                    Self::columns()
                ),
                params![
                    todo.id,
                    todo.title,
                    todo.description,
                    todo.completed,
                    format_timestamp(&todo.created_at),
                    format_timestamp(&todo.updated_at),
                ],
            )
            .context("Failed to insert todo")?;
        Ok(todo)
    }

    /// Replace the supplied fields of an existing todo in one conditional write.
    ///
    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn update_todo(&self, id: &str, req: UpdateTodo) -> DbResult<Todo> {
        req.validate()?;

        let has_description = req.description.is_some();
        let description = normalize_description(req.description);
        let row = self
            .conn
            .query_row(
                &format!(
                    "UPDATE \"{}\" SET
                        title = COALESCE(?1, title),
                        description = CASE WHEN ?2 THEN ?3 ELSE description END,
                        completed = COALESCE(?4, completed),
                        updated_at = MAX(updated_at, ?5)
                     WHERE id = ?6
                     RETURNING {}",
                    self.table,
                    Self::columns()
                ),
                params![
                    req.title,
                    has_description,
                    description,
                    req.completed,
                    format_timestamp(&now_millis()),
                    id,
                ],
                TodoRow::from_row,
            )
            .optional()
            .context("Failed to update todo")?;

        match row {
            Some(r) => r.into_todo(),
            None => Err(TodoError::NotFound { id: id.to_string() }),
        }
    }

    pub fn delete_todo(&self, id: &str) -> DbResult<()> {
        let count = self
            .conn
            .execute(
                &format!("DELETE FROM \"{}\" WHERE id = ?1", self.table),
                params![id],
            )
            .context("Failed to delete todo")?;
        if count == 0 {
            return Err(TodoError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> DbResult<()> {
    let mut chars = name.chars();
    let valid = name.len() <= MAX_TABLE_NAME_LEN
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(TodoError::InvalidTableName {
            name: name.to_string(),
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> DbResult<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp in store: {}", raw))?;
    Ok(ts.with_timezone(&Utc))
}

struct TodoRow {
    id: String,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl TodoRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            completed: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_todo(self) -> DbResult<Todo> {
        Ok(Todo {
            id: self.id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}
