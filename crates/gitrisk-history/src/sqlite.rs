//! SQLite-backed history store.
//!
//! Commits and changes live in two tables keyed by `(project_id, id)`.
//! Timestamps are stored as RFC 3339 text; a row that fails to parse is
//! reported as a store failure rather than skipped.

use std::path::Path;

use chrono::{DateTime, Utc};
use gitrisk_core::GitriskError;
use rusqlite::{params, Connection};

use crate::model::{validate_path, Change, Commit, ProjectHistory};
use crate::store::{sort_changes_by_commit, sort_commits_newest_first, HistoryStore};

/// History store over a SQLite database.
///
/// # Examples
///
/// ```
/// use gitrisk_history::HistoryStore;
/// use gitrisk_history::sqlite::SqliteStore;
///
/// let store = SqliteStore::in_memory().unwrap();
/// assert!(store.commits("web").unwrap().is_empty());
/// ```
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a history database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Database`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, GitriskError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GitriskError::Database(format!("failed to create database directory: {e}"))
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| GitriskError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, GitriskError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            GitriskError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), GitriskError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS commits (
                    project_id TEXT NOT NULL,
                    id INTEGER NOT NULL,
                    hash TEXT NOT NULL,
                    author TEXT NOT NULL,
                    committed_at TEXT NOT NULL,
                    message TEXT,
                    PRIMARY KEY (project_id, id)
                );

                CREATE TABLE IF NOT EXISTS changes (
                    project_id TEXT NOT NULL,
                    id INTEGER NOT NULL,
                    commit_id INTEGER NOT NULL,
                    file_path TEXT NOT NULL,
                    lines_added INTEGER,
                    lines_deleted INTEGER,
                    PRIMARY KEY (project_id, id),
                    FOREIGN KEY (project_id, commit_id) REFERENCES commits(project_id, id)
                );

                CREATE INDEX IF NOT EXISTS idx_changes_commit
                    ON changes(project_id, commit_id);
                ",
            )
            .map_err(|e| GitriskError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Record a commit under `project`.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Database`] on insert failure, including a
    /// duplicate commit id within the project.
    pub fn insert_commit(&self, project: &str, commit: &Commit) -> Result<(), GitriskError> {
        self.conn
            .execute(
                "INSERT INTO commits (project_id, id, hash, author, committed_at, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    project,
                    commit.id,
                    commit.hash,
                    commit.author,
                    commit.timestamp.to_rfc3339(),
                    commit.message,
                ],
            )
            .map_err(|e| GitriskError::Database(format!("failed to insert commit: {e}")))?;
        Ok(())
    }

    /// Record a file change under `project`.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Database`] on insert failure.
    pub fn insert_change(&self, project: &str, change: &Change) -> Result<(), GitriskError> {
        self.conn
            .execute(
                "INSERT INTO changes
                 (project_id, id, commit_id, file_path, lines_added, lines_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    project,
                    change.id,
                    change.commit_id,
                    change.file_path,
                    change.lines_added.map(|v| v as i64),
                    change.lines_deleted.map(|v| v as i64),
                ],
            )
            .map_err(|e| GitriskError::Database(format!("failed to insert change: {e}")))?;
        Ok(())
    }

    /// Import a validated project log in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Store`] if the log is invalid, or
    /// [`GitriskError::Database`] if any insert fails (nothing is written).
    pub fn import(&self, history: &ProjectHistory) -> Result<(), GitriskError> {
        history.validate()?;
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| GitriskError::Database(format!("failed to begin transaction: {e}")))?;
        for commit in &history.commits {
            self.insert_commit(&history.project, commit)?;
        }
        for change in &history.changes {
            self.insert_change(&history.project, change)?;
        }
        tx.commit()
            .map_err(|e| GitriskError::Database(format!("failed to commit import: {e}")))?;
        tracing::debug!(
            project = %history.project,
            commits = history.commits.len(),
            changes = history.changes.len(),
            "imported project history"
        );
        Ok(())
    }
}

impl HistoryStore for SqliteStore {
    fn commits(&self, project: &str) -> Result<Vec<Commit>, GitriskError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, hash, author, committed_at, message
                 FROM commits WHERE project_id = ?1",
            )
            .map_err(|e| GitriskError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![project], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .map_err(|e| GitriskError::Database(format!("failed to query commits: {e}")))?;

        let mut commits = Vec::new();
        for row in rows {
            let (id, hash, author, committed_at, message) =
                row.map_err(|e| GitriskError::Store(format!("malformed commit row: {e}")))?;
            commits.push(Commit {
                id,
                hash,
                author,
                timestamp: parse_timestamp(&committed_at, id)?,
                message,
            });
        }

        sort_commits_newest_first(&mut commits);
        Ok(commits)
    }

    fn changes(&self, project: &str) -> Result<Vec<Change>, GitriskError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, commit_id, file_path, lines_added, lines_deleted
                 FROM changes WHERE project_id = ?1",
            )
            .map_err(|e| GitriskError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![project], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                ))
            })
            .map_err(|e| GitriskError::Database(format!("failed to query changes: {e}")))?;

        let mut changes = Vec::new();
        for row in rows {
            let (id, commit_id, file_path, added, deleted) =
                row.map_err(|e| GitriskError::Store(format!("malformed change row: {e}")))?;
            validate_path(&file_path)?;
            changes.push(Change {
                id,
                commit_id,
                file_path,
                lines_added: line_count(added, id)?,
                lines_deleted: line_count(deleted, id)?,
            });
        }

        let commits = self.commits(project)?;
        sort_changes_by_commit(&mut changes, &commits);
        Ok(changes)
    }
}

fn parse_timestamp(raw: &str, commit_id: i64) -> Result<DateTime<Utc>, GitriskError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            GitriskError::Store(format!(
                "commit {commit_id} has malformed timestamp '{raw}': {e}"
            ))
        })
}

fn line_count(value: Option<i64>, change_id: i64) -> Result<Option<u64>, GitriskError> {
    match value {
        None => Ok(None),
        Some(v) => u64::try_from(v).map(Some).map_err(|_| {
            GitriskError::Store(format!("change {change_id} has negative line count {v}"))
        }),
    }
}
