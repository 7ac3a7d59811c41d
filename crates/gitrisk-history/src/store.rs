//! The read-only store interface and its in-memory backend.

use std::collections::HashMap;
use std::path::Path;

use gitrisk_core::GitriskError;

use crate::model::{Change, Commit, CommitId, ProjectHistory};

/// Read access to a project's commit log.
///
/// Implementations return commits newest first, and changes in the order of
/// their owning commit, newest first. A project with no recorded history
/// yields empty vectors rather than an error.
pub trait HistoryStore {
    /// All commits recorded for `project`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or holds malformed rows.
    fn commits(&self, project: &str) -> Result<Vec<Commit>, GitriskError>;

    /// All file changes recorded for `project`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or holds malformed rows.
    fn changes(&self, project: &str) -> Result<Vec<Change>, GitriskError>;
}

/// In-process store keyed by project id.
///
/// # Examples
///
/// ```
/// use gitrisk_history::{HistoryStore, MemoryStore, ProjectHistory};
///
/// let mut store = MemoryStore::new();
/// store.insert(ProjectHistory { project: "web".into(), ..Default::default() }).unwrap();
/// assert!(store.commits("web").unwrap().is_empty());
/// assert!(store.changes("unknown").unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    projects: HashMap<String, ProjectHistory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a project's log after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Store`] if the log violates a schema constraint.
    pub fn insert(&mut self, history: ProjectHistory) -> Result<(), GitriskError> {
        history.validate()?;
        tracing::debug!(
            project = %history.project,
            commits = history.commits.len(),
            changes = history.changes.len(),
            "loaded project history"
        );
        self.projects.insert(history.project.clone(), history);
        Ok(())
    }

    /// Build a store holding the single project described by a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Store`] if the snapshot is malformed.
    pub fn from_json(content: &str) -> Result<Self, GitriskError> {
        let mut store = Self::new();
        store.insert(ProjectHistory::from_json(content)?)?;
        Ok(store)
    }

    /// Read a JSON snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::FileNotFound`] if `path` does not exist,
    /// [`GitriskError::Io`] if it cannot be read, or
    /// [`GitriskError::Store`] if the snapshot is malformed.
    pub fn from_file(path: &Path) -> Result<Self, GitriskError> {
        if !path.exists() {
            return Err(GitriskError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Project ids held by this store, sorted.
    pub fn projects(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.projects.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl HistoryStore for MemoryStore {
    fn commits(&self, project: &str) -> Result<Vec<Commit>, GitriskError> {
        let Some(history) = self.projects.get(project) else {
            return Ok(Vec::new());
        };
        let mut commits = history.commits.clone();
        sort_commits_newest_first(&mut commits);
        Ok(commits)
    }

    fn changes(&self, project: &str) -> Result<Vec<Change>, GitriskError> {
        let Some(history) = self.projects.get(project) else {
            return Ok(Vec::new());
        };
        let mut changes = history.changes.clone();
        sort_changes_by_commit(&mut changes, &history.commits);
        Ok(changes)
    }
}

pub(crate) fn sort_commits_newest_first(commits: &mut [Commit]) {
    commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
}

pub(crate) fn sort_changes_by_commit(changes: &mut [Change], commits: &[Commit]) {
    let rank: HashMap<CommitId, (chrono::DateTime<chrono::Utc>, CommitId)> = commits
        .iter()
        .map(|c| (c.id, (c.timestamp, c.id)))
        .collect();
    changes.sort_by(|a, b| {
        let ra = rank.get(&a.commit_id);
        let rb = rank.get(&b.commit_id);
        rb.cmp(&ra).then_with(|| a.id.cmp(&b.id))
    });
}
