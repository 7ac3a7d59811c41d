//! The immutable commit/change log.
//!
//! These are the only shapes accepted from a history store. Unknown fields
//! are rejected at deserialization time and [`ProjectHistory::validate`]
//! checks the cross-row constraints serde cannot.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use gitrisk_core::GitriskError;
use serde::{Deserialize, Serialize};

/// Project-scoped commit identifier.
pub type CommitId = i64;

/// Project-scoped change identifier.
pub type ChangeId = i64;

/// A single commit in a project's history.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitrisk_history::Commit;
///
/// let commit = Commit {
///     id: 1,
///     hash: "3f2a9c1".into(),
///     author: "alice".into(),
///     timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
///     message: Some("fix: auth bug".into()),
/// };
/// assert_eq!(commit.author, "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    pub id: CommitId,
    pub hash: String,
    /// Author identifier (name or email, whatever the store records).
    pub author: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One file touched by a commit.
///
/// Line counts are optional: some stores only record which files changed.
///
/// # Examples
///
/// ```
/// use gitrisk_history::Change;
///
/// let change = Change {
///     id: 1,
///     commit_id: 1,
///     file_path: "src/auth/session.rs".into(),
///     lines_added: Some(10),
///     lines_deleted: Some(3),
/// };
/// assert_eq!(change.lines_changed(), Some(13));
/// assert_eq!(change.extension(), Some("rs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Change {
    pub id: ChangeId,
    pub commit_id: CommitId,
    /// Forward-slash separated path relative to the repository root.
    pub file_path: String,
    #[serde(default)]
    pub lines_added: Option<u64>,
    #[serde(default)]
    pub lines_deleted: Option<u64>,
}

impl Change {
    /// Lines added plus deleted, or `None` when the store recorded neither.
    pub fn lines_changed(&self) -> Option<u64> {
        match (self.lines_added, self.lines_deleted) {
            (None, None) => None,
            (added, deleted) => Some(added.unwrap_or(0) + deleted.unwrap_or(0)),
        }
    }

    /// Extension of the final path segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        file_extension(&self.file_path)
    }
}

pub(crate) fn file_extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        // Dotfiles like `.gitignore` have no extension.
        Some(0) | None => None,
        Some(idx) if idx + 1 < name.len() => Some(&name[idx + 1..]),
        Some(_) => None,
    }
}

/// The full log for one project, as exchanged in JSON snapshots.
///
/// # Examples
///
/// ```
/// use gitrisk_history::ProjectHistory;
///
/// let json = r#"{
///     "project": "web",
///     "commits": [
///         {"id": 1, "hash": "a1", "author": "alice", "timestamp": "2024-01-05T10:00:00Z"}
///     ],
///     "changes": [
///         {"id": 1, "commit_id": 1, "file_path": "src/app.js", "lines_added": 4}
///     ]
/// }"#;
/// let history = ProjectHistory::from_json(json).unwrap();
/// assert_eq!(history.commits.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectHistory {
    pub project: String,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl ProjectHistory {
    /// Parse and validate a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Store`] when the document does not match the
    /// schema or violates a cross-row constraint.
    pub fn from_json(content: &str) -> Result<Self, GitriskError> {
        let history: Self = serde_json::from_str(content)
            .map_err(|e| GitriskError::Store(format!("malformed history snapshot: {e}")))?;
        history.validate()?;
        Ok(history)
    }

    /// Check the constraints the schema cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Store`] on duplicate commit or change ids,
    /// a change that references an unknown commit, or an invalid path.
    pub fn validate(&self) -> Result<(), GitriskError> {
        if self.project.trim().is_empty() {
            return Err(GitriskError::Store("project id must not be empty".into()));
        }

        let mut commit_ids = HashSet::with_capacity(self.commits.len());
        for commit in &self.commits {
            if !commit_ids.insert(commit.id) {
                return Err(GitriskError::Store(format!(
                    "duplicate commit id {} in project '{}'",
                    commit.id, self.project
                )));
            }
        }

        let mut change_ids = HashSet::with_capacity(self.changes.len());
        for change in &self.changes {
            if !change_ids.insert(change.id) {
                return Err(GitriskError::Store(format!(
                    "duplicate change id {} in project '{}'",
                    change.id, self.project
                )));
            }
            if !commit_ids.contains(&change.commit_id) {
                return Err(GitriskError::Store(format!(
                    "change {} references unknown commit {}",
                    change.id, change.commit_id
                )));
            }
            validate_path(&change.file_path)?;
        }

        Ok(())
    }
}

pub(crate) fn validate_path(path: &str) -> Result<(), GitriskError> {
    if path.is_empty() {
        return Err(GitriskError::Store("change has an empty file path".into()));
    }
    if path.contains('\\') {
        return Err(GitriskError::Store(format!(
            "file path '{path}' must be forward-slash separated"
        )));
    }
    if path.starts_with('/') {
        return Err(GitriskError::Store(format!(
            "file path '{path}' must be relative to the repository root"
        )));
    }
    Ok(())
}
