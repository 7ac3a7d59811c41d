//! Filtered, indexed view over a project's log.
//!
//! Every analyzer consumes a [`History`]. Building one is the only place
//! where time range, path prefix, and file-type parameters are applied, so
//! all analyzers see the same scoped data.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use gitrisk_core::GitriskError;

use crate::model::{file_extension, Change, Commit, CommitId};
use crate::store::{sort_changes_by_commit, sort_commits_newest_first, HistoryStore};

/// Caller-supplied scoping parameters.
///
/// # Examples
///
/// ```
/// use gitrisk_history::AnalysisFilter;
///
/// let filter = AnalysisFilter {
///     path_prefix: Some("src/".into()),
///     file_types: ["js".to_string(), "ts".to_string()].into(),
///     ..AnalysisFilter::default()
/// };
/// assert!(filter.validate().is_ok());
/// assert!(filter.includes_path("src/app.js"));
/// assert!(!filter.includes_path("srcx/app.js"));
/// assert!(!filter.includes_path("src/style.css"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisFilter {
    /// Inclusive lower bound on commit timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on commit timestamp.
    pub end_date: Option<DateTime<Utc>>,
    /// Directory scope; `src` and `src/` both select `src/**`.
    pub path_prefix: Option<String>,
    /// Extensions without the leading dot; empty means every file.
    pub file_types: BTreeSet<String>,
}

impl AnalysisFilter {
    /// Reject contradictory or malformed parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::InvalidFilter`] when the start date is after
    /// the end date or a file type is empty.
    pub fn validate(&self) -> Result<(), GitriskError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(GitriskError::InvalidFilter(format!(
                    "start date {} is after end date {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                )));
            }
        }
        for ext in &self.file_types {
            let normalized = normalize_extension(ext);
            if normalized.is_empty() || normalized.contains('/') {
                return Err(GitriskError::InvalidFilter(format!(
                    "file type '{ext}' is not a valid extension"
                )));
            }
        }
        Ok(())
    }

    /// Whether a commit at `timestamp` falls inside the date range.
    pub fn includes_timestamp(&self, timestamp: DateTime<Utc>) -> bool {
        self.start_date.map_or(true, |start| timestamp >= start)
            && self.end_date.map_or(true, |end| timestamp <= end)
    }

    /// Whether `path` passes the directory and file-type scope.
    pub fn includes_path(&self, path: &str) -> bool {
        if let Some(prefix) = self.normalized_prefix() {
            let inside = path == prefix
                || (path.starts_with(prefix) && path[prefix.len()..].starts_with('/'));
            if !inside {
                return false;
            }
        }
        if self.file_types.is_empty() {
            return true;
        }
        match file_extension(path) {
            Some(ext) => self
                .file_types
                .iter()
                .any(|t| normalize_extension(t).eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// Whether a path or file-type scope is active.
    pub fn scopes_files(&self) -> bool {
        self.normalized_prefix().is_some() || !self.file_types.is_empty()
    }

    fn normalized_prefix(&self) -> Option<&str> {
        let raw = self.path_prefix.as_deref()?.trim();
        let trimmed = raw.trim_start_matches("./").trim_end_matches('/');
        if trimmed.is_empty() || trimmed == "." {
            None
        } else {
            Some(trimmed)
        }
    }
}

fn normalize_extension(ext: &str) -> &str {
    ext.trim().trim_start_matches('.')
}

/// A project's commits and changes after filtering.
///
/// Commits are held newest first. Every change references a commit in the
/// view; commits may have zero changes when no file scope is active.
///
/// # Examples
///
/// ```
/// use gitrisk_history::{AnalysisFilter, History, MemoryStore};
///
/// let store = MemoryStore::new();
/// let history = History::load(&store, "web", &AnalysisFilter::default()).unwrap();
/// assert!(history.is_empty());
/// assert_eq!(history.file_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct History {
    commits: Vec<Commit>,
    changes: Vec<Change>,
    index: HashMap<CommitId, usize>,
}

impl History {
    /// Read a project's log from `store` and apply `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::InvalidFilter`] for a rejected filter, or the
    /// store's error when the read fails or yields malformed rows.
    pub fn load<S: HistoryStore + ?Sized>(
        store: &S,
        project: &str,
        filter: &AnalysisFilter,
    ) -> Result<Self, GitriskError> {
        filter.validate()?;
        let commits = store.commits(project)?;
        let changes = store.changes(project)?;
        let history = Self::from_parts(commits, changes, filter)?;
        tracing::debug!(
            project,
            commits = history.commits.len(),
            changes = history.changes.len(),
            files = history.file_count(),
            "loaded filtered history"
        );
        Ok(history)
    }

    /// Build a view from rows already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::InvalidFilter`] for a rejected filter, or
    /// [`GitriskError::Store`] on duplicate commit ids or a change whose
    /// commit is missing.
    pub fn from_parts(
        commits: Vec<Commit>,
        changes: Vec<Change>,
        filter: &AnalysisFilter,
    ) -> Result<Self, GitriskError> {
        filter.validate()?;

        let mut known: HashMap<CommitId, DateTime<Utc>> = HashMap::with_capacity(commits.len());
        for commit in &commits {
            if known.insert(commit.id, commit.timestamp).is_some() {
                return Err(GitriskError::Store(format!(
                    "duplicate commit id {}",
                    commit.id
                )));
            }
        }

        let mut kept_changes = Vec::with_capacity(changes.len());
        for change in changes {
            let Some(timestamp) = known.get(&change.commit_id) else {
                return Err(GitriskError::Store(format!(
                    "change {} references unknown commit {}",
                    change.id, change.commit_id
                )));
            };
            if filter.includes_timestamp(*timestamp) && filter.includes_path(&change.file_path) {
                kept_changes.push(change);
            }
        }

        let touched: HashSet<CommitId> = kept_changes.iter().map(|c| c.commit_id).collect();
        let scoped = filter.scopes_files();
        let mut kept_commits: Vec<Commit> = commits
            .into_iter()
            .filter(|c| filter.includes_timestamp(c.timestamp))
            .filter(|c| !scoped || touched.contains(&c.id))
            .collect();

        sort_commits_newest_first(&mut kept_commits);
        sort_changes_by_commit(&mut kept_changes, &kept_commits);

        let index = kept_commits
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.id, idx))
            .collect();

        Ok(Self {
            commits: kept_commits,
            changes: kept_changes,
            index,
        })
    }

    /// Commits in scope, newest first.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Changes in scope, grouped by owning commit, newest first.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn commit(&self, id: CommitId) -> Option<&Commit> {
        self.index.get(&id).map(|&idx| &self.commits[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Distinct files touched by each commit. Commits with no in-scope
    /// change are absent.
    pub fn files_by_commit(&self) -> BTreeMap<CommitId, BTreeSet<&str>> {
        let mut map: BTreeMap<CommitId, BTreeSet<&str>> = BTreeMap::new();
        for change in &self.changes {
            map.entry(change.commit_id)
                .or_default()
                .insert(change.file_path.as_str());
        }
        map
    }

    /// Distinct commits touching each file.
    pub fn commits_by_file(&self) -> BTreeMap<&str, BTreeSet<CommitId>> {
        let mut map: BTreeMap<&str, BTreeSet<CommitId>> = BTreeMap::new();
        for change in &self.changes {
            map.entry(change.file_path.as_str())
                .or_default()
                .insert(change.commit_id);
        }
        map
    }

    /// Every change row touching each file.
    pub fn changes_by_file(&self) -> BTreeMap<&str, Vec<&Change>> {
        let mut map: BTreeMap<&str, Vec<&Change>> = BTreeMap::new();
        for change in &self.changes {
            map.entry(change.file_path.as_str()).or_default().push(change);
        }
        map
    }

    /// Number of distinct files touched.
    pub fn file_count(&self) -> usize {
        self.changes
            .iter()
            .map(|c| c.file_path.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Number of distinct commit authors.
    pub fn contributor_count(&self) -> usize {
        self.commits
            .iter()
            .map(|c| c.author.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Latest commit timestamp touching any of `commit_ids`.
    pub fn latest_timestamp<'a, I>(&self, commit_ids: I) -> Option<DateTime<Utc>>
    where
        I: IntoIterator<Item = &'a CommitId>,
    {
        commit_ids
            .into_iter()
            .filter_map(|id| self.commit(*id))
            .map(|c| c.timestamp)
            .max()
    }
}
