//! History extraction from a local git repository via git2.
//!
//! Walks commit history and turns each commit's diff against its first
//! parent into [`Change`] rows with line counts. The repository must
//! already exist on disk; nothing is cloned or fetched.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use git2::{Delta, DiffFindOptions, DiffOptions, Repository, Sort};
use gitrisk_core::GitriskError;

use crate::model::{Change, Commit};
use crate::store::HistoryStore;

/// Options for history mining.
///
/// # Examples
///
/// ```
/// use gitrisk_history::mining::MiningOptions;
///
/// let opts = MiningOptions::default();
/// assert!(opts.branch.is_none());
/// assert!(opts.max_commits.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MiningOptions {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Stop after this many commits, newest first (default: unlimited).
    pub max_commits: Option<usize>,
}

/// Commits and changes mined from one repository.
#[derive(Debug, Clone, Default)]
pub struct MinedHistory {
    pub commits: Vec<Commit>,
    pub changes: Vec<Change>,
}

/// A [`HistoryStore`] backed by a single git repository.
///
/// Every project id resolves to the same repository. The walk runs once and
/// is cached for the lifetime of the store.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use gitrisk_history::HistoryStore;
/// use gitrisk_history::mining::{GitStore, MiningOptions};
///
/// let store = GitStore::new(Path::new("."), MiningOptions::default());
/// for c in store.commits("local").unwrap().iter().take(5) {
///     println!("{} {}", c.hash, c.author);
/// }
/// ```
pub struct GitStore {
    repo_path: PathBuf,
    options: MiningOptions,
    mined: OnceCell<MinedHistory>,
}

impl GitStore {
    pub fn new(repo_path: &Path, options: MiningOptions) -> Self {
        Self {
            repo_path: repo_path.to_path_buf(),
            options,
            mined: OnceCell::new(),
        }
    }

    fn mined(&self) -> Result<&MinedHistory, GitriskError> {
        if let Some(mined) = self.mined.get() {
            return Ok(mined);
        }
        let mined = mine_history(&self.repo_path, &self.options)?;
        Ok(self.mined.get_or_init(|| mined))
    }
}

impl HistoryStore for GitStore {
    fn commits(&self, _project: &str) -> Result<Vec<Commit>, GitriskError> {
        Ok(self.mined()?.commits.clone())
    }

    fn changes(&self, _project: &str) -> Result<Vec<Change>, GitriskError> {
        Ok(self.mined()?.changes.clone())
    }
}

/// Mine commit history from a git repository.
///
/// Commits are returned newest first. Ids are assigned oldest = 1 so they
/// stay stable as long as the walked range is unchanged.
///
/// # Errors
///
/// Returns [`GitriskError::Git`] if the repository cannot be opened or walked.
pub fn mine_history(
    repo_path: &Path,
    options: &MiningOptions,
) -> Result<MinedHistory, GitriskError> {
    let repo = Repository::discover(repo_path)
        .map_err(|e| GitriskError::Git(format!("failed to open repository: {e}")))?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| GitriskError::Git(format!("failed to create revwalk: {e}")))?;

    revwalk
        .set_sorting(Sort::TIME)
        .map_err(|e| GitriskError::Git(format!("failed to set revwalk order: {e}")))?;

    if let Some(ref branch) = options.branch {
        let reference = repo
            .resolve_reference_from_short_name(branch)
            .map_err(|e| GitriskError::Git(format!("failed to resolve branch '{branch}': {e}")))?;
        let oid = reference
            .target()
            .ok_or_else(|| GitriskError::Git("branch has no target".into()))?;
        revwalk
            .push(oid)
            .map_err(|e| GitriskError::Git(format!("failed to push oid: {e}")))?;
    } else {
        match repo.head() {
            Ok(_) => {}
            // A freshly initialized repository has no HEAD yet: no history.
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::UnbornBranch | git2::ErrorCode::NotFound
                ) =>
            {
                return Ok(MinedHistory::default());
            }
            Err(e) => return Err(GitriskError::Git(format!("failed to resolve HEAD: {e}"))),
        }
        revwalk
            .push_head()
            .map_err(|e| GitriskError::Git(format!("failed to push HEAD: {e}")))?;
    }

    let mut walked = Vec::new();
    for oid_result in revwalk {
        if options.max_commits.is_some_and(|max| walked.len() >= max) {
            break;
        }
        let oid = oid_result.map_err(|e| GitriskError::Git(format!("revwalk error: {e}")))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| GitriskError::Git(format!("failed to find commit: {e}")))?;
        let files = extract_file_changes(&repo, &commit)?;
        walked.push((commit_record(&commit)?, files));
    }

    let total = walked.len() as i64;
    let mut mined = MinedHistory::default();
    let mut next_change_id = 1i64;
    for (idx, (mut commit, files)) in walked.into_iter().enumerate() {
        commit.id = total - idx as i64;
        for (path, added, deleted) in files {
            mined.changes.push(Change {
                id: next_change_id,
                commit_id: commit.id,
                file_path: path,
                lines_added: Some(added),
                lines_deleted: Some(deleted),
            });
            next_change_id += 1;
        }
        mined.commits.push(commit);
    }

    tracing::debug!(
        repo = %repo_path.display(),
        commits = mined.commits.len(),
        changes = mined.changes.len(),
        "mined git history"
    );
    Ok(mined)
}

fn commit_record(commit: &git2::Commit) -> Result<Commit, GitriskError> {
    let seconds = commit.time().seconds();
    let timestamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        GitriskError::Git(format!(
            "commit {} has out-of-range timestamp {seconds}",
            commit.id()
        ))
    })?;

    let author = commit.author();
    let author_id = author
        .name()
        .filter(|n| !n.is_empty())
        .or_else(|| author.email())
        .unwrap_or("unknown")
        .to_string();

    Ok(Commit {
        id: 0,
        hash: commit.id().to_string(),
        author: author_id,
        timestamp,
        message: commit
            .message()
            .and_then(|m| m.lines().next())
            .map(str::to_string),
    })
}

fn extract_file_changes(
    repo: &Repository,
    commit: &git2::Commit,
) -> Result<Vec<(String, u64, u64)>, GitriskError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| GitriskError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| GitriskError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| GitriskError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&commit_tree),
            Some(&mut diff_opts),
        )
        .map_err(|e| GitriskError::Git(format!("failed to compute diff: {e}")))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| GitriskError::Git(format!("failed to find renames: {e}")))?;

    let mut paths = Vec::new();
    for delta in diff.deltas() {
        // Deleted files are recorded under their old path.
        let file = match delta.status() {
            Delta::Deleted => delta.old_file(),
            _ => delta.new_file(),
        };
        let Some(path) = file.path() else {
            continue;
        };
        let path = to_forward_slashes(path);
        if !path.is_empty() && !paths.contains(&path) {
            paths.push(path);
        }
    }

    let mut line_counts: HashMap<String, (u64, u64)> = HashMap::new();
    diff.foreach(
        &mut |_delta, _progress| true,
        None,
        None,
        Some(&mut |delta, _hunk, line| {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(to_forward_slashes)
                .unwrap_or_default();

            let entry = line_counts.entry(path).or_insert((0, 0));
            match line.origin() {
                '+' => entry.0 += 1,
                '-' => entry.1 += 1,
                _ => {}
            }
            true
        }),
    )
    .map_err(|e| GitriskError::Git(format!("failed to iterate diff lines: {e}")))?;

    Ok(paths
        .into_iter()
        .map(|path| {
            let (added, deleted) = line_counts.get(&path).copied().unwrap_or((0, 0));
            (path, added, deleted)
        })
        .collect())
}

fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
