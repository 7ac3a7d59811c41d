//! Temporal coupling detection.
//!
//! Identifies pairs of files that repeatedly change in the same commit,
//! which may indicate hidden dependencies. Pairs are only formed inside a
//! single commit, so the work is bounded by the square of files per commit
//! rather than the square of files in the project.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gitrisk_core::{round_to, CouplingConfig};
use gitrisk_history::History;
use serde::{Deserialize, Serialize};

/// A pair of files that change together.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitrisk_pulse::coupling::CouplingPair;
///
/// let pair = CouplingPair {
///     file_a: "src/auth.js".into(),
///     file_b: "src/session.js".into(),
///     shared_commits: 6,
///     total_commits_a: 8,
///     total_commits_b: 6,
///     coupling_score: 1.0,
///     last_modified: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
/// };
/// assert!(pair.file_a < pair.file_b);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingPair {
    /// Lexicographically smaller path of the pair.
    pub file_a: String,
    pub file_b: String,
    /// Commits touching both files.
    pub shared_commits: u32,
    pub total_commits_a: u32,
    pub total_commits_b: u32,
    /// `shared_commits / min(total_commits_a, total_commits_b)`, in `[0, 1]`.
    pub coupling_score: f64,
    /// Latest commit touching either file.
    pub last_modified: DateTime<Utc>,
}

/// Coupled pairs plus the bookkeeping needed to interpret them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouplingReport {
    /// Highest score first, capped at `max_pairs`.
    pub pairs: Vec<CouplingPair>,
    /// Commits with at least one in-scope file.
    pub commits_analyzed: usize,
    /// Commits left out of pairing for touching too many files.
    pub bulk_commits_skipped: usize,
    /// Pairs passing the filters before truncation.
    pub pairs_matched: usize,
}

/// Detect temporal coupling across every commit in `history`.
///
/// Per-file totals count every commit. Commits touching more than
/// `config.max_files_per_commit` files still count toward totals but form
/// no pairs.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitrisk_core::CouplingConfig;
/// use gitrisk_history::{AnalysisFilter, Change, Commit, History};
/// use gitrisk_pulse::coupling::detect_coupling;
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let commits = vec![
///     Commit { id: 1, hash: "c1".into(), author: "alice".into(), timestamp: at, message: None },
///     Commit { id: 2, hash: "c2".into(), author: "alice".into(), timestamp: at, message: None },
/// ];
/// let change = |id, commit_id, path: &str| Change {
///     id,
///     commit_id,
///     file_path: path.into(),
///     lines_added: Some(1),
///     lines_deleted: None,
/// };
/// let changes = vec![
///     change(1, 1, "a.rs"),
///     change(2, 1, "b.rs"),
///     change(3, 2, "a.rs"),
///     change(4, 2, "b.rs"),
/// ];
/// let history = History::from_parts(commits, changes, &AnalysisFilter::default()).unwrap();
///
/// let report = detect_coupling(&history, &CouplingConfig::default());
/// assert_eq!(report.pairs.len(), 1);
/// assert_eq!(report.pairs[0].coupling_score, 1.0);
/// ```
pub fn detect_coupling(history: &History, config: &CouplingConfig) -> CouplingReport {
    let files_by_commit = history.files_by_commit();

    let mut totals: HashMap<&str, u32> = HashMap::new();
    let mut last_touch: HashMap<&str, DateTime<Utc>> = HashMap::new();
    let mut shared: HashMap<(&str, &str), u32> = HashMap::new();
    let mut bulk_commits_skipped = 0usize;

    for (commit_id, files) in &files_by_commit {
        let timestamp = history.commit(*commit_id).map(|c| c.timestamp);
        for &file in files {
            *totals.entry(file).or_default() += 1;
            if let Some(ts) = timestamp {
                let entry = last_touch.entry(file).or_insert(ts);
                if ts > *entry {
                    *entry = ts;
                }
            }
        }

        if files.len() > config.max_files_per_commit {
            bulk_commits_skipped += 1;
            tracing::debug!(
                commit = *commit_id,
                files = files.len(),
                "commit too large for pairing"
            );
            continue;
        }

        let files: Vec<&str> = files.iter().copied().collect();
        for (i, &a) in files.iter().enumerate() {
            for &b in &files[i + 1..] {
                *shared.entry(normalize_pair(a, b)).or_default() += 1;
            }
        }
    }

    if bulk_commits_skipped > 0 {
        tracing::warn!(
            skipped = bulk_commits_skipped,
            max_files_per_commit = config.max_files_per_commit,
            "excluded bulk commits from coupling analysis"
        );
    }

    let mut pairs = Vec::new();
    for ((file_a, file_b), shared_commits) in shared {
        if shared_commits < config.min_shared_commits {
            continue;
        }

        let total_commits_a = totals.get(file_a).copied().unwrap_or(0);
        let total_commits_b = totals.get(file_b).copied().unwrap_or(0);
        let min_total = total_commits_a.min(total_commits_b);
        if min_total == 0 {
            continue;
        }

        let score = f64::from(shared_commits) / f64::from(min_total);
        if score < config.min_coupling_score {
            continue;
        }

        let Some(last_modified) = [last_touch.get(file_a), last_touch.get(file_b)]
            .into_iter()
            .flatten()
            .max()
            .copied()
        else {
            continue;
        };

        pairs.push(CouplingPair {
            file_a: file_a.to_string(),
            file_b: file_b.to_string(),
            shared_commits,
            total_commits_a,
            total_commits_b,
            coupling_score: round_to(score.min(1.0), 4),
            last_modified,
        });
    }

    pairs.sort_by(|a, b| {
        b.coupling_score
            .total_cmp(&a.coupling_score)
            .then_with(|| b.shared_commits.cmp(&a.shared_commits))
            .then_with(|| a.file_a.cmp(&b.file_a))
            .then_with(|| a.file_b.cmp(&b.file_b))
    });

    let pairs_matched = pairs.len();
    pairs.truncate(config.max_pairs);

    tracing::debug!(
        commits = files_by_commit.len(),
        matched = pairs_matched,
        returned = pairs.len(),
        "coupling detection complete"
    );

    CouplingReport {
        pairs,
        commits_analyzed: files_by_commit.len(),
        bulk_commits_skipped,
        pairs_matched,
    }
}

/// Order two paths so the smaller comes first.
///
/// # Examples
///
/// ```
/// use gitrisk_pulse::coupling::normalize_pair;
///
/// assert_eq!(normalize_pair("b.rs", "a.rs"), ("a.rs", "b.rs"));
/// assert_eq!(normalize_pair("a.rs", "b.rs"), ("a.rs", "b.rs"));
/// ```
pub fn normalize_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gitrisk_history::{AnalysisFilter, Change, Commit};

    /// One commit per entry, each touching the listed files.
    fn history_of(commits: &[&[&str]]) -> History {
        let mut rows = Vec::new();
        let mut changes = Vec::new();
        for (idx, files) in commits.iter().enumerate() {
            let id = idx as i64 + 1;
            rows.push(Commit {
                id,
                hash: format!("h{id}"),
                author: "alice".into(),
                timestamp: Utc.with_ymd_and_hms(2024, 2, idx as u32 % 28 + 1, 0, 0, 0).unwrap(),
                message: None,
            });
            for path in *files {
                changes.push(Change {
                    id: changes.len() as i64 + 1,
                    commit_id: id,
                    file_path: (*path).into(),
                    lines_added: Some(5),
                    lines_deleted: Some(2),
                });
            }
        }
        History::from_parts(rows, changes, &AnalysisFilter::default()).unwrap()
    }

    #[test]
    fn score_uses_smaller_total() {
        let history = history_of(&[&["a.js", "b.js"], &["a.js", "b.js"], &["a.js"]]);
        let report = detect_coupling(&history, &CouplingConfig::default());
        assert_eq!(report.pairs.len(), 1);
        let pair = &report.pairs[0];
        assert_eq!((pair.file_a.as_str(), pair.file_b.as_str()), ("a.js", "b.js"));
        assert_eq!(pair.total_commits_a, 3);
        assert_eq!(pair.total_commits_b, 2);
        assert_eq!(pair.shared_commits, 2);
        assert_eq!(pair.coupling_score, 1.0);
        assert_eq!(
            pair.last_modified,
            Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn pair_is_reported_once_regardless_of_order() {
        let history = history_of(&[&["b.js", "a.js"], &["a.js", "b.js"]]);
        let report = detect_coupling(&history, &CouplingConfig::default());
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.pairs[0].file_a, "a.js");
    }

    #[test]
    fn min_shared_commits_filters_pairs() {
        let history = history_of(&[&["a.js", "b.js"]]);
        assert!(detect_coupling(&history, &CouplingConfig::default())
            .pairs
            .is_empty());

        let config = CouplingConfig {
            min_shared_commits: 1,
            ..CouplingConfig::default()
        };
        assert_eq!(detect_coupling(&history, &config).pairs.len(), 1);
    }

    #[test]
    fn min_score_filters_pairs() {
        let history = history_of(&[
            &["a.js", "b.js"],
            &["a.js", "b.js"],
            &["a.js", "c.js"],
            &["c.js"],
            &["c.js"],
            &["a.js", "c.js"],
        ]);
        let config = CouplingConfig {
            min_coupling_score: 0.6,
            ..CouplingConfig::default()
        };
        let report = detect_coupling(&history, &config);
        // a-c: 2 / min(4, 4) = 0.5 is filtered, a-b: 2 / 2 survives.
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.pairs[0].file_b, "b.js");
    }

    #[test]
    fn bulk_commits_count_toward_totals_but_not_pairs() {
        let config = CouplingConfig {
            max_files_per_commit: 2,
            min_shared_commits: 1,
            ..CouplingConfig::default()
        };
        let history = history_of(&[&["a.js", "b.js", "c.js"], &["a.js", "b.js"]]);
        let report = detect_coupling(&history, &config);
        assert_eq!(report.bulk_commits_skipped, 1);
        assert_eq!(report.commits_analyzed, 2);
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.pairs[0].shared_commits, 1);
        assert_eq!(report.pairs[0].total_commits_a, 2);
        assert_eq!(report.pairs[0].coupling_score, 0.5);
    }

    #[test]
    fn ranking_breaks_ties_by_shared_then_path() {
        let history = history_of(&[
            &["x.js", "y.js"],
            &["x.js", "y.js"],
            &["x.js", "y.js"],
            &["c.js", "d.js"],
            &["c.js", "d.js"],
            &["a.js", "b.js"],
            &["a.js", "b.js"],
        ]);
        let report = detect_coupling(&history, &CouplingConfig::default());
        let order: Vec<&str> = report.pairs.iter().map(|p| p.file_a.as_str()).collect();
        assert_eq!(order, vec!["x.js", "a.js", "c.js"]);
    }

    #[test]
    fn max_pairs_truncates_output() {
        let history = history_of(&[&["a.js", "b.js", "c.js"], &["a.js", "b.js", "c.js"]]);
        let config = CouplingConfig {
            max_pairs: 2,
            ..CouplingConfig::default()
        };
        let report = detect_coupling(&history, &config);
        assert_eq!(report.pairs_matched, 3);
        assert_eq!(report.pairs.len(), 2);
    }

    #[test]
    fn single_file_commits_form_no_pairs() {
        let history = history_of(&[&["a.js"], &["a.js"], &["b.js"]]);
        let report = detect_coupling(&history, &CouplingConfig::default());
        assert!(report.pairs.is_empty());
        assert_eq!(report.commits_analyzed, 3);
    }

    #[test]
    fn empty_history_yields_empty_report() {
        let report = detect_coupling(&History::default(), &CouplingConfig::default());
        assert!(report.pairs.is_empty());
        assert_eq!(report.commits_analyzed, 0);
        assert_eq!(report.bulk_commits_skipped, 0);
    }

    #[test]
    fn serializes_contract_field_names() {
        let history = history_of(&[&["a.js", "b.js"], &["a.js", "b.js"]]);
        let report = detect_coupling(&history, &CouplingConfig::default());
        let json = serde_json::to_value(&report.pairs[0]).unwrap();
        for key in [
            "file_a",
            "file_b",
            "shared_commits",
            "total_commits_a",
            "total_commits_b",
            "coupling_score",
            "last_modified",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
