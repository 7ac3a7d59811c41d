//! Change-frequency hotspot detection.
//!
//! Ranks files by how much and how often they change. A file is flagged as
//! a hotspot when the configured metric is strictly above the minimum.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use gitrisk_core::{ComplexityMetric, HotspotConfig, RiskLevel};
use gitrisk_history::History;
use serde::{Deserialize, Serialize};

use crate::Classified;

/// A file's change-frequency record.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitrisk_core::{ComplexityMetric, RiskLevel};
/// use gitrisk_pulse::hotspots::Hotspot;
///
/// let h = Hotspot {
///     file_path: "src/auth/session.js".into(),
///     change_count: 8,
///     total_changes: 640,
///     risk_level: RiskLevel::Medium,
///     is_hotspot: true,
///     last_modified: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
///     authors: 3,
/// };
/// assert_eq!(h.metric_value(ComplexityMetric::ChangeCount), 8.0);
/// assert_eq!(h.metric_value(ComplexityMetric::Complexity), 80.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// File path relative to repo root.
    pub file_path: String,
    /// Distinct commits touching this file.
    pub change_count: u32,
    /// Lines added + deleted across every touching change.
    pub total_changes: u64,
    pub risk_level: RiskLevel,
    /// Whether the metric is strictly above the configured minimum.
    pub is_hotspot: bool,
    /// Timestamp of the most recent touching commit.
    pub last_modified: DateTime<Utc>,
    /// Number of distinct authors.
    pub authors: u32,
}

impl Hotspot {
    /// The value of `metric` for this file.
    pub fn metric_value(&self, metric: ComplexityMetric) -> f64 {
        match metric {
            ComplexityMetric::ChangeCount => f64::from(self.change_count),
            ComplexityMetric::Complexity if self.change_count == 0 => 0.0,
            ComplexityMetric::Complexity => {
                self.total_changes as f64 / f64::from(self.change_count)
            }
        }
    }
}

impl Classified for Hotspot {
    fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }
}

#[derive(Default)]
struct FileStats<'a> {
    commits: HashSet<i64>,
    lines: u64,
    authors: HashSet<&'a str>,
    last_modified: Option<DateTime<Utc>>,
}

/// Rank every file in `history` by change volume.
///
/// Returns one record per touched file, sorted by `total_changes`
/// descending, then `change_count` descending, then path. Files at or below
/// `config.min_complexity` are included with `is_hotspot = false`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitrisk_core::HotspotConfig;
/// use gitrisk_history::{AnalysisFilter, Change, Commit, History};
/// use gitrisk_pulse::hotspots::detect_hotspots;
///
/// let commits: Vec<Commit> = (1..=6)
///     .map(|id| Commit {
///         id,
///         hash: format!("c{id}"),
///         author: "alice".into(),
///         timestamp: Utc.with_ymd_and_hms(2024, 1, id as u32, 0, 0, 0).unwrap(),
///         message: None,
///     })
///     .collect();
/// let changes: Vec<Change> = (1..=6)
///     .map(|id| Change {
///         id,
///         commit_id: id,
///         file_path: "a.js".into(),
///         lines_added: Some(2),
///         lines_deleted: Some(1),
///     })
///     .collect();
/// let history = History::from_parts(commits, changes, &AnalysisFilter::default()).unwrap();
///
/// let hotspots = detect_hotspots(&history, &HotspotConfig::default());
/// assert_eq!(hotspots[0].change_count, 6);
/// assert_eq!(hotspots[0].total_changes, 18);
/// assert!(hotspots[0].is_hotspot);
/// ```
pub fn detect_hotspots(history: &History, config: &HotspotConfig) -> Vec<Hotspot> {
    let mut stats: HashMap<&str, FileStats<'_>> = HashMap::new();

    for change in history.changes() {
        let Some(commit) = history.commit(change.commit_id) else {
            continue;
        };
        let entry = stats.entry(change.file_path.as_str()).or_default();
        entry.commits.insert(commit.id);
        entry.lines += change.lines_changed().unwrap_or(0);
        entry.authors.insert(commit.author.as_str());
        if entry.last_modified.map_or(true, |t| commit.timestamp > t) {
            entry.last_modified = Some(commit.timestamp);
        }
    }

    let thresholds = config.risk_thresholds();
    let mut hotspots: Vec<Hotspot> = stats
        .into_iter()
        .filter_map(|(path, s)| {
            let mut hotspot = Hotspot {
                file_path: path.to_string(),
                change_count: s.commits.len() as u32,
                total_changes: s.lines,
                risk_level: RiskLevel::Low,
                is_hotspot: false,
                last_modified: s.last_modified?,
                authors: s.authors.len() as u32,
            };
            let value = hotspot.metric_value(config.metric);
            hotspot.risk_level = thresholds.classify(value);
            hotspot.is_hotspot = value > config.min_complexity;
            Some(hotspot)
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.total_changes
            .cmp(&a.total_changes)
            .then_with(|| b.change_count.cmp(&a.change_count))
            .then_with(|| a.file_path.cmp(&b.file_path))
    });

    tracing::debug!(
        files = hotspots.len(),
        flagged = hotspots.iter().filter(|h| h.is_hotspot).count(),
        metric = %config.metric,
        "hotspot detection complete"
    );

    hotspots
}

/// Keep only flagged files, preserving rank order.
pub fn flagged(hotspots: Vec<Hotspot>) -> Vec<Hotspot> {
    hotspots.into_iter().filter(|h| h.is_hotspot).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gitrisk_core::RiskThresholds;
    use gitrisk_history::{AnalysisFilter, Change, Commit};

    fn make_commit(id: i64, author: &str, day: u32) -> Commit {
        Commit {
            id,
            hash: format!("hash_{id}"),
            author: author.into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            message: Some("test commit".into()),
        }
    }

    fn make_change(id: i64, commit_id: i64, path: &str, added: u64, deleted: u64) -> Change {
        Change {
            id,
            commit_id,
            file_path: path.into(),
            lines_added: Some(added),
            lines_deleted: Some(deleted),
        }
    }

    fn history(commits: Vec<Commit>, changes: Vec<Change>) -> History {
        History::from_parts(commits, changes, &AnalysisFilter::default()).unwrap()
    }

    /// `n` commits by alice each touching `path` once.
    fn touched_n_times(path: &str, n: i64) -> History {
        let commits = (1..=n).map(|id| make_commit(id, "alice", id as u32)).collect();
        let changes = (1..=n).map(|id| make_change(id, id, path, 1, 0)).collect();
        history(commits, changes)
    }

    #[test]
    fn six_commits_is_a_hotspot() {
        let hotspots = detect_hotspots(&touched_n_times("a.js", 6), &HotspotConfig::default());
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].change_count, 6);
        assert!(hotspots[0].is_hotspot);
        assert_eq!(hotspots[0].risk_level, RiskLevel::Medium);
    }

    #[test]
    fn threshold_value_is_not_a_hotspot() {
        let hotspots = detect_hotspots(&touched_n_times("b.js", 5), &HotspotConfig::default());
        assert_eq!(hotspots[0].change_count, 5);
        assert!(!hotspots[0].is_hotspot);
        assert_eq!(hotspots[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn repeated_touch_in_one_commit_counts_once() {
        let commits = vec![make_commit(1, "alice", 1)];
        let changes = vec![
            make_change(1, 1, "a.js", 10, 2),
            make_change(2, 1, "a.js", 3, 1),
        ];
        let hotspots = detect_hotspots(&history(commits, changes), &HotspotConfig::default());
        assert_eq!(hotspots[0].change_count, 1);
        assert_eq!(hotspots[0].total_changes, 16);
    }

    #[test]
    fn ranking_is_by_total_changes_then_count_then_path() {
        let commits = vec![
            make_commit(1, "alice", 1),
            make_commit(2, "bob", 2),
            make_commit(3, "alice", 3),
        ];
        let changes = vec![
            make_change(1, 1, "big.js", 100, 0),
            make_change(2, 1, "z.js", 5, 5),
            make_change(3, 2, "z.js", 0, 0),
            make_change(4, 3, "a.js", 10, 0),
        ];
        let hotspots = detect_hotspots(&history(commits, changes), &HotspotConfig::default());
        let order: Vec<&str> = hotspots.iter().map(|h| h.file_path.as_str()).collect();
        // z.js and a.js tie on lines; z.js has more commits.
        assert_eq!(order, vec!["big.js", "z.js", "a.js"]);
        assert_eq!(hotspots[1].authors, 2);
    }

    #[test]
    fn equal_rows_sort_by_path() {
        let commits = vec![make_commit(1, "alice", 1)];
        let changes = vec![
            make_change(1, 1, "src/b.js", 1, 0),
            make_change(2, 1, "src/a.js", 1, 0),
        ];
        let hotspots = detect_hotspots(&history(commits, changes), &HotspotConfig::default());
        assert_eq!(hotspots[0].file_path, "src/a.js");
        assert_eq!(hotspots[1].file_path, "src/b.js");
    }

    #[test]
    fn complexity_metric_uses_lines_per_commit() {
        let commits = vec![make_commit(1, "alice", 1), make_commit(2, "alice", 2)];
        let changes = vec![
            make_change(1, 1, "dense.js", 30, 10),
            make_change(2, 2, "dense.js", 20, 0),
        ];
        let config = HotspotConfig {
            metric: ComplexityMetric::Complexity,
            ..HotspotConfig::default()
        };
        let hotspots = detect_hotspots(&history(commits, changes), &config);
        assert_eq!(hotspots[0].metric_value(ComplexityMetric::Complexity), 30.0);
        assert!(hotspots[0].is_hotspot);
        // 30 lines per commit is below the 50-line medium cutoff.
        assert_eq!(hotspots[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn complexity_risk_uses_line_cutoffs() {
        let commits = vec![make_commit(1, "alice", 1), make_commit(2, "bob", 2)];
        let changes = vec![
            make_change(1, 1, "huge.js", 300, 20),
            make_change(2, 2, "huge.js", 90, 10),
            make_change(3, 1, "mid.js", 120, 0),
            make_change(4, 2, "mid.js", 40, 0),
        ];
        let config = HotspotConfig {
            metric: ComplexityMetric::Complexity,
            ..HotspotConfig::default()
        };
        let hotspots = detect_hotspots(&history(commits, changes), &config);
        assert_eq!(hotspots[0].file_path, "huge.js");
        assert_eq!(hotspots[0].risk_level, RiskLevel::Critical);
        assert_eq!(hotspots[1].file_path, "mid.js");
        assert_eq!(hotspots[1].risk_level, RiskLevel::Medium);
    }

    #[test]
    fn explicit_thresholds_override_metric_defaults() {
        let config = HotspotConfig {
            thresholds: Some(RiskThresholds {
                critical: 4.0,
                high: 3.0,
                medium: 2.0,
            }),
            ..HotspotConfig::default()
        };
        let hotspots = detect_hotspots(&touched_n_times("a.js", 5), &config);
        assert_eq!(hotspots[0].risk_level, RiskLevel::Critical);
        assert!(!hotspots[0].is_hotspot);
    }

    #[test]
    fn missing_line_counts_contribute_zero() {
        let commits = vec![make_commit(1, "alice", 1)];
        let changes = vec![Change {
            id: 1,
            commit_id: 1,
            file_path: "a.js".into(),
            lines_added: None,
            lines_deleted: None,
        }];
        let hotspots = detect_hotspots(&history(commits, changes), &HotspotConfig::default());
        assert_eq!(hotspots[0].total_changes, 0);
        assert_eq!(hotspots[0].metric_value(ComplexityMetric::Complexity), 0.0);
    }

    #[test]
    fn last_modified_is_latest_touch() {
        let commits = vec![make_commit(1, "alice", 1), make_commit(2, "bob", 9)];
        let changes = vec![make_change(1, 1, "a.js", 1, 0), make_change(2, 2, "a.js", 1, 0)];
        let hotspots = detect_hotspots(&history(commits, changes), &HotspotConfig::default());
        assert_eq!(
            hotspots[0].last_modified,
            Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn empty_history_yields_empty_ranking() {
        let hotspots = detect_hotspots(&History::default(), &HotspotConfig::default());
        assert!(hotspots.is_empty());
    }

    #[test]
    fn flagged_keeps_only_hotspots() {
        let commits = (1..=6).map(|id| make_commit(id, "alice", id as u32)).collect();
        let mut changes: Vec<Change> = (1..=6)
            .map(|id| make_change(id, id, "hot.js", 1, 0))
            .collect();
        changes.push(make_change(7, 1, "cold.js", 1, 0));
        let hotspots = detect_hotspots(&history(commits, changes), &HotspotConfig::default());
        assert_eq!(hotspots.len(), 2);
        let hot = flagged(hotspots);
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].file_path, "hot.js");
    }
}
