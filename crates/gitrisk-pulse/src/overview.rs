//! Dashboard summary composed from the other analyzers.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use gitrisk_core::{round_to, GitriskConfig, OverviewConfig, RiskLevel};
use gitrisk_history::History;
use serde::{Deserialize, Serialize};

use crate::coupling::{detect_coupling, CouplingReport};
use crate::hotspots::{detect_hotspots, Hotspot};
use crate::ownership::{analyze_ownership, OwnershipSummary};

/// Weight of hotspot density in the monthly debt score.
const HOTSPOT_WEIGHT: f64 = 0.6;

/// Weight of coupling density in the monthly debt score.
const COUPLING_WEIGHT: f64 = 0.4;

/// One calendar month of the technical debt trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM`.
    pub month: String,
    /// 0 to 100; share of that month's touched files that are hotspots or coupled.
    pub score: f64,
    pub commits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisState {
    Complete,
    /// The scoped history has no commits.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatus {
    pub status: AnalysisState,
    pub last_analyzed: DateTime<Utc>,
    pub files_scanned: usize,
}

/// Project-wide totals and trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_files: usize,
    pub total_commits: usize,
    pub total_contributors: usize,
    /// Net lines added minus deleted, floored at zero per file.
    pub lines_of_code: u64,
    /// Files flagged by the hotspot detector.
    pub hotspot_count: usize,
    /// Coupled pairs reported after filtering and truncation.
    pub coupled_pairs: usize,
    /// Files at high or critical ownership risk.
    pub high_risk_files: usize,
    pub project_bus_factor: u32,
    /// Most recent months with activity, oldest first.
    pub technical_debt_trend: Vec<TrendPoint>,
    pub analysis_status: AnalysisStatus,
}

/// Combine analyzer outputs with raw totals from `history`.
///
/// `now` is stamped as the analysis time.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use gitrisk_core::OverviewConfig;
/// use gitrisk_history::History;
/// use gitrisk_pulse::coupling::CouplingReport;
/// use gitrisk_pulse::overview::{compose_overview, AnalysisState};
/// use gitrisk_pulse::ownership::OwnershipSummary;
///
/// let overview = compose_overview(
///     &History::default(),
///     &[],
///     &OwnershipSummary::default(),
///     &CouplingReport::default(),
///     &OverviewConfig::default(),
///     Utc::now(),
/// );
/// assert_eq!(overview.total_commits, 0);
/// assert_eq!(overview.analysis_status.status, AnalysisState::Empty);
/// assert!(overview.technical_debt_trend.is_empty());
/// ```
pub fn compose_overview(
    history: &History,
    hotspots: &[Hotspot],
    ownership: &OwnershipSummary,
    coupling: &CouplingReport,
    config: &OverviewConfig,
    now: DateTime<Utc>,
) -> Overview {
    let hot: HashSet<&str> = hotspots
        .iter()
        .filter(|h| h.is_hotspot)
        .map(|h| h.file_path.as_str())
        .collect();
    let coupled: HashSet<&str> = coupling
        .pairs
        .iter()
        .flat_map(|p| [p.file_a.as_str(), p.file_b.as_str()])
        .collect();

    let total_files = history.file_count();
    let status = if history.is_empty() {
        AnalysisState::Empty
    } else {
        AnalysisState::Complete
    };

    Overview {
        total_files,
        total_commits: history.commits().len(),
        total_contributors: history.contributor_count(),
        lines_of_code: lines_of_code(history),
        hotspot_count: hot.len(),
        coupled_pairs: coupling.pairs.len(),
        high_risk_files: ownership
            .files
            .iter()
            .filter(|f| f.risk_level >= RiskLevel::High)
            .count(),
        project_bus_factor: ownership.project_bus_factor,
        technical_debt_trend: debt_trend(history, &hot, &coupled, config.trend_months),
        analysis_status: AnalysisStatus {
            status,
            last_analyzed: now,
            files_scanned: total_files,
        },
    }
}

/// Run every analyzer over `history` and compose the overview.
pub fn build_overview(history: &History, config: &GitriskConfig, now: DateTime<Utc>) -> Overview {
    let hotspots = detect_hotspots(history, &config.hotspots);
    let ownership = analyze_ownership(history, &config.ownership);
    let coupling = detect_coupling(history, &config.coupling);
    compose_overview(
        history,
        &hotspots,
        &ownership,
        &coupling,
        &config.overview,
        now,
    )
}

/// Estimated current size: net lines per file, never below zero.
fn lines_of_code(history: &History) -> u64 {
    let mut net: HashMap<&str, i64> = HashMap::new();
    for change in history.changes() {
        let added = change.lines_added.unwrap_or(0) as i64;
        let deleted = change.lines_deleted.unwrap_or(0) as i64;
        *net.entry(change.file_path.as_str()).or_default() += added - deleted;
    }
    net.values().map(|&n| n.max(0) as u64).sum()
}

#[derive(Default)]
struct MonthBucket<'a> {
    commits: usize,
    files: BTreeSet<&'a str>,
}

fn debt_trend(
    history: &History,
    hot: &HashSet<&str>,
    coupled: &HashSet<&str>,
    months: usize,
) -> Vec<TrendPoint> {
    let files_by_commit = history.files_by_commit();
    let mut buckets: BTreeMap<(i32, u32), MonthBucket<'_>> = BTreeMap::new();

    for commit in history.commits() {
        let bucket = buckets
            .entry((commit.timestamp.year(), commit.timestamp.month()))
            .or_default();
        bucket.commits += 1;
        if let Some(files) = files_by_commit.get(&commit.id) {
            bucket.files.extend(files.iter().copied());
        }
    }

    let skip = buckets.len().saturating_sub(months);
    buckets
        .into_iter()
        .skip(skip)
        .map(|((year, month), bucket)| {
            let touched = bucket.files.len();
            let score = if touched == 0 {
                0.0
            } else {
                let hot_share = bucket.files.iter().filter(|f| hot.contains(*f)).count() as f64
                    / touched as f64;
                let coupled_share = bucket.files.iter().filter(|f| coupled.contains(*f)).count()
                    as f64
                    / touched as f64;
                round_to(
                    100.0 * (HOTSPOT_WEIGHT * hot_share + COUPLING_WEIGHT * coupled_share),
                    1,
                )
            };
            TrendPoint {
                month: format!("{year:04}-{month:02}"),
                score,
                commits: bucket.commits,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gitrisk_history::{AnalysisFilter, Change, Commit};

    fn commit(id: i64, author: &str, year: i32, month: u32) -> Commit {
        Commit {
            id,
            hash: format!("h{id}"),
            author: author.into(),
            timestamp: Utc.with_ymd_and_hms(year, month, 10, 8, 0, 0).unwrap(),
            message: None,
        }
    }

    fn change(id: i64, commit_id: i64, path: &str, added: u64, deleted: u64) -> Change {
        Change {
            id,
            commit_id,
            file_path: path.into(),
            lines_added: Some(added),
            lines_deleted: Some(deleted),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_history_is_all_zero() {
        let overview = build_overview(&History::default(), &GitriskConfig::default(), now());
        assert_eq!(overview.total_files, 0);
        assert_eq!(overview.total_commits, 0);
        assert_eq!(overview.total_contributors, 0);
        assert_eq!(overview.lines_of_code, 0);
        assert_eq!(overview.hotspot_count, 0);
        assert_eq!(overview.coupled_pairs, 0);
        assert_eq!(overview.high_risk_files, 0);
        assert_eq!(overview.analysis_status.status, AnalysisState::Empty);
        assert_eq!(overview.analysis_status.last_analyzed, now());
    }

    #[test]
    fn lines_of_code_nets_and_floors_per_file() {
        let commits = vec![commit(1, "alice", 2024, 1), commit(2, "bob", 2024, 2)];
        let changes = vec![
            change(1, 1, "a.js", 100, 0),
            change(2, 2, "a.js", 10, 30),
            change(3, 2, "gone.js", 0, 50),
        ];
        let history = History::from_parts(commits, changes, &AnalysisFilter::default()).unwrap();
        let overview = build_overview(&history, &GitriskConfig::default(), now());
        assert_eq!(overview.lines_of_code, 80);
        assert_eq!(overview.total_files, 2);
        assert_eq!(overview.total_contributors, 2);
        assert_eq!(overview.analysis_status.status, AnalysisState::Complete);
        assert_eq!(overview.analysis_status.files_scanned, 2);
    }

    #[test]
    fn trend_scores_hotspot_and_coupling_density() {
        // hot.js is touched in 6 commits, so it is the only hotspot.
        let mut commits = Vec::new();
        let mut changes = Vec::new();
        for id in 1..=6 {
            commits.push(commit(id, "alice", 2024, 3));
            changes.push(change(id, id, "hot.js", 1, 0));
        }
        commits.push(commit(7, "bob", 2024, 4));
        changes.push(change(7, 7, "cold.js", 1, 0));
        let history = History::from_parts(commits, changes, &AnalysisFilter::default()).unwrap();

        let overview = build_overview(&history, &GitriskConfig::default(), now());
        assert_eq!(overview.hotspot_count, 1);
        let trend: Vec<(&str, f64)> = overview
            .technical_debt_trend
            .iter()
            .map(|p| (p.month.as_str(), p.score))
            .collect();
        assert_eq!(trend, vec![("2024-03", 60.0), ("2024-04", 0.0)]);
        assert_eq!(overview.technical_debt_trend[0].commits, 6);
    }

    #[test]
    fn trend_keeps_most_recent_months_without_gap_filling() {
        let commits = vec![
            commit(1, "alice", 2023, 11),
            commit(2, "alice", 2024, 1),
            commit(3, "alice", 2024, 5),
        ];
        let changes = vec![
            change(1, 1, "a.js", 1, 0),
            change(2, 2, "a.js", 1, 0),
            change(3, 3, "a.js", 1, 0),
        ];
        let history = History::from_parts(commits, changes, &AnalysisFilter::default()).unwrap();
        let config = GitriskConfig {
            overview: OverviewConfig { trend_months: 2 },
            ..GitriskConfig::default()
        };
        let overview = build_overview(&history, &config, now());
        let months: Vec<&str> = overview
            .technical_debt_trend
            .iter()
            .map(|p| p.month.as_str())
            .collect();
        assert_eq!(months, vec!["2024-01", "2024-05"]);
    }

    #[test]
    fn high_risk_counts_high_and_critical_owners() {
        let commits = vec![
            commit(1, "alice", 2024, 1),
            commit(2, "alice", 2024, 1),
            commit(3, "bob", 2024, 1),
        ];
        let changes = vec![
            change(1, 1, "solo.js", 5, 0),
            change(2, 2, "shared.js", 5, 0),
            change(3, 3, "shared.js", 5, 0),
        ];
        let history = History::from_parts(commits, changes, &AnalysisFilter::default()).unwrap();
        let overview = build_overview(&history, &GitriskConfig::default(), now());
        // solo.js is 100% alice, shared.js is split evenly.
        assert_eq!(overview.high_risk_files, 1);
    }

    #[test]
    fn serializes_contract_field_names() {
        let overview = build_overview(&History::default(), &GitriskConfig::default(), now());
        let json = serde_json::to_value(&overview).unwrap();
        assert!(json["technicalDebtTrend"].is_array());
        assert_eq!(json["analysisStatus"]["status"], "empty");
        assert!(json["analysisStatus"].get("lastAnalyzed").is_some());
        assert_eq!(json["analysisStatus"]["filesScanned"], 0);
        assert_eq!(json["totalFiles"], 0);
        assert_eq!(json["linesOfCode"], 0);
    }
}
