//! Knowledge ownership and bus factor analysis.
//!
//! Measures how concentrated each file's authorship is, classifies the
//! primary owner's share, and estimates how many people hold the majority
//! of a file's knowledge.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use gitrisk_core::{round_to, RiskLevel, RiskThresholds};
use gitrisk_history::{CommitId, History};
use serde::{Deserialize, Serialize};

use crate::Classified;

/// A primary owner above this share with a small team means bus factor 1.
const DOMINANT_SHARE: f64 = 75.0;

/// Teams smaller than this are subject to the dominant-owner rule.
const SMALL_TEAM: usize = 3;

/// Cumulative share the bus-factor authors must hold.
const KNOWLEDGE_SHARE: f64 = 60.0;

/// An author holding more than this share counts as knowing the file.
const SIGNIFICANT_SHARE: f64 = 10.0;

/// What an author's contribution counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionBasis {
    /// Lines added plus deleted.
    Lines,
    /// Distinct commits, used when the store has no line counts.
    Commits,
}

/// Ownership metrics for a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOwnership {
    /// File path relative to repo root.
    pub file_path: String,
    /// Author with the largest share, `None` only for an untouched file.
    pub primary_owner: Option<String>,
    /// Primary owner's share, in percent.
    pub ownership_percentage: f64,
    pub total_contributors: u32,
    /// Per-author breakdown, largest share first.
    pub authors: Vec<AuthorContribution>,
    pub risk_level: RiskLevel,
    pub last_modified: Option<DateTime<Utc>>,
    pub bus_factor: u32,
    pub basis: ContributionBasis,
}

impl Classified for FileOwnership {
    fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }
}

/// Per-author contribution to a file.
///
/// # Examples
///
/// ```
/// use gitrisk_pulse::ownership::AuthorContribution;
///
/// let contrib = AuthorContribution {
///     name: "alice".into(),
///     contribution: 120,
///     percentage: 75.0,
/// };
/// assert!(contrib.percentage > 50.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorContribution {
    pub name: String,
    /// Lines changed or commits, per the file's [`ContributionBasis`].
    pub contribution: u64,
    /// Share of the file's total contribution, in percent.
    pub percentage: f64,
}

/// One author's touch of a file.
#[derive(Debug, Clone, Copy)]
pub struct Touch<'a> {
    pub author: &'a str,
    pub commit_id: CommitId,
    pub timestamp: DateTime<Utc>,
    /// Lines changed by this touch, if the store recorded them.
    pub lines: Option<u64>,
}

/// Summary of knowledge distribution across the project.
///
/// # Examples
///
/// ```
/// use gitrisk_pulse::ownership::OwnershipSummary;
///
/// let summary = OwnershipSummary::default();
/// assert_eq!(summary.total_files, 0);
/// assert_eq!(summary.project_bus_factor, 0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipSummary {
    pub total_files: usize,
    /// Files with only one author.
    pub single_author_files: usize,
    /// Files at critical ownership risk.
    pub knowledge_silos: usize,
    /// Top authors whose departure orphans more than half the files.
    pub project_bus_factor: u32,
    /// Per-file ownership, most concentrated first.
    pub files: Vec<FileOwnership>,
}

/// Estimate the bus factor from per-author shares in percent.
///
/// A dominant owner (above 75%) on a team of fewer than three yields 1.
/// Otherwise the result is the smallest number of top authors whose
/// cumulative share reaches 60%. No authors yields 0.
///
/// # Examples
///
/// ```
/// use gitrisk_pulse::ownership::bus_factor;
///
/// assert_eq!(bus_factor(&[]), 0);
/// assert_eq!(bus_factor(&[80.0, 20.0]), 1);
/// assert_eq!(bus_factor(&[40.0, 30.0, 30.0]), 2);
/// assert_eq!(bus_factor(&[20.0; 5]), 3);
/// ```
pub fn bus_factor(percentages: &[f64]) -> u32 {
    let mut sorted = percentages.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let Some(&top) = sorted.first() else {
        return 0;
    };
    if top > DOMINANT_SHARE && sorted.len() < SMALL_TEAM {
        return 1;
    }

    let mut cumulative = 0.0;
    for (idx, share) in sorted.iter().enumerate() {
        cumulative += share;
        // Tolerate float drift on shares like 3 x 20%.
        if cumulative >= KNOWLEDGE_SHARE - 1e-9 {
            return idx as u32 + 1;
        }
    }
    sorted.len() as u32
}

#[derive(Default)]
struct AuthorTally {
    lines: u64,
    commits: HashSet<CommitId>,
    latest: Option<DateTime<Utc>>,
}

/// Compute ownership for one file from every touch of it.
///
/// Contribution is lines changed when every touch carries a line count and
/// the total is non-zero, and distinct commits otherwise. The primary owner
/// is the largest contributor; ties go to the most recent contribution, then
/// to the name.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitrisk_core::{RiskLevel, RiskThresholds};
/// use gitrisk_pulse::ownership::{file_ownership, Touch};
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let touches = [
///     Touch { author: "alice", commit_id: 1, timestamp: at, lines: Some(95) },
///     Touch { author: "bob", commit_id: 2, timestamp: at, lines: Some(5) },
/// ];
/// let file = file_ownership("src/auth.js", &touches, &RiskThresholds::ownership());
/// assert_eq!(file.primary_owner.as_deref(), Some("alice"));
/// assert_eq!(file.ownership_percentage, 95.0);
/// assert_eq!(file.risk_level, RiskLevel::Critical);
/// assert_eq!(file.bus_factor, 1);
/// ```
pub fn file_ownership(
    path: &str,
    touches: &[Touch<'_>],
    thresholds: &RiskThresholds,
) -> FileOwnership {
    let mut tallies: BTreeMap<&str, AuthorTally> = BTreeMap::new();
    for touch in touches {
        let tally = tallies.entry(touch.author).or_default();
        tally.lines += touch.lines.unwrap_or(0);
        tally.commits.insert(touch.commit_id);
        if tally.latest.map_or(true, |t| touch.timestamp > t) {
            tally.latest = Some(touch.timestamp);
        }
    }

    // One touch without size data makes line totals incomparable.
    let sized = touches.iter().all(|t| t.lines.is_some());
    let basis = if sized && tallies.values().any(|t| t.lines > 0) {
        ContributionBasis::Lines
    } else {
        ContributionBasis::Commits
    };

    let mut ranked: Vec<(&str, u64, Option<DateTime<Utc>>)> = tallies
        .iter()
        .map(|(name, tally)| {
            let contribution = match basis {
                ContributionBasis::Lines => tally.lines,
                ContributionBasis::Commits => tally.commits.len() as u64,
            };
            (*name, contribution, tally.latest)
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(b.0))
    });

    let total: u64 = ranked.iter().map(|(_, c, _)| c).sum();
    let shares: Vec<f64> = ranked
        .iter()
        .map(|(_, c, _)| {
            if total == 0 {
                0.0
            } else {
                *c as f64 / total as f64 * 100.0
            }
        })
        .collect();

    let authors: Vec<AuthorContribution> = ranked
        .iter()
        .zip(&shares)
        .map(|((name, contribution, _), share)| AuthorContribution {
            name: (*name).to_string(),
            contribution: *contribution,
            percentage: round_to(*share, 2),
        })
        .collect();

    let top_share = shares.first().copied().unwrap_or(0.0);

    FileOwnership {
        file_path: path.to_string(),
        primary_owner: authors.first().map(|a| a.name.clone()),
        ownership_percentage: round_to(top_share, 2),
        total_contributors: authors.len() as u32,
        risk_level: thresholds.classify(top_share),
        last_modified: touches.iter().map(|t| t.timestamp).max(),
        bus_factor: bus_factor(&shares),
        basis,
        authors,
    }
}

/// Analyze ownership for every file in `history`.
///
/// # Examples
///
/// ```
/// use gitrisk_core::RiskThresholds;
/// use gitrisk_history::History;
/// use gitrisk_pulse::ownership::analyze_ownership;
///
/// let summary = analyze_ownership(&History::default(), &RiskThresholds::ownership());
/// assert!(summary.files.is_empty());
/// ```
pub fn analyze_ownership(history: &History, thresholds: &RiskThresholds) -> OwnershipSummary {
    let mut files: Vec<FileOwnership> = history
        .changes_by_file()
        .into_iter()
        .map(|(path, changes)| {
            let touches: Vec<Touch<'_>> = changes
                .iter()
                .filter_map(|change| {
                    let commit = history.commit(change.commit_id)?;
                    Some(Touch {
                        author: commit.author.as_str(),
                        commit_id: commit.id,
                        timestamp: commit.timestamp,
                        lines: change.lines_changed(),
                    })
                })
                .collect();
            file_ownership(path, &touches, thresholds)
        })
        .collect();

    files.sort_by(|a, b| {
        b.ownership_percentage
            .total_cmp(&a.ownership_percentage)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });

    let single_author_files = files.iter().filter(|f| f.total_contributors == 1).count();
    let knowledge_silos = files
        .iter()
        .filter(|f| f.risk_level == RiskLevel::Critical)
        .count();
    let project_bus_factor = compute_project_bus_factor(&files);

    tracing::debug!(
        files = files.len(),
        single_author_files,
        knowledge_silos,
        project_bus_factor,
        "ownership analysis complete"
    );

    OwnershipSummary {
        total_files: files.len(),
        single_author_files,
        knowledge_silos,
        project_bus_factor,
        files,
    }
}

/// Remove top authors, most widely contributing first, until more than
/// half the files have no remaining significant author.
fn compute_project_bus_factor(files: &[FileOwnership]) -> u32 {
    if files.is_empty() {
        return 0;
    }

    let mut reach: HashMap<&str, u32> = HashMap::new();
    for file in files {
        for author in &file.authors {
            *reach.entry(author.name.as_str()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, u32)> = reach.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let threshold = files.len() / 2;
    let mut removed: HashSet<&str> = HashSet::new();

    for &(name, _) in &ranked {
        removed.insert(name);

        let orphaned = files
            .iter()
            .filter(|file| {
                !file
                    .authors
                    .iter()
                    .any(|a| a.percentage > SIGNIFICANT_SHARE && !removed.contains(a.name.as_str()))
            })
            .count();

        if orphaned > threshold {
            return removed.len() as u32;
        }
    }

    removed.len() as u32
}
