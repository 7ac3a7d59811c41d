//! Property-based tests for the analyzers.

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use gitrisk_core::{CouplingConfig, HotspotConfig, RiskThresholds};
use gitrisk_history::{AnalysisFilter, Change, Commit, History};
use gitrisk_pulse::coupling::detect_coupling;
use gitrisk_pulse::hotspots::detect_hotspots;
use gitrisk_pulse::ownership::{analyze_ownership, bus_factor};
use proptest::prelude::*;

const AUTHORS: [&str; 4] = ["alice", "bob", "carol", "dave"];
const FILES: [&str; 6] = [
    "src/a.rs",
    "src/b.rs",
    "src/c.rs",
    "lib/d.rs",
    "lib/e.rs",
    "README.md",
];

/// Per commit: author index and (file index, optional lines) touches.
type RawCommit = (usize, Vec<(usize, Option<u64>)>);

fn build(raw: &[RawCommit], reverse_files: bool) -> History {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut commits = Vec::new();
    let mut changes = Vec::new();
    for (idx, (author, touches)) in raw.iter().enumerate() {
        let id = idx as i64 + 1;
        commits.push(Commit {
            id,
            hash: format!("{id:08x}"),
            author: AUTHORS[*author].into(),
            timestamp: base + Duration::days(id * 3),
            message: None,
        });
        let mut touches = touches.clone();
        if reverse_files {
            touches.reverse();
        }
        for (file, lines) in touches {
            changes.push(Change {
                id: changes.len() as i64 + 1,
                commit_id: id,
                file_path: FILES[file].into(),
                lines_added: lines,
                lines_deleted: lines.map(|l| l / 2),
            });
        }
    }
    History::from_parts(commits, changes, &AnalysisFilter::default()).unwrap()
}

fn arb_commits() -> impl Strategy<Value = Vec<RawCommit>> {
    prop::collection::vec(
        (
            0..AUTHORS.len(),
            prop::collection::vec((0..FILES.len(), prop::option::of(0u64..60)), 1..5),
        ),
        0..30,
    )
}

// ── ownership properties ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn author_percentages_sum_to_one_hundred(raw in arb_commits()) {
        let summary = analyze_ownership(&build(&raw, false), &RiskThresholds::ownership());
        for file in &summary.files {
            prop_assert!(file.total_contributors >= 1);
            let sum: f64 = file.authors.iter().map(|a| a.percentage).sum();
            let tolerance = 0.01 * file.authors.len() as f64 + 1e-9;
            prop_assert!(
                (sum - 100.0).abs() <= tolerance,
                "{}: percentages sum to {}", file.file_path, sum
            );
        }
    }

    #[test]
    fn file_bus_factor_within_contributor_count(raw in arb_commits()) {
        let summary = analyze_ownership(&build(&raw, false), &RiskThresholds::ownership());
        for file in &summary.files {
            prop_assert!(file.bus_factor >= 1);
            prop_assert!(file.bus_factor <= file.total_contributors);
        }
    }

    #[test]
    fn bus_factor_bounds_hold_for_any_split(
        weights in prop::collection::vec(1u32..100, 1..8)
    ) {
        let total: u32 = weights.iter().sum();
        let shares: Vec<f64> = weights
            .iter()
            .map(|w| f64::from(*w) / f64::from(total) * 100.0)
            .collect();
        let factor = bus_factor(&shares);
        prop_assert!(factor >= 1);
        prop_assert!(factor as usize <= shares.len());

        let top = shares.iter().copied().fold(0.0, f64::max);
        if top > 75.0 && shares.len() < 3 {
            prop_assert_eq!(factor, 1);
        }
    }
}

// ── coupling properties ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn coupling_scores_are_bounded(raw in arb_commits()) {
        let config = CouplingConfig { min_shared_commits: 1, ..CouplingConfig::default() };
        let report = detect_coupling(&build(&raw, false), &config);
        for pair in &report.pairs {
            prop_assert!((0.0..=1.0).contains(&pair.coupling_score));
            prop_assert!(pair.shared_commits <= pair.total_commits_a.min(pair.total_commits_b));
        }
    }

    #[test]
    fn each_unordered_pair_appears_once(raw in arb_commits()) {
        let config = CouplingConfig { min_shared_commits: 1, ..CouplingConfig::default() };
        let report = detect_coupling(&build(&raw, false), &config);
        let mut seen = HashSet::new();
        for pair in &report.pairs {
            prop_assert!(pair.file_a < pair.file_b, "self or unordered pair: {:?}", pair);
            prop_assert!(seen.insert((pair.file_a.clone(), pair.file_b.clone())));
        }
    }

    #[test]
    fn coupling_ignores_file_order_within_commits(raw in arb_commits()) {
        let config = CouplingConfig { min_shared_commits: 1, ..CouplingConfig::default() };
        let forward = detect_coupling(&build(&raw, false), &config);
        let reversed = detect_coupling(&build(&raw, true), &config);
        prop_assert_eq!(forward.pairs, reversed.pairs);
    }

    #[test]
    fn output_never_exceeds_max_pairs(raw in arb_commits(), max_pairs in 0usize..6) {
        let config = CouplingConfig {
            min_shared_commits: 1,
            max_pairs,
            ..CouplingConfig::default()
        };
        let report = detect_coupling(&build(&raw, false), &config);
        prop_assert!(report.pairs.len() <= max_pairs);
        prop_assert!(report.pairs_matched >= report.pairs.len());
    }
}

// ── threshold properties ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn raising_hotspot_threshold_never_flags_more(
        raw in arb_commits(),
        low in 0.0f64..10.0,
        bump in 0.0f64..10.0,
    ) {
        let history = build(&raw, false);
        let flagged = |min: f64| {
            let config = HotspotConfig { min_complexity: min, ..HotspotConfig::default() };
            detect_hotspots(&history, &config).iter().filter(|h| h.is_hotspot).count()
        };
        prop_assert!(flagged(low + bump) <= flagged(low));
    }

    #[test]
    fn classification_is_monotonic(a in 0.0f64..120.0, b in 0.0f64..120.0) {
        let thresholds = RiskThresholds::ownership();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(thresholds.classify(lo) <= thresholds.classify(hi));
    }
}
