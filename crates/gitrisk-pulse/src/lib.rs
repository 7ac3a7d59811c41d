//! Repository-history analytics: hotspots, temporal coupling, and ownership.
//!
//! Each analyzer is a pure, single-pass function over a filtered
//! [`History`](gitrisk_history::History) and may run concurrently with the
//! others. The overview composes their outputs into a dashboard summary.

use gitrisk_core::{RiskFilter, RiskLevel};

pub mod coupling;
pub mod hotspots;
pub mod overview;
pub mod ownership;

/// A result row carrying a risk classification.
pub trait Classified {
    fn risk_level(&self) -> RiskLevel;
}

/// Keep only rows whose risk level passes `filter`, preserving order.
pub fn filter_by_risk<T: Classified>(rows: Vec<T>, filter: RiskFilter) -> Vec<T> {
    rows.into_iter()
        .filter(|row| filter.matches(row.risk_level()))
        .collect()
}
