use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GitriskError;

/// Categorical risk classification shared by every analyzer.
///
/// Variants are ordered from least to most severe, so `Critical > Low`.
///
/// # Examples
///
/// ```
/// use gitrisk_core::RiskLevel;
///
/// assert!(RiskLevel::Critical > RiskLevel::High);
/// assert_eq!(RiskLevel::Medium.to_string(), "medium");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// Boundaries for the canonical risk classifier.
///
/// The same struct serves percentage-based ownership risk and count-based
/// hotspot risk; only the numbers differ. Every boundary is strict: a value
/// equal to `high` is classified one level below `High`.
///
/// # Examples
///
/// ```
/// use gitrisk_core::{RiskLevel, RiskThresholds};
///
/// let t = RiskThresholds::ownership();
/// assert_eq!(t.classify(95.0), RiskLevel::Critical);
/// assert_eq!(t.classify(90.0), RiskLevel::High);
/// assert_eq!(t.classify(55.0), RiskLevel::Medium);
/// assert_eq!(t.classify(40.0), RiskLevel::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl RiskThresholds {
    /// Ownership concentration cutoffs, in percent (90 / 70 / 40).
    pub fn ownership() -> Self {
        Self {
            critical: 90.0,
            high: 70.0,
            medium: 40.0,
        }
    }

    /// Change-frequency cutoffs, in distinct commits (20 / 10 / 5).
    pub fn change_frequency() -> Self {
        Self {
            critical: 20.0,
            high: 10.0,
            medium: 5.0,
        }
    }

    /// Lines-changed-per-commit cutoffs for the complexity proxy (200 / 100 / 50).
    pub fn complexity() -> Self {
        Self {
            critical: 200.0,
            high: 100.0,
            medium: 50.0,
        }
    }

    /// Default cutoffs for a hotspot metric.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitrisk_core::{ComplexityMetric, RiskThresholds};
    ///
    /// let t = RiskThresholds::for_metric(ComplexityMetric::Complexity);
    /// assert_eq!(t, RiskThresholds::complexity());
    /// ```
    pub fn for_metric(metric: ComplexityMetric) -> Self {
        match metric {
            ComplexityMetric::ChangeCount => Self::change_frequency(),
            ComplexityMetric::Complexity => Self::complexity(),
        }
    }

    /// Classify `value` against these boundaries.
    pub fn classify(&self, value: f64) -> RiskLevel {
        if value > self.critical {
            RiskLevel::Critical
        } else if value > self.high {
            RiskLevel::High
        } else if value > self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Reject boundaries that are not strictly descending.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Config`] when `critical > high > medium` does
    /// not hold or a boundary is not finite.
    pub fn validate(&self) -> Result<(), GitriskError> {
        let finite = [self.critical, self.high, self.medium]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.critical <= self.high || self.high <= self.medium {
            return Err(GitriskError::Config(format!(
                "risk thresholds must satisfy critical > high > medium (got {} / {} / {})",
                self.critical, self.high, self.medium
            )));
        }
        Ok(())
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self::ownership()
    }
}

/// Caller-side risk filter: `all` or a single level.
///
/// # Examples
///
/// ```
/// use gitrisk_core::{RiskFilter, RiskLevel};
///
/// let filter: RiskFilter = "high".parse().unwrap();
/// assert!(filter.matches(RiskLevel::High));
/// assert!(!filter.matches(RiskLevel::Low));
/// assert!(RiskFilter::All.matches(RiskLevel::Low));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskFilter {
    pub fn matches(&self, level: RiskLevel) -> bool {
        match self {
            RiskFilter::All => true,
            RiskFilter::Low => level == RiskLevel::Low,
            RiskFilter::Medium => level == RiskLevel::Medium,
            RiskFilter::High => level == RiskLevel::High,
            RiskFilter::Critical => level == RiskLevel::Critical,
        }
    }
}

impl FromStr for RiskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(RiskFilter::All),
            other => other.parse::<RiskLevel>().map(|level| match level {
                RiskLevel::Low => RiskFilter::Low,
                RiskLevel::Medium => RiskFilter::Medium,
                RiskLevel::High => RiskFilter::High,
                RiskLevel::Critical => RiskFilter::Critical,
            }),
        }
    }
}

impl fmt::Display for RiskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFilter::All => write!(f, "all"),
            RiskFilter::Low => write!(f, "low"),
            RiskFilter::Medium => write!(f, "medium"),
            RiskFilter::High => write!(f, "high"),
            RiskFilter::Critical => write!(f, "critical"),
        }
    }
}

/// Signal used to decide whether a file is a hotspot.
///
/// # Examples
///
/// ```
/// use gitrisk_core::ComplexityMetric;
///
/// let metric: ComplexityMetric = "complexity".parse().unwrap();
/// assert_eq!(metric, ComplexityMetric::Complexity);
/// assert_eq!(ComplexityMetric::default(), ComplexityMetric::ChangeCount);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityMetric {
    /// Distinct commits touching the file.
    #[default]
    ChangeCount,
    /// Lines changed per distinct commit, a history-only complexity proxy.
    Complexity,
}

impl fmt::Display for ComplexityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityMetric::ChangeCount => write!(f, "change_count"),
            ComplexityMetric::Complexity => write!(f, "complexity"),
        }
    }
}

impl FromStr for ComplexityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "change_count" | "changes" => Ok(ComplexityMetric::ChangeCount),
            "complexity" => Ok(ComplexityMetric::Complexity),
            other => Err(format!("unknown complexity metric: {other}")),
        }
    }
}

/// 1-based page request.
///
/// # Examples
///
/// ```
/// use gitrisk_core::Pagination;
///
/// let page = Pagination { page: 2, page_size: 2 }.apply(vec![1, 2, 3, 4, 5]).unwrap();
/// assert_eq!(page.items, vec![3, 4]);
/// assert_eq!(page.total, 5);
/// assert_eq!(page.total_pages, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl Pagination {
    /// # Errors
    ///
    /// Returns [`GitriskError::InvalidFilter`] when `page` or `page_size` is zero.
    pub fn validate(&self) -> Result<(), GitriskError> {
        if self.page == 0 {
            return Err(GitriskError::InvalidFilter("page must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(GitriskError::InvalidFilter(
                "page size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Slice `items` down to the requested page.
    ///
    /// A page past the end yields an empty `items` list, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::InvalidFilter`] if the request is invalid.
    pub fn apply<T>(&self, items: Vec<T>) -> Result<Page<T>, GitriskError> {
        self.validate()?;
        let total = items.len();
        let total_pages = total.div_ceil(self.page_size);
        let start = (self.page - 1).saturating_mul(self.page_size);
        let items: Vec<T> = items
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect();
        Ok(Page {
            items,
            total,
            page: self.page,
            page_size: self.page_size,
            total_pages,
        })
    }
}

/// One page of an analyzer result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Row count before slicing.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Output format for rendered results.
///
/// # Examples
///
/// ```
/// use gitrisk_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Round `value` to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
