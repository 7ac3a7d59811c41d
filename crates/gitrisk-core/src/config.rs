use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GitriskError;
use crate::types::{ComplexityMetric, RiskThresholds};

/// Top-level configuration loaded from `.gitrisk.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use gitrisk_core::GitriskConfig;
///
/// let config = GitriskConfig::default();
/// assert_eq!(config.coupling.min_shared_commits, 2);
/// assert_eq!(config.ownership.critical, 90.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitriskConfig {
    /// Ownership concentration cutoffs, in percent.
    #[serde(default = "RiskThresholds::ownership")]
    pub ownership: RiskThresholds,
    /// Hotspot detection settings.
    #[serde(default)]
    pub hotspots: HotspotConfig,
    /// Temporal coupling settings.
    #[serde(default)]
    pub coupling: CouplingConfig,
    /// Dashboard summary settings.
    #[serde(default)]
    pub overview: OverviewConfig,
}

impl GitriskConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Io`] if the file cannot be read,
    /// [`GitriskError::Toml`] if the content is not valid TOML, or
    /// [`GitriskError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gitrisk_core::GitriskConfig;
    /// use std::path::Path;
    ///
    /// let config = GitriskConfig::from_file(Path::new(".gitrisk.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, GitriskError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Toml`] if parsing fails, or
    /// [`GitriskError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitrisk_core::GitriskConfig;
    ///
    /// let toml = r#"
    /// [coupling]
    /// min_shared_commits = 3
    /// "#;
    /// let config = GitriskConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.coupling.min_shared_commits, 3);
    /// assert_eq!(config.coupling.max_pairs, 200);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, GitriskError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`GitriskError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), GitriskError> {
        self.ownership.validate()?;
        if let Some(thresholds) = &self.hotspots.thresholds {
            thresholds.validate()?;
        }
        if !(0.0..=1.0).contains(&self.coupling.min_coupling_score) {
            return Err(GitriskError::Config(format!(
                "coupling.min_coupling_score must be within [0, 1] (got {})",
                self.coupling.min_coupling_score
            )));
        }
        if self.coupling.max_files_per_commit < 2 {
            return Err(GitriskError::Config(
                "coupling.max_files_per_commit must be at least 2".into(),
            ));
        }
        if self.overview.trend_months == 0 {
            return Err(GitriskError::Config(
                "overview.trend_months must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Hotspot detection configuration.
///
/// # Examples
///
/// ```
/// use gitrisk_core::{ComplexityMetric, HotspotConfig};
///
/// let config = HotspotConfig::default();
/// assert_eq!(config.metric, ComplexityMetric::ChangeCount);
/// assert_eq!(config.min_complexity, 5.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotConfig {
    /// Signal compared against `min_complexity` (default: change count).
    #[serde(default)]
    pub metric: ComplexityMetric,
    /// A file is a hotspot when its metric is strictly above this (default: 5).
    #[serde(default = "default_min_complexity")]
    pub min_complexity: f64,
    /// Risk cutoffs applied to the metric value. When unset, the metric's
    /// own defaults apply: 20 / 10 / 5 commits or 200 / 100 / 50 lines per commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<RiskThresholds>,
}

impl HotspotConfig {
    /// Cutoffs used to classify the configured metric.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitrisk_core::{ComplexityMetric, HotspotConfig, RiskThresholds};
    ///
    /// let config = HotspotConfig {
    ///     metric: ComplexityMetric::Complexity,
    ///     ..HotspotConfig::default()
    /// };
    /// assert_eq!(config.risk_thresholds(), RiskThresholds::complexity());
    /// ```
    pub fn risk_thresholds(&self) -> RiskThresholds {
        self.thresholds.unwrap_or_else(|| RiskThresholds::for_metric(self.metric))
    }
}

fn default_min_complexity() -> f64 {
    5.0
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            metric: ComplexityMetric::default(),
            min_complexity: default_min_complexity(),
            thresholds: None,
        }
    }
}

/// Temporal coupling configuration.
///
/// # Examples
///
/// ```
/// use gitrisk_core::CouplingConfig;
///
/// let config = CouplingConfig::default();
/// assert_eq!(config.min_shared_commits, 2);
/// assert_eq!(config.min_coupling_score, 0.0);
/// assert_eq!(config.max_files_per_commit, 25);
/// assert_eq!(config.max_pairs, 200);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingConfig {
    /// Minimum commits shared by both files (default: 2).
    #[serde(default = "default_min_shared_commits")]
    pub min_shared_commits: u32,
    /// Minimum coupling score in `[0, 1]` (default: 0).
    #[serde(default)]
    pub min_coupling_score: f64,
    /// Commits touching more files than this are left out of pairing (default: 25).
    #[serde(default = "default_max_files_per_commit")]
    pub max_files_per_commit: usize,
    /// Maximum pairs returned, highest score first (default: 200).
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,
}

fn default_min_shared_commits() -> u32 {
    2
}

fn default_max_files_per_commit() -> usize {
    25
}

fn default_max_pairs() -> usize {
    200
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            min_shared_commits: default_min_shared_commits(),
            min_coupling_score: 0.0,
            max_files_per_commit: default_max_files_per_commit(),
            max_pairs: default_max_pairs(),
        }
    }
}

/// Dashboard summary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewConfig {
    /// Number of most recent monthly buckets kept in the trend (default: 12).
    #[serde(default = "default_trend_months")]
    pub trend_months: usize,
}

fn default_trend_months() -> usize {
    12
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            trend_months: default_trend_months(),
        }
    }
}
