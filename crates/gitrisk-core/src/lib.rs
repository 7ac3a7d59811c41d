//! Core types, configuration, and error handling for gitrisk.
//!
//! This crate provides the shared foundation used by the other gitrisk crates:
//! - [`GitriskError`]: unified error type using `thiserror`
//! - [`GitriskConfig`]: configuration loaded from `.gitrisk.toml`
//! - Shared types: [`RiskLevel`], [`RiskThresholds`], [`RiskFilter`],
//!   [`ComplexityMetric`], [`Pagination`], [`Page`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{CouplingConfig, GitriskConfig, HotspotConfig, OverviewConfig};
pub use error::GitriskError;
pub use types::{
    round_to, ComplexityMetric, OutputFormat, Page, Pagination, RiskFilter, RiskLevel,
    RiskThresholds,
};

/// A convenience `Result` type for gitrisk operations.
pub type Result<T> = std::result::Result<T, GitriskError>;
