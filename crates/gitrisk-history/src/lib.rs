//! History Store boundary for gitrisk.
//!
//! Defines the immutable [`Commit`]/[`Change`] log, the [`HistoryStore`]
//! trait the analyzers read through, three store backends (in-memory JSON
//! snapshots, SQLite, and a local git repository), and the filtered
//! [`History`] view built from caller-supplied [`AnalysisFilter`] parameters.

pub mod mining;
pub mod model;
pub mod query;
pub mod sqlite;
pub mod store;

pub use mining::{GitStore, MiningOptions};
pub use model::{Change, ChangeId, Commit, CommitId, ProjectHistory};
pub use query::{AnalysisFilter, History};
pub use sqlite::SqliteStore;
pub use store::{HistoryStore, MemoryStore};
