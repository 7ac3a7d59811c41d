use std::path::PathBuf;

/// Errors that can occur across gitrisk.
///
/// Every variant is terminal for the request that raised it: analyzers never
/// return partial results alongside an error. Library crates use this type
/// directly; the binary converts to `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use gitrisk_core::GitriskError;
///
/// let err = GitriskError::InvalidFilter("start date is after end date".into());
/// assert!(err.to_string().contains("start date"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GitriskError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(gitrisk::config),
        help("check .gitrisk.toml, or run 'gitrisk init' for a commented template")
    )]
    Config(String),

    /// The history store is unreachable or returned malformed rows.
    #[error("history store error: {0}")]
    #[diagnostic(code(gitrisk::store))]
    Store(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    #[diagnostic(
        code(gitrisk::git),
        help("run gitrisk from inside a git repository, or pass --repo")
    )]
    Git(String),

    /// SQLite operation failure.
    #[error("database error: {0}")]
    #[diagnostic(code(gitrisk::database))]
    Database(String),

    /// A filter or pagination parameter was rejected at the boundary.
    #[error("invalid filter: {0}")]
    #[diagnostic(
        code(gitrisk::invalid_filter),
        help("dates are YYYY-MM-DD and --since must not be after --until")
    )]
    InvalidFilter(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(gitrisk::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(gitrisk::file_not_found))]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GitriskError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn store_error_displays_message() {
        let err = GitriskError::Store("connection refused".into());
        assert_eq!(err.to_string(), "history store error: connection refused");
    }

    #[test]
    fn invalid_filter_displays_message() {
        let err = GitriskError::InvalidFilter("page must be at least 1".into());
        assert_eq!(err.to_string(), "invalid filter: page must be at least 1");
    }

    #[test]
    fn invalid_filter_carries_help() {
        use miette::Diagnostic;

        let err = GitriskError::InvalidFilter("start date is after end date".into());
        assert!(err.help().is_some());
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("gitrisk::invalid_filter")
        );
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = GitriskError::FileNotFound(PathBuf::from("/tmp/history.json"));
        assert!(err.to_string().contains("/tmp/history.json"));
    }
}
