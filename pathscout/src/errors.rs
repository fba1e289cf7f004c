/// Error types for the path search engine.
///
/// Only `init` and the configuration loaders ever return an error to the
/// caller. Once a search context exists, failures inside the traversal
/// (an unreadable directory, a listing that could not be produced, a frame
/// that could not be allocated) drop the affected branch and the search
/// carries on, so `step` itself is infallible.
///
/// ```rust,ignore
/// match SearchContext::init(LocalFs::new(), request, None) {
///     Ok(mut ctx) => while let Some(path) = ctx.step() { /* use path */ },
///     Err(FindError::InvalidPattern(msg)) => eprintln!("bad path: {}", msg),
///     Err(e) => eprintln!("search failed: {}", e),
/// }
/// ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for path search operations
pub type FindResult<T> = Result<T, FindError>;

/// Errors that can occur while setting up or configuring a search
#[derive(Error, Debug)]
pub enum FindError {
    #[error("Invalid path: {0}")]
    InvalidPattern(String),
    #[error("Path too long: {0}")]
    PathTooLong(String),
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),
    #[error("Directory listing failed: {0}")]
    OracleFailure(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl FindError {
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn path_too_long(path: impl Into<String>) -> Self {
        Self::PathTooLong(path.into())
    }

    pub fn allocation_failure(what: impl Into<String>) -> Self {
        Self::AllocationFailure(what.into())
    }

    pub fn oracle_failure(msg: impl Into<String>) -> Self {
        Self::OracleFailure(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
