use glob::{glob_with, MatchOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::errors::{unify_path, FindError, FindResult};

/// What a path points at, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Missing,
    File,
    Directory,
}

impl PathKind {
    pub fn exists(self) -> bool {
        self != PathKind::Missing
    }

    pub fn is_dir(self) -> bool {
        self == PathKind::Directory
    }
}

/// The filesystem collaborator the search engine runs against.
///
/// The engine never lists directories or stats files itself. Patterns handed
/// to [`PathOracle::expand_wildcards`] use `glob` syntax with every literal
/// piece already escaped, so an implementation must not apply any further
/// expansion (environment variables, `~`, braces) to them.
pub trait PathOracle {
    /// Returns every path matching any of `patterns`, in listing order,
    /// directories only when `want_dirs` is set.
    fn expand_wildcards(&self, patterns: &[String], want_dirs: bool) -> FindResult<Vec<PathBuf>>;

    fn path_kind(&self, path: &Path) -> PathKind;

    /// `(device, inode)` of the object `path` resolves to, where available.
    fn stat_identity(&self, path: &Path) -> Option<(u64, u64)>;

    /// Absolute, symlink-free spelling of `path`; used for identity when no
    /// device/inode pair is available.
    fn canonical_path(&self, path: &Path) -> Option<PathBuf>;

    fn current_dir(&self) -> Option<PathBuf>;

    /// Remote paths bypass listing, stat and existence checks.
    fn is_url_like(&self, path: &Path) -> bool {
        path.to_str().is_some_and(is_url)
    }
}

/// Recognizes `scheme://...` and `scheme:\\...`.
pub fn is_url(path: &str) -> bool {
    let scheme_len = path
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if scheme_len == 0 {
        return false;
    }
    let rest = &path[scheme_len..];
    rest.starts_with("://") || rest.starts_with(":\\\\")
}

/// [`PathOracle`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs {
    ignore_case: bool,
}

impl LocalFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive wildcard matching, for case-folding filesystems.
    pub fn with_ignore_case(ignore_case: bool) -> Self {
        Self { ignore_case }
    }

    fn match_options(&self) -> MatchOptions {
        MatchOptions {
            case_sensitive: !self.ignore_case,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        }
    }
}

impl PathOracle for LocalFs {
    fn expand_wildcards(&self, patterns: &[String], want_dirs: bool) -> FindResult<Vec<PathBuf>> {
        let mut found = Vec::new();
        for pattern in patterns {
            let paths = glob_with(pattern, self.match_options())
                .map_err(|e| FindError::oracle_failure(format!("{}: {}", pattern, e)))?;
            for entry in paths {
                match entry {
                    Ok(path) => {
                        if !want_dirs || path.is_dir() {
                            found.push(path);
                        }
                    }
                    Err(e) => trace!("Skipping unreadable entry: {}", e),
                }
            }
        }
        Ok(found)
    }

    fn path_kind(&self, path: &Path) -> PathKind {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            Ok(_) => PathKind::File,
            Err(_) => PathKind::Missing,
        }
    }

    #[cfg(unix)]
    fn stat_identity(&self, path: &Path) -> Option<(u64, u64)> {
        use std::os::unix::fs::MetadataExt;
        fs::metadata(path).ok().map(|meta| (meta.dev(), meta.ino()))
    }

    #[cfg(not(unix))]
    fn stat_identity(&self, _path: &Path) -> Option<(u64, u64)> {
        None
    }

    fn canonical_path(&self, path: &Path) -> Option<PathBuf> {
        path.exists().then(|| unify_path(path))
    }

    fn current_dir(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }
}
