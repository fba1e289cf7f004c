use serde::{Deserialize, Serialize};
use std::path::{is_separator, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::frame::{PathFrame, TraversalStack};
use super::upward::StopDirs;
use crate::errors::{FindError, FindResult};
use crate::metrics::SearchMetrics;
use crate::oracle::{LocalFs, PathKind, PathOracle};
use crate::visited::VisitedLists;
use crate::wildcard::{compile, Segment, Wildcard, MAX_PATH_LEN};

/// What a terminal match is allowed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindKind {
    File,
    Directory,
    #[default]
    Either,
}

impl FindKind {
    /// Whether an existing object of kind `found` is an acceptable match.
    pub fn accepts(self, found: PathKind) -> bool {
        found.exists()
            && match self {
                FindKind::File => !found.is_dir(),
                FindKind::Directory => found.is_dir(),
                FindKind::Either => true,
            }
    }
}

/// Cooperative cancellation flag, polled once per step iteration.
///
/// Cancellation is advisory: a raised flag makes the current `step` return
/// `None` without touching the traversal stack. Once the caller resets the
/// flag, the next `step` resumes where the search stopped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Parameters of one search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Root pattern, possibly wildcarded. Relative roots start at the current
    /// directory, or at the directory of `relative_to` when they begin
    /// with `./`.
    pub root: String,
    /// Literal name to look for below each matching directory.
    pub target: String,
    /// `;`-separated stop directories; `None` disables upward search.
    pub stop_dirs: Option<String>,
    /// Hard cap on descent depth, independent of `**` counters.
    pub max_level: i32,
    /// Drop the visited lists inherited from a prior context.
    pub reset_visited: bool,
    pub kind: FindKind,
    /// Searching for tags files: alternate suffixes are not tried.
    pub tag_mode: bool,
    /// File whose directory a `./` root is relative to.
    pub relative_to: Option<PathBuf>,
    /// Suffixes tried in order when the bare name is not found.
    pub suffixes: Vec<String>,
    /// Compare wildcard suffixes case-insensitively in the visited lists of
    /// a fresh context.
    pub ignore_case: bool,
}

impl SearchRequest {
    pub fn new(root: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            target: target.into(),
            stop_dirs: None,
            max_level: 100,
            reset_visited: false,
            kind: FindKind::Either,
            tag_mode: false,
            relative_to: None,
            suffixes: Vec::new(),
            ignore_case: false,
        }
    }

    pub fn with_stop_dirs(mut self, stop_dirs: impl Into<String>) -> Self {
        self.stop_dirs = Some(stop_dirs.into());
        self
    }

    pub fn with_max_level(mut self, max_level: i32) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn with_kind(mut self, kind: FindKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_relative_to(mut self, file: impl Into<PathBuf>) -> Self {
        self.relative_to = Some(file.into());
        self
    }

    pub fn with_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn with_tag_mode(mut self, tag_mode: bool) -> Self {
        self.tag_mode = tag_mode;
        self
    }

    pub fn with_reset_visited(mut self, reset_visited: bool) -> Self {
        self.reset_visited = reset_visited;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }
}

/// State of one logical search, carried between calls to
/// [`SearchContext::step`].
///
/// A context is used by one caller at a time and is not shared between
/// threads; run concurrent searches with separate contexts.
#[derive(Debug)]
pub struct SearchContext<F: PathOracle = LocalFs> {
    pub(crate) oracle: F,
    pub(crate) target_name: String,
    /// Absolute directory the search is rooted at; moved up by upward search.
    pub(crate) start_dir: PathBuf,
    /// Literal part of the root below `start_dir`.
    pub(crate) fixed_prefix: PathBuf,
    pub(crate) wildcard_suffix: Wildcard,
    pub(crate) max_level: i32,
    pub(crate) stop_dirs: Option<StopDirs>,
    pub(crate) kind: FindKind,
    pub(crate) tag_mode: bool,
    pub(crate) suffixes: Vec<String>,
    pub(crate) stack: TraversalStack,
    pub(crate) visited_files: VisitedLists,
    pub(crate) visited_dirs: VisitedLists,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) metrics: SearchMetrics,
}

impl SearchContext<LocalFs> {
    /// Starts a search on the local filesystem.
    pub fn local(request: SearchRequest) -> FindResult<Self> {
        Self::init(LocalFs::new(), request, None)
    }
}

impl<F: PathOracle> SearchContext<F> {
    /// Builds a search context with exactly one seed frame pushed.
    ///
    /// When `prior` is given, its visited lists (unless
    /// `request.reset_visited`), cancel token and metrics carry over; all
    /// other state is rebuilt. On error the prior context is dropped with the
    /// partially built one.
    pub fn init(oracle: F, request: SearchRequest, prior: Option<Self>) -> FindResult<Self> {
        let (mut visited_files, mut visited_dirs, cancel, metrics) = match prior {
            Some(prior) => (
                prior.visited_files,
                prior.visited_dirs,
                prior.cancel,
                prior.metrics,
            ),
            None => (
                VisitedLists::new(request.ignore_case),
                VisitedLists::new(request.ignore_case),
                None,
                SearchMetrics::new(),
            ),
        };
        if request.reset_visited {
            visited_files.clear();
            visited_dirs.clear();
        }

        let mut root = request.root.as_str();
        let mut start_dir = None;

        if let Some(file) = request.relative_to.as_deref().filter(|_| is_dot_relative(root)) {
            let dir = file.parent().unwrap_or(Path::new("")).to_path_buf();
            let dir = if dir.is_absolute() {
                dir
            } else {
                current_dir(&oracle)?.join(dir)
            };
            start_dir = Some(dir);
            root = root[1..].trim_start_matches(is_separator);
        } else if root.is_empty()
            || !(Path::new(root).is_absolute() || oracle.is_url_like(Path::new(root)))
        {
            start_dir = Some(current_dir(&oracle)?);
        }

        let stop_dirs = request.stop_dirs.as_deref().map(StopDirs::parse);

        let compiled = compile(root)?;
        let mut fixed_prefix = compiled.fixed_prefix;
        let mut wildcard_suffix = compiled.wildcard_suffix;

        let start_dir = match start_dir {
            Some(dir) => dir,
            None => PathBuf::from(std::mem::take(&mut fixed_prefix)),
        };

        if start_dir.as_os_str().len() + fixed_prefix.len() + 3 >= MAX_PATH_LEN {
            return Err(FindError::path_too_long(format!(
                "{}/{}",
                start_dir.display(),
                fixed_prefix
            )));
        }

        // A literal prefix that is not a directory becomes the first segment
        // to match.
        let mut fixed_path = PathBuf::from(&fixed_prefix);
        if !fixed_prefix.is_empty() && !oracle.path_kind(&start_dir.join(&fixed_path)).is_dir() {
            if let Some(tail) = fixed_path.file_name().and_then(|t| t.to_str()) {
                wildcard_suffix.prepend(Segment::literal(tail));
                fixed_path.pop();
            }
        }

        let seed = PathFrame::new(
            start_dir.join(&fixed_path),
            wildcard_suffix.clone(),
            request.max_level,
            false,
        );
        let mut stack = TraversalStack::new();
        if !stack.push(seed) {
            return Err(FindError::allocation_failure("seed frame"));
        }

        debug!(
            "Search for '{}' from {} (fixed '{}', wildcard '{}')",
            request.target,
            start_dir.display(),
            fixed_path.display(),
            wildcard_suffix
        );

        Ok(Self {
            oracle,
            target_name: request.target,
            start_dir,
            fixed_prefix: fixed_path,
            wildcard_suffix,
            max_level: request.max_level,
            stop_dirs,
            kind: request.kind,
            tag_mode: request.tag_mode,
            suffixes: request.suffixes,
            stack,
            visited_files,
            visited_dirs,
            cancel,
            metrics,
        })
    }

    /// Attaches a cancellation token polled by [`SearchContext::step`].
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Shares a metrics handle with other contexts.
    pub fn with_metrics(mut self, metrics: SearchMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn start_dir(&self) -> &Path {
        &self.start_dir
    }

    /// Number of frames waiting on the traversal stack.
    pub fn pending_frames(&self) -> usize {
        self.stack.len()
    }

    /// Forgets every directory and file visited so far, keeping the search
    /// itself intact.
    pub fn reset_visited(&mut self) {
        self.visited_files.clear();
        self.visited_dirs.clear();
    }

    /// Releases the stack, the visited lists and the search parameters.
    /// Calling it again is a no-op; a cleaned context yields no more results.
    pub fn cleanup(&mut self) {
        self.stack.clear();
        self.reset_visited();
        self.target_name.clear();
        self.start_dir = PathBuf::new();
        self.fixed_prefix = PathBuf::new();
        self.wildcard_suffix = Wildcard::empty();
        self.stop_dirs = None;
        self.suffixes.clear();
    }
}

/// `.` or `./...`
fn is_dot_relative(root: &str) -> bool {
    let mut chars = root.chars();
    chars.next() == Some('.') && chars.next().map_or(true, is_separator)
}

fn current_dir<F: PathOracle>(oracle: &F) -> FindResult<PathBuf> {
    oracle
        .current_dir()
        .ok_or_else(|| FindError::oracle_failure("cannot determine the current directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_dot_relative() {
        assert!(is_dot_relative("."));
        assert!(is_dot_relative("./**"));
        assert!(!is_dot_relative(".git"));
        assert!(!is_dot_relative("../x"));
        assert!(!is_dot_relative("src"));
    }

    #[test]
    fn test_init_pushes_one_seed() {
        let dir = tempdir().unwrap();
        let root = format!("{}/*", dir.path().display());
        let ctx = SearchContext::local(SearchRequest::new(root, "tags")).unwrap();

        assert_eq!(ctx.pending_frames(), 1);
        assert_eq!(ctx.start_dir(), Path::new(&format!("{}/", dir.path().display())));
        assert_eq!(ctx.target_name(), "tags");
    }

    #[test]
    fn test_dot_root_is_relative_to_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("main.c");
        fs::write(&file, "").unwrap();

        let request = SearchRequest::new("./**", "tags").with_relative_to(&file);
        let ctx = SearchContext::local(request).unwrap();
        assert_eq!(ctx.start_dir(), dir.path());
        assert_eq!(ctx.wildcard_suffix.leading_recursion(), Some(30));
    }

    #[test]
    fn test_missing_literal_dir_moves_into_suffix() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("main.c");
        let request = SearchRequest::new("./nothere", "x").with_relative_to(&file);
        let ctx = SearchContext::local(request).unwrap();
        assert_eq!(ctx.start_dir(), dir.path());
        assert_eq!(ctx.wildcard_suffix.segments(), &[Segment::literal("nothere")]);
    }

    #[test]
    fn test_invalid_pattern_fails_init() {
        let err = SearchContext::local(SearchRequest::new("/tmp/**3x/b", "tags")).unwrap_err();
        assert!(matches!(err, FindError::InvalidPattern(_)));
    }

    #[test]
    fn test_overlong_start_dir_fails_init() {
        let deep = format!("/{}main.c", "d/".repeat(MAX_PATH_LEN / 2));
        let request = SearchRequest::new("./inc", "x.h").with_relative_to(deep);

        let err = SearchContext::local(request).unwrap_err();
        assert!(matches!(err, FindError::PathTooLong(_)));
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path().display().to_string();
        let mut ctx = SearchContext::local(SearchRequest::new(root, "tags")).unwrap();
        ctx.cleanup();
        ctx.cleanup();
        assert_eq!(ctx.pending_frames(), 0);
        assert!(ctx.step().is_none());
    }

    #[test]
    fn test_kind_accepts() {
        assert!(FindKind::Either.accepts(PathKind::File));
        assert!(FindKind::Either.accepts(PathKind::Directory));
        assert!(!FindKind::File.accepts(PathKind::Directory));
        assert!(!FindKind::Directory.accepts(PathKind::File));
        assert!(!FindKind::Either.accepts(PathKind::Missing));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!token.is_cancelled());
        shared.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!shared.is_cancelled());
    }
}
