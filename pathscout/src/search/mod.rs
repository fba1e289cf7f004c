/// Resumable depth-first search for a named file or directory below a
/// wildcarded root.
///
/// A search is driven one match at a time:
/// ```rust,ignore
/// let request = SearchRequest::new("/src/**/include", "stdio.h");
/// let mut ctx = SearchContext::local(request)?;
/// while let Some(path) = ctx.step() {
///     println!("{}", path.display());
/// }
/// ```
///
/// All traversal state lives in the [`SearchContext`], so a caller may stop
/// after any match and come back later. Each directory is listed at most
/// once per wildcard suffix, and each match is reported at most once, even
/// when symlinks make the same tree reachable along several routes.
///
/// # Upward search
///
/// With stop directories set, an exhausted search re-roots itself one
/// directory higher and runs again, until the start directory is one of the
/// stop directories:
/// ```rust,ignore
/// let request = SearchRequest::new(".", "tags")
///     .with_relative_to("/home/me/proj/src/main.c")
///     .with_stop_dirs("/home/me");
/// ```
pub mod context;
pub mod engine;
pub mod frame;
pub mod upward;

pub use context::{CancelToken, FindKind, SearchContext, SearchRequest};
pub use frame::{FrameStage, PathFrame, TraversalStack};
pub use upward::{split_stop_dirs, StopDirs};
