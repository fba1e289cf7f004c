//! Engine scenarios against an in-memory filesystem whose listing order is
//! chosen by the test.

use anyhow::Result;
use glob::{MatchOptions, Pattern};
use pathscout::{
    CancelToken, FindError, FindKind, FindResult, PathKind, PathOracle, SearchContext,
    SearchRequest,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directories and files in insertion order; that order is the listing
/// order. Raw directories are listed after everything else below their
/// parent, and listing a failing pattern is an error.
#[derive(Default)]
struct ScriptedFs {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    raw_dirs: Vec<PathBuf>,
    failing: Vec<String>,
    inodes: HashMap<PathBuf, u64>,
    expansions: RefCell<Vec<Vec<String>>>,
}

impl ScriptedFs {
    fn new() -> Self {
        let mut fs = Self::default();
        fs.dir("/");
        fs
    }

    fn dir(&mut self, path: &str) -> &mut Self {
        let path = PathBuf::from(path);
        for ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
            if !self.dirs.iter().any(|d| d == ancestor) {
                self.add_inode(ancestor);
                self.dirs.push(ancestor.to_path_buf());
            }
        }
        self
    }

    fn file(&mut self, path: &str) -> &mut Self {
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent().and_then(Path::to_str) {
            self.dir(parent);
        }
        self.add_inode(&path);
        self.files.push(path);
        self
    }

    #[cfg(unix)]
    fn raw_dir(&mut self, path: PathBuf) -> &mut Self {
        self.add_inode(&path);
        self.raw_dirs.push(path);
        self
    }

    fn failing(&mut self, pattern: &str) -> &mut Self {
        self.failing.push(pattern.to_string());
        self
    }

    fn add_inode(&mut self, path: &Path) {
        let next = self.inodes.len() as u64 + 1;
        self.inodes.entry(path.to_path_buf()).or_insert(next);
    }

    fn expansion_count(&self) -> usize {
        self.expansions.borrow().len()
    }
}

impl PathOracle for &ScriptedFs {
    fn expand_wildcards(&self, patterns: &[String], want_dirs: bool) -> FindResult<Vec<PathBuf>> {
        self.expansions.borrow_mut().push(patterns.to_vec());
        if let Some(bad) = patterns.iter().find(|p| self.failing.contains(*p)) {
            return Err(FindError::oracle_failure(format!("cannot list {}", bad)));
        }
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };

        let mut found = Vec::new();
        for text in patterns {
            let Ok(pattern) = Pattern::new(text) else {
                continue;
            };
            let candidates = self
                .dirs
                .iter()
                .chain(self.files.iter().filter(|_| !want_dirs));
            found.extend(
                candidates
                    .filter(|p| pattern.matches_path_with(p, options))
                    .cloned(),
            );
            if let Some(parent) = text.strip_suffix("/*") {
                found.extend(
                    self.raw_dirs
                        .iter()
                        .filter(|d| d.parent().and_then(Path::to_str) == Some(parent))
                        .cloned(),
                );
            }
        }
        Ok(found)
    }

    fn path_kind(&self, path: &Path) -> PathKind {
        if self.dirs.iter().chain(&self.raw_dirs).any(|d| d == path) {
            PathKind::Directory
        } else if self.files.iter().any(|f| f == path) {
            PathKind::File
        } else {
            PathKind::Missing
        }
    }

    fn stat_identity(&self, path: &Path) -> Option<(u64, u64)> {
        let normalized: PathBuf = path.components().collect();
        self.inodes.get(&normalized).map(|ino| (1, *ino))
    }

    fn canonical_path(&self, _path: &Path) -> Option<PathBuf> {
        None
    }

    fn current_dir(&self) -> Option<PathBuf> {
        Some(PathBuf::from("/work"))
    }
}

fn run<F: PathOracle>(ctx: &mut SearchContext<F>) -> Vec<PathBuf> {
    std::iter::from_fn(|| ctx.step()).collect()
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

#[test]
fn test_matches_follow_listing_order() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/r/y/tags").file("/r/x/tags");

    let request = SearchRequest::new("/r/*", "tags").with_max_level(2);
    let mut ctx = SearchContext::init(&fs, request, None)?;

    assert_eq!(ctx.step(), Some(PathBuf::from("/r/y/tags")));
    assert_eq!(ctx.step(), Some(PathBuf::from("/r/x/tags")));
    assert_eq!(ctx.step(), None);
    assert_eq!(ctx.step(), None);
    Ok(())
}

#[test]
fn test_star_star_children_before_redescent() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/r/a/tags")
        .file("/r/a/sub/tags")
        .file("/r/b/tags")
        .file("/r/tags");

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/r/**", "tags"), None)?;
    assert_eq!(
        run(&mut ctx),
        paths(&["/r/a/tags", "/r/b/tags", "/r/tags", "/r/a/sub/tags"])
    );
    Ok(())
}

#[test]
fn test_zero_expansion_requested_once() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.dir("/r/a/b");

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/r/**", "tags"), None)?;
    assert!(run(&mut ctx).is_empty());

    let expansions = fs.expansions.borrow();
    assert_eq!(expansions[0], vec!["/r/*".to_string(), "/r".to_string()]);
    assert_eq!(expansions[1], vec!["/r/a/*".to_string()]);
    assert_eq!(expansions.len(), 3);
    Ok(())
}

#[test]
fn test_max_level_caps_descent() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/r/a/tags").file("/r/a/sub/tags");

    let request = SearchRequest::new("/r/**", "tags").with_max_level(1);
    let mut ctx = SearchContext::init(&fs, request, None)?;
    assert_eq!(run(&mut ctx), paths(&["/r/a/tags"]));
    assert!(ctx.metrics().get_stats().depth_cutoffs >= 1);
    Ok(())
}

#[test]
fn test_counter_bounds_recursion() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/a/b/inc")
        .file("/a/1/b/inc")
        .file("/a/1/2/b/inc")
        .file("/a/1/2/3/b/inc");

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/a/**2/b", "inc"), None)?;
    let mut found = run(&mut ctx);
    found.sort();
    assert_eq!(
        found,
        paths(&["/a/1/2/b/inc", "/a/1/b/inc", "/a/b/inc"])
    );
    Ok(())
}

#[test]
fn test_matches_shortened_against_cwd() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/work/src/x/tags").file("/elsewhere/tags");

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/work/src/*", "tags"), None)?;
    assert_eq!(run(&mut ctx), paths(&["src/x/tags"]));

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/elsewhere", "tags"), None)?;
    assert_eq!(run(&mut ctx), paths(&["/elsewhere/tags"]));
    Ok(())
}

#[test]
fn test_relative_root_starts_at_cwd() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/work/lib/a/x.h");

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("lib/*", "x.h"), None)?;
    assert_eq!(run(&mut ctx), paths(&["lib/a/x.h"]));
    Ok(())
}

#[test]
fn test_url_root_is_never_listed() -> Result<()> {
    let fs = ScriptedFs::new();
    let request = SearchRequest::new("https://example.com/proj", "tags");
    let mut ctx = SearchContext::init(&fs, request, None)?;

    assert_eq!(
        run(&mut ctx),
        paths(&["https://example.com/proj/tags"])
    );
    assert_eq!(fs.expansion_count(), 0);
    Ok(())
}

#[test]
fn test_kind_restricts_terminal_matches() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.dir("/r/a/tags").file("/r/b/tags");

    let request = SearchRequest::new("/r/*", "tags").with_kind(FindKind::File);
    let mut ctx = SearchContext::init(&fs, request, None)?;
    assert_eq!(run(&mut ctx), paths(&["/r/b/tags"]));
    Ok(())
}

#[test]
fn test_cancel_then_resume() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/r/a/tags").file("/r/b/tags").file("/r/c/tags");

    let token = CancelToken::new();
    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/r/*", "tags"), None)?
        .with_cancel_token(token.clone());

    assert_eq!(ctx.step(), Some(PathBuf::from("/r/a/tags")));
    let pending = ctx.pending_frames();

    token.cancel();
    assert_eq!(ctx.step(), None);
    assert_eq!(ctx.step(), None);
    assert_eq!(ctx.pending_frames(), pending);

    token.reset();
    assert_eq!(run(&mut ctx), paths(&["/r/b/tags", "/r/c/tags"]));
    Ok(())
}

#[test]
fn test_cancel_skips_upward_search() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/p/tags").dir("/p/q");

    let token = CancelToken::new();
    token.cancel();
    let request = SearchRequest::new("/p/q", "tags").with_stop_dirs("");
    let mut ctx = SearchContext::init(&fs, request, None)?.with_cancel_token(token.clone());
    assert_eq!(ctx.step(), None);
    assert_eq!(ctx.metrics().get_stats().upward_climbs, 0);

    token.reset();
    assert_eq!(run(&mut ctx), paths(&["/p/tags"]));
    Ok(())
}

#[test]
fn test_upward_search_reseeds_with_fixed_and_wildcard() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.dir("/home/me/proj/src")
        .file("/home/me/proj/src/main.c")
        .file("/home/me/inc/x/util.h");

    let request = SearchRequest::new("./inc/*", "util.h")
        .with_relative_to("/home/me/proj/src/main.c")
        .with_stop_dirs("/home");
    let mut ctx = SearchContext::init(&fs, request, None)?;

    assert_eq!(run(&mut ctx), paths(&["/home/me/inc/x/util.h"]));
    assert_eq!(ctx.start_dir(), Path::new("/home"));
    Ok(())
}

#[test]
fn test_prior_context_shares_visited_lists() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/a/tags").file("/b/TAGS");

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/a", "tags"), None)?;
    assert_eq!(run(&mut ctx), paths(&["/a/tags"]));

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/b", "TAGS"), Some(ctx))?;
    assert_eq!(run(&mut ctx), paths(&["/b/TAGS"]));

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/a", "tags"), Some(ctx))?;
    assert!(run(&mut ctx).is_empty());

    ctx.reset_visited();
    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/a", "tags"), Some(ctx))?;
    assert_eq!(run(&mut ctx), paths(&["/a/tags"]));
    Ok(())
}

#[test]
fn test_listing_failure_drops_only_that_branch() -> Result<()> {
    let mut fs = ScriptedFs::new();
    fs.file("/r/a/x/tags")
        .file("/r/b/x/tags")
        .file("/r/c/x/tags")
        .failing("/r/b/x");

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/r/*/x", "tags"), None)?;
    assert_eq!(run(&mut ctx), paths(&["/r/a/x/tags", "/r/c/x/tags"]));
    assert_eq!(ctx.metrics().get_stats().dropped_branches, 1);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_non_utf8_directory_is_counted_as_dropped() -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let mut fs = ScriptedFs::new();
    fs.file("/r/good/tags")
        .raw_dir(Path::new("/r").join(OsStr::from_bytes(b"bad\xff")));

    let mut ctx = SearchContext::init(&fs, SearchRequest::new("/r/*", "tags"), None)?;
    assert_eq!(run(&mut ctx), paths(&["/r/good/tags"]));
    assert_eq!(ctx.metrics().get_stats().dropped_branches, 1);
    Ok(())
}
