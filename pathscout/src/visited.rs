use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::oracle::PathOracle;
use crate::wildcard::Wildcard;

/// De-duplication key for a filesystem object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Device and inode of a locally stat-able object.
    Inode { dev: u64, ino: u64 },
    /// Canonical path, or the literal string of a URL-like path.
    Name(PathBuf),
}

impl Identity {
    /// Resolves the identity of `path`, or `None` if it cannot be identified
    /// (typically because it does not exist).
    pub fn resolve<F: PathOracle>(oracle: &F, path: &Path) -> Option<Identity> {
        if oracle.is_url_like(path) {
            return Some(Identity::Name(path.to_path_buf()));
        }
        if let Some((dev, ino)) = oracle.stat_identity(path) {
            return Some(Identity::Inode { dev, ino });
        }
        oracle.canonical_path(path).map(Identity::Name)
    }
}

/// Directories and files already explored by a search.
///
/// An object counts as visited only together with the wildcard suffix that
/// was active when it was recorded: the same directory searched for `*/inc`
/// and for `**/inc` is two different visits. Counter values after `**` are
/// ignored in that comparison.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    entries: HashMap<Identity, Vec<Wildcard>>,
    len: usize,
    ignore_case: bool,
}

impl VisitedRegistry {
    pub fn new(ignore_case: bool) -> Self {
        Self {
            entries: HashMap::new(),
            len: 0,
            ignore_case,
        }
    }

    /// Records the visit and returns true, or returns false if an equal visit
    /// is already present.
    ///
    /// If the registry cannot grow, the visit is reported as new without
    /// being recorded.
    pub fn record_if_new(&mut self, identity: Identity, wildcard: &Wildcard) -> bool {
        if let Some(seen) = self.entries.get(&identity) {
            if seen.iter().any(|w| w.shape_eq(wildcard, self.ignore_case)) {
                return false;
            }
        }
        if self.entries.try_reserve(1).is_err() {
            return true;
        }
        let seen = self.entries.entry(identity).or_default();
        if seen.try_reserve(1).is_err() {
            return true;
        }
        seen.push(wildcard.clone());
        self.len += 1;
        true
    }

    /// Resolves `path` and records it. Paths that cannot be identified are
    /// reported as already visited so the caller skips them.
    pub fn record_path_if_new<F: PathOracle>(
        &mut self,
        oracle: &F,
        path: &Path,
        wildcard: &Wildcard,
    ) -> bool {
        match Identity::resolve(oracle, path) {
            Some(identity) => self.record_if_new(identity, wildcard),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}

/// One registry per searched-for name.
///
/// Searching `tags`, then `TAGS`, then `tags` again lets the third search
/// reuse everything the first one visited while the second starts clean.
#[derive(Debug, Default)]
pub struct VisitedLists {
    lists: HashMap<String, VisitedRegistry>,
    ignore_case: bool,
}

impl VisitedLists {
    pub fn new(ignore_case: bool) -> Self {
        Self {
            lists: HashMap::new(),
            ignore_case,
        }
    }

    /// The registry for `name`, created on first use.
    pub fn for_target(&mut self, name: &str) -> &mut VisitedRegistry {
        let ignore_case = self.ignore_case;
        self.lists
            .entry(name.to_string())
            .or_insert_with(|| VisitedRegistry::new(ignore_case))
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
