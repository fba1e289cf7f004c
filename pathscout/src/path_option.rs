//! Lookups driven by a search path option.
//!
//! A path option is a comma or space separated list of roots, each of which
//! may carry wildcards and a `;`-separated list of stop directories:
//!
//! ```text
//! .,/usr/include,src/**,./tags;/home/me,,
//! ```
//!
//! An empty entry stands for the current directory. [`PathFinder`] runs one
//! search per entry, in order, sharing the visited lists between them so a
//! file reachable from two entries is reported once.

use rayon::prelude::*;
use std::collections::VecDeque;
use std::iter;
use std::path::{is_separator, Path, PathBuf};
use tracing::{debug, info};

use crate::config::FinderConfig;
use crate::errors::{FindError, FindResult};
use crate::metrics::SearchMetrics;
use crate::oracle::{is_url, LocalFs, PathOracle};
use crate::results::{LookupReport, LookupResult};
use crate::search::{split_stop_dirs, CancelToken, FindKind, SearchContext, SearchRequest};

/// Splits a path option into its entries.
///
/// Entries are separated by `,` or spaces; `\,` and `\ ` keep the character
/// in the entry. After an entry one `,` and any following spaces are
/// skipped, so `".,,"` yields `"."` and `""` while `".,"` yields only `"."`.
pub fn split_path_option(option: &str) -> Vec<String> {
    let is_sep = |c: char| c == ',' || c == ' ';
    let chars: Vec<char> = option.chars().collect();
    let mut entries = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let mut entry = String::new();
        while i < chars.len() && !is_sep(chars[i]) {
            if chars[i] == '\\' && chars.get(i + 1).copied().is_some_and(is_sep) {
                i += 1;
            }
            entry.push(chars[i]);
            i += 1;
        }
        if i < chars.len() && chars[i] != ',' {
            i += 1;
        }
        if i < chars.len() && chars[i] == ',' {
            i += 1;
        }
        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
        entries.push(entry);
    }
    entries
}

/// `.`, `..`, `./x` or `../x`: names that are looked up as given.
fn is_relative_to_current(name: &str) -> bool {
    let rest = name
        .strip_prefix("..")
        .or_else(|| name.strip_prefix('.'));
    rest.is_some_and(|r| r.is_empty() || r.starts_with(is_separator))
}

#[derive(Debug, Clone)]
struct OptionEntry {
    root: String,
    target: String,
    stop_dirs: Option<String>,
}

#[derive(Debug)]
enum Lookup {
    /// The name bypasses the path option and is checked once.
    Direct { done: bool },
    /// Entries not yet searched.
    Entries(VecDeque<OptionEntry>),
}

/// Iterator over every match of a name along a path option.
///
/// ```rust,ignore
/// let config = FinderConfig::load()?;
/// for path in PathFinder::find_file(LocalFs::new(), "stdio.h", &config) {
///     println!("{}", path.display());
/// }
/// ```
#[derive(Debug)]
pub struct PathFinder<F: PathOracle + Clone = LocalFs> {
    oracle: F,
    name: String,
    kind: FindKind,
    relative_to: Option<PathBuf>,
    suffixes: Vec<String>,
    max_level: i32,
    tag_mode: bool,
    ignore_case: bool,
    cancel: Option<CancelToken>,
    metrics: SearchMetrics,
    lookup: Lookup,
    context: Option<SearchContext<F>>,
    started: bool,
}

impl<F: PathOracle + Clone> PathFinder<F> {
    pub fn new(oracle: F, name: impl Into<String>, path_option: &str, kind: FindKind) -> Self {
        let name = name.into();
        let lookup = if Path::new(&name).is_absolute() || is_url(&name) || is_relative_to_current(&name)
        {
            Lookup::Direct { done: false }
        } else {
            Lookup::Entries(
                split_path_option(path_option)
                    .into_iter()
                    .map(|entry| {
                        let (root, stop_dirs) = split_stop_dirs(&entry);
                        OptionEntry {
                            root,
                            target: name.clone(),
                            stop_dirs,
                        }
                    })
                    .collect(),
            )
        };
        Self::with_lookup(oracle, name, kind, lookup)
    }

    fn with_lookup(oracle: F, name: String, kind: FindKind, lookup: Lookup) -> Self {
        Self {
            oracle,
            name,
            kind,
            relative_to: None,
            suffixes: Vec::new(),
            max_level: 100,
            tag_mode: false,
            ignore_case: false,
            cancel: None,
            metrics: SearchMetrics::new(),
            lookup,
            context: None,
            started: false,
        }
    }

    /// Looks up a file (or directory) along `config.path`, trying the
    /// configured suffixes.
    pub fn find_file(oracle: F, name: impl Into<String>, config: &FinderConfig) -> Self {
        Self::new(oracle, name, &config.path, FindKind::Either)
            .suffixes(config.suffixes.clone())
            .max_level(config.max_level)
            .ignore_case(config.ignore_case)
    }

    /// Looks up a directory along `config.cdpath`.
    pub fn find_directory(oracle: F, name: impl Into<String>, config: &FinderConfig) -> Self {
        Self::new(oracle, name, &config.cdpath, FindKind::Directory)
            .max_level(config.max_level)
            .ignore_case(config.ignore_case)
    }

    /// Enumerates the tags files named by `config.tags`.
    ///
    /// Each entry names both where to look and what to look for:
    /// `./tags;/home` searches for `tags` upward from the directory of the
    /// current file until `/home`.
    pub fn tag_files(oracle: F, config: &FinderConfig) -> Self {
        let entries = split_path_option(&config.tags)
            .into_iter()
            .map(|entry| {
                let (path, stop_dirs) = split_stop_dirs(&entry);
                let tail_at = path.rfind(is_separator).map_or(0, |i| i + 1);
                let (root, target) = path.split_at(tail_at);
                OptionEntry {
                    root: root.to_string(),
                    target: target.to_string(),
                    stop_dirs,
                }
            })
            .filter(|entry| !entry.target.is_empty())
            .collect();

        let mut finder = Self::with_lookup(oracle, String::new(), FindKind::File, Lookup::Entries(entries))
            .max_level(config.max_level)
            .ignore_case(config.ignore_case);
        finder.tag_mode = true;
        finder
    }

    /// File that `./` roots and `./` names are relative to.
    pub fn relative_to(mut self, file: impl Into<PathBuf>) -> Self {
        self.relative_to = Some(file.into());
        self
    }

    pub fn suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn max_level(mut self, max_level: i32) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn kind(mut self, kind: FindKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn metrics(mut self, metrics: SearchMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// Checks a name that bypasses the path option: first next to the
    /// current file, then as given, each with the suffixes appended.
    fn check_direct(&self) -> Option<PathBuf> {
        if is_url(&self.name) {
            return Some(PathBuf::from(&self.name));
        }

        let mut bases = Vec::with_capacity(2);
        if is_relative_to_current(&self.name) {
            if let Some(dir) = self.relative_to.as_deref().and_then(Path::parent) {
                bases.push(dir.join(&self.name));
            }
        }
        bases.push(PathBuf::from(&self.name));

        bases.into_iter().find_map(|base| {
            iter::once(base.clone())
                .chain(self.suffixes.iter().map(|suffix| {
                    let mut with_suffix = base.clone().into_os_string();
                    with_suffix.push(suffix);
                    PathBuf::from(with_suffix)
                }))
                .find(|candidate| self.kind.accepts(self.oracle.path_kind(candidate)))
        })
    }

    /// Starts the search for the next option entry. Returns false once
    /// every entry has been used.
    fn start_next_entry(&mut self) -> bool {
        let Lookup::Entries(entries) = &mut self.lookup else {
            return false;
        };
        let Some(entry) = entries.pop_front() else {
            if let Some(mut ctx) = self.context.take() {
                ctx.metrics().log_stats();
                ctx.cleanup();
            }
            return false;
        };

        let mut request = SearchRequest::new(entry.root.clone(), entry.target)
            .with_max_level(self.max_level)
            .with_kind(self.kind)
            .with_tag_mode(self.tag_mode)
            .with_suffixes(self.suffixes.clone())
            .with_reset_visited(!self.started)
            .with_ignore_case(self.ignore_case);
        request.stop_dirs = entry.stop_dirs;
        request.relative_to = self.relative_to.clone();
        self.started = true;

        match SearchContext::init(self.oracle.clone(), request, self.context.take()) {
            Ok(ctx) => {
                let ctx = ctx.with_metrics(self.metrics.clone());
                self.context = Some(match &self.cancel {
                    Some(token) => ctx.with_cancel_token(token.clone()),
                    None => ctx,
                });
            }
            Err(e) => debug!("Skipping path entry '{}': {}", entry.root, e),
        }
        true
    }
}

impl<F: PathOracle + Clone> Iterator for PathFinder<F> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if let Lookup::Direct { done } = &mut self.lookup {
            if *done {
                return None;
            }
            *done = true;
            return self.check_direct();
        }

        loop {
            if let Some(ctx) = self.context.as_mut() {
                if let Some(found) = ctx.step() {
                    return Some(found);
                }
            }
            if self.is_cancelled() || !self.start_next_entry() {
                return None;
            }
        }
    }
}

/// Resolves several names concurrently, each with its own search.
///
/// Results come back in the order of `names`. With `all` unset only the
/// first match of each name is looked for.
pub fn find_all<F>(
    oracle: &F,
    names: &[String],
    config: &FinderConfig,
    kind: FindKind,
    all: bool,
) -> FindResult<LookupReport>
where
    F: PathOracle + Clone + Send + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.thread_count.get())
        .build()
        .map_err(|e| FindError::config_error(format!("thread pool: {}", e)))?;

    let metrics = SearchMetrics::new();
    info!("Resolving {} names on {} threads", names.len(), config.thread_count);

    let results: Vec<LookupResult> = pool.install(|| {
        names
            .par_iter()
            .map(|name| {
                let finder = match kind {
                    FindKind::Directory => PathFinder::find_directory(oracle.clone(), name, config),
                    _ => PathFinder::find_file(oracle.clone(), name, config).kind(kind),
                }
                .metrics(metrics.clone());

                let matches = if all {
                    finder.collect()
                } else {
                    finder.take(1).collect()
                };
                LookupResult::new(name.clone(), kind, matches)
            })
            .collect()
    });

    let mut report: LookupReport = results.into_iter().collect();
    report.stats = Some(metrics.get_stats());
    Ok(report)
}
