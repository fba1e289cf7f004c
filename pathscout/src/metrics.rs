use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters describing how a search spent its work.
///
/// Clones share the same counters, so one handle can follow a sequence of
/// contexts (for example every entry of a search path).
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    dirs_expanded: Arc<AtomicU64>,
    dir_dedup_skips: Arc<AtomicU64>,
    duplicate_matches: Arc<AtomicU64>,
    depth_cutoffs: Arc<AtomicU64>,
    dropped_branches: Arc<AtomicU64>,
    upward_climbs: Arc<AtomicU64>,
    matches: Arc<AtomicU64>,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self {
            dirs_expanded: Arc::new(AtomicU64::new(0)),
            dir_dedup_skips: Arc::new(AtomicU64::new(0)),
            duplicate_matches: Arc::new(AtomicU64::new(0)),
            depth_cutoffs: Arc::new(AtomicU64::new(0)),
            dropped_branches: Arc::new(AtomicU64::new(0)),
            upward_climbs: Arc::new(AtomicU64::new(0)),
            matches: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_expansion(&self) {
        self.dirs_expanded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dir_dedup(&self) {
        self.dir_dedup_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_match(&self) {
        self.duplicate_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_depth_cutoff(&self) {
        self.depth_cutoffs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_branch(&self) {
        self.dropped_branches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upward_climb(&self) {
        self.upward_climbs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> SearchStats {
        SearchStats {
            dirs_expanded: self.dirs_expanded.load(Ordering::Relaxed),
            dir_dedup_skips: self.dir_dedup_skips.load(Ordering::Relaxed),
            duplicate_matches: self.duplicate_matches.load(Ordering::Relaxed),
            depth_cutoffs: self.depth_cutoffs.load(Ordering::Relaxed),
            dropped_branches: self.dropped_branches.load(Ordering::Relaxed),
            upward_climbs: self.upward_climbs.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats: {} dirs expanded, {} already searched, {} duplicate matches, \
             {} depth cutoffs, {} dropped branches, {} upward climbs, {} matches",
            stats.dirs_expanded,
            stats.dir_dedup_skips,
            stats.duplicate_matches,
            stats.depth_cutoffs,
            stats.dropped_branches,
            stats.upward_climbs,
            stats.matches
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub dirs_expanded: u64,
    pub dir_dedup_skips: u64,
    pub duplicate_matches: u64,
    pub depth_cutoffs: u64,
    pub dropped_branches: u64,
    pub upward_climbs: u64,
    pub matches: u64,
}
