use std::path::{is_separator, Component, Path, PathBuf};
use tracing::{debug, trace};

use super::context::SearchContext;
use super::frame::{FrameStage, PathFrame};
use super::upward::climb;
use crate::oracle::PathOracle;
use crate::wildcard::{Wildcard, MAX_PATH_LEN};

impl<F: PathOracle> SearchContext<F> {
    /// Produces the next match, or `None` once the search is exhausted or
    /// cancelled.
    ///
    /// Each call pops frames until one yields a match. A frame that matched
    /// is pushed back with its cursor advanced, so the following call picks
    /// up right after the reported match. When the stack runs dry and stop
    /// directories were given, the start directory moves one level up and
    /// the search is reseeded from there.
    pub fn step(&mut self) -> Option<PathBuf> {
        loop {
            while let Some(frame) = self.next_frame() {
                if let Some(found) = self.work_on(frame) {
                    return Some(found);
                }
            }

            if self.is_cancelled() || !self.climb_upward() {
                return None;
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// Pops the next frame unless the search was cancelled.
    fn next_frame(&mut self) -> Option<PathFrame> {
        if self.is_cancelled() {
            trace!("Search for '{}' cancelled", self.target_name);
            return None;
        }
        self.stack.pop()
    }

    /// Runs one frame. Returns a match if the frame produced one.
    fn work_on(&mut self, mut frame: PathFrame) -> Option<PathBuf> {
        if !frame.is_expanded() {
            let dirs = self.visited_dirs.for_target(&self.target_name);
            if !dirs.record_path_if_new(&self.oracle, &frame.fixed_part, &frame.remaining_wildcard) {
                trace!(
                    "Already searched: {} ({})",
                    frame.fixed_part.display(),
                    frame.remaining_wildcard
                );
                self.metrics.record_dir_dedup();
                return None;
            }
            trace!(
                "Searching: {} ({})",
                frame.fixed_part.display(),
                frame.remaining_wildcard
            );
        }

        if frame.level <= 0 {
            self.metrics.record_depth_cutoff();
            return None;
        }

        if !frame.is_expanded() && !self.expand(&mut frame) {
            return None;
        }

        if frame.stage == FrameStage::Fresh && frame.rest.is_empty() {
            if let Some((index, found)) = self.scan_for_target(&frame) {
                frame.cursor = index + 1;
                self.push_frame(frame);
                return Some(found);
            }
        }

        let push_children = frame.stage == FrameStage::Fresh && !frame.rest.is_empty();
        frame.stage = FrameStage::ChildrenPushed;
        frame.cursor = 0;

        let entries = frame.entries.take().unwrap_or_default();

        // `**` still leads: every subdirectory is searched again with the
        // same suffix. Queued below the children so those come out first.
        if frame.remaining_wildcard.leading_recursion().is_some() {
            for entry in entries.iter().rev() {
                if *entry == frame.fixed_part || !self.oracle.path_kind(entry).is_dir() {
                    continue;
                }
                self.push_frame(PathFrame::new(
                    entry.clone(),
                    frame.remaining_wildcard.clone(),
                    frame.level - 1,
                    true,
                ));
            }
        }

        if push_children {
            for entry in entries.iter().rev() {
                if !self.oracle.path_kind(entry).is_dir() {
                    continue;
                }
                self.push_frame(PathFrame::new(
                    entry.clone(),
                    frame.rest.clone(),
                    frame.level - 1,
                    false,
                ));
            }
        }

        None
    }

    /// Lists the directories matching the head of the frame's suffix.
    ///
    /// A leading `**` has its counter consumed here and, the first time this
    /// frame is expanded, also stands for zero directories, so the frame's
    /// own directory is listed after its subdirectories. Returns false if
    /// the branch has to be dropped.
    fn expand(&mut self, frame: &mut PathFrame) -> bool {
        let Some(fixed) = trimmed(&frame.fixed_part) else {
            debug!(
                "Non UTF-8 path {}, dropping branch",
                frame.fixed_part.display()
            );
            self.metrics.record_dropped_branch();
            return false;
        };
        let is_url = self.oracle.is_url_like(&frame.fixed_part);

        frame.rest = frame.remaining_wildcard.tail();
        let mut zero_expansion = false;
        let head = if frame.remaining_wildcard.consume_recursion() {
            if !frame.star_star_expanded_empty {
                frame.star_star_expanded_empty = true;
                zero_expansion = true;
            }
            Some(("*".to_string(), "*".to_string()))
        } else {
            frame
                .remaining_wildcard
                .segments()
                .first()
                .map(|segment| (segment.to_glob(), segment.to_raw()))
        };

        self.metrics.record_expansion();

        if is_url {
            let entry = match &head {
                Some((_, raw)) => format!("{}/{}", fixed, raw),
                None => fixed,
            };
            frame.entries = Some(vec![PathBuf::from(entry)]);
            frame.cursor = 0;
            frame.stage = FrameStage::Fresh;
            return true;
        }

        let escaped = glob::Pattern::escape(&fixed);
        let mut patterns = Vec::with_capacity(2);
        match &head {
            Some((glob_head, _)) => patterns.push(join_pattern(&escaped, glob_head)),
            None => patterns.push(escaped.clone()),
        }
        if zero_expansion {
            patterns.push(escaped);
        }

        if patterns.iter().any(|p| p.len() >= MAX_PATH_LEN) {
            debug!("Pattern too long below {}, dropping branch", fixed);
            self.metrics.record_dropped_branch();
            return false;
        }

        match self.oracle.expand_wildcards(&patterns, true) {
            Ok(entries) => {
                frame.entries = Some(entries);
                frame.cursor = 0;
                frame.stage = FrameStage::Fresh;
                true
            }
            Err(e) => {
                debug!("Cannot expand {:?}: {}", patterns, e);
                self.metrics.record_dropped_branch();
                false
            }
        }
    }

    /// Checks every remaining entry of a terminal frame for the target name.
    /// Returns the index of the entry that matched and the match.
    fn scan_for_target(&mut self, frame: &PathFrame) -> Option<(usize, PathBuf)> {
        let count = frame.entries.as_ref().map_or(0, Vec::len);

        for i in frame.cursor..count {
            let entry = match frame.entries.as_ref().and_then(|e| e.get(i)) {
                Some(entry) => entry.clone(),
                None => break,
            };
            let entry_is_url = self.oracle.is_url_like(&entry);
            if !entry_is_url && !self.oracle.path_kind(&entry).is_dir() {
                continue;
            }

            let Some(candidates) = self.candidates(&entry) else {
                debug!("Non UTF-8 path {}, dropping branch", entry.display());
                self.metrics.record_dropped_branch();
                continue;
            };
            for candidate in candidates {
                if candidate.len() >= MAX_PATH_LEN {
                    self.metrics.record_dropped_branch();
                    continue;
                }
                let candidate = PathBuf::from(candidate);
                let is_url = self.oracle.is_url_like(&candidate);
                if !is_url && !self.kind.accepts(self.oracle.path_kind(&candidate)) {
                    continue;
                }

                let files = self.visited_files.for_target(&self.target_name);
                if !files.record_path_if_new(&self.oracle, &candidate, &Wildcard::empty()) {
                    trace!("Already: {}", candidate.display());
                    self.metrics.record_duplicate_match();
                    continue;
                }

                let found = if is_url {
                    candidate
                } else {
                    self.shorten(simplify(&candidate))
                };
                trace!("HIT: {}", found.display());
                self.metrics.record_match();
                return Some((i, found));
            }
        }
        None
    }

    /// `entry/target`, then the same with each suffix appended. Tags files
    /// get no suffixes.
    fn candidates(&self, entry: &Path) -> Option<Vec<String>> {
        let base = format!("{}/{}", trimmed(entry)?, self.target_name);
        let mut out = vec![base.clone()];
        if !self.tag_mode {
            out.extend(self.suffixes.iter().map(|suffix| format!("{}{}", base, suffix)));
        }
        Some(out)
    }

    fn push_frame(&mut self, frame: PathFrame) {
        let fixed = frame.fixed_part.clone();
        if !self.stack.push(frame) {
            debug!("Out of memory queueing {}, dropping branch", fixed.display());
            self.metrics.record_dropped_branch();
        }
    }

    /// Moves the start directory one level up and reseeds the stack.
    /// Returns false when upward search is disabled or over.
    fn climb_upward(&mut self) -> bool {
        let Some(stop_dirs) = &self.stop_dirs else {
            return false;
        };
        if !climb(&mut self.start_dir, stop_dirs) {
            debug!("Upward search for '{}' finished", self.target_name);
            return false;
        }

        self.metrics.record_upward_climb();
        debug!(
            "Searching upward from {} for '{}'",
            self.start_dir.display(),
            self.target_name
        );
        let seed = PathFrame::new(
            self.start_dir.join(&self.fixed_prefix),
            self.wildcard_suffix.clone(),
            self.max_level,
            false,
        );
        if !self.stack.push(seed) {
            self.metrics.record_dropped_branch();
            return false;
        }
        true
    }

    /// Makes `path` relative to the current directory when it lies below it.
    fn shorten(&self, path: PathBuf) -> PathBuf {
        let Some(cwd) = self.oracle.current_dir() else {
            return path;
        };
        match path.strip_prefix(&cwd) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => path,
        }
    }
}

/// Path text without trailing separators, keeping a lone root. `None` for
/// paths that are not valid UTF-8, which cannot be spelled as a pattern.
fn trimmed(path: &Path) -> Option<String> {
    let text = path.to_str()?;
    let cut = text.trim_end_matches(is_separator);
    if cut.is_empty() && !text.is_empty() {
        Some(text[..1].to_string())
    } else {
        Some(cut.to_string())
    }
}

fn join_pattern(base: &str, head: &str) -> String {
    if base.is_empty() {
        head.to_string()
    } else if base.ends_with(is_separator) {
        format!("{}{}", base, head)
    } else {
        format!("{}/{}", base, head)
    }
}

/// Drops `.` components and doubled separators.
fn simplify(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
