use std::path::PathBuf;

use crate::wildcard::Wildcard;

/// Progress of a frame through its directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    /// Listing not yet consumed: matches are checked or children pushed.
    Fresh,
    /// Children already pushed; only `**` re-descent remains.
    ChildrenPushed,
}

/// One unit of pending directory-expansion work.
#[derive(Debug, Clone)]
pub struct PathFrame {
    pub fixed_part: PathBuf,
    /// Suffix still to match below `fixed_part`. A leading `**` counter is
    /// decremented in place when the frame is expanded.
    pub remaining_wildcard: Wildcard,
    /// Remaining descent budget.
    pub level: i32,
    /// Directory listing for this frame, `None` until first expanded.
    pub entries: Option<Vec<PathBuf>>,
    /// Suffix below each entry, computed with the listing.
    pub rest: Wildcard,
    /// Where to resume in `entries`.
    pub cursor: usize,
    pub stage: FrameStage,
    /// `**` has already been tried as matching zero directories here.
    pub star_star_expanded_empty: bool,
}

impl PathFrame {
    pub fn new(
        fixed_part: PathBuf,
        remaining_wildcard: Wildcard,
        level: i32,
        star_star_expanded_empty: bool,
    ) -> Self {
        Self {
            fixed_part,
            remaining_wildcard,
            level,
            entries: None,
            rest: Wildcard::empty(),
            cursor: 0,
            stage: FrameStage::Fresh,
            star_star_expanded_empty,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.entries.is_some()
    }
}

/// LIFO of pending frames. The stack owns its frames: pushing moves a frame
/// in, popping moves it out.
#[derive(Debug, Default)]
pub struct TraversalStack {
    frames: Vec<PathFrame>,
}

impl TraversalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a frame. Returns false, dropping the frame, if the stack
    /// cannot grow.
    #[must_use]
    pub fn push(&mut self, frame: PathFrame) -> bool {
        if self.frames.try_reserve(1).is_err() {
            return false;
        }
        self.frames.push(frame);
        true
    }

    pub fn pop(&mut self) -> Option<PathFrame> {
        self.frames.pop()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str) -> PathFrame {
        PathFrame::new(PathBuf::from(name), Wildcard::empty(), 3, false)
    }

    #[test]
    fn test_stack_is_lifo() {
        let mut stack = TraversalStack::new();
        assert!(stack.push(frame("/a")));
        assert!(stack.push(frame("/b")));
        assert_eq!(stack.len(), 2);

        assert_eq!(stack.pop().unwrap().fixed_part, PathBuf::from("/b"));
        assert_eq!(stack.pop().unwrap().fixed_part, PathBuf::from("/a"));
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_partially_drained_frame_survives_repush() {
        let mut stack = TraversalStack::new();
        let mut f = frame("/r");
        f.entries = Some(vec![PathBuf::from("/r/x"), PathBuf::from("/r/y")]);
        f.cursor = 1;
        assert!(stack.push(f));

        let f = stack.pop().unwrap();
        assert!(f.is_expanded());
        assert_eq!(f.cursor, 1);
        assert_eq!(f.stage, FrameStage::Fresh);
    }

    #[test]
    fn test_clear() {
        let mut stack = TraversalStack::new();
        assert!(stack.push(frame("/a")));
        stack.clear();
        assert!(stack.is_empty());
    }
}
