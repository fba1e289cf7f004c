//! Compilation of wildcard-bearing search roots.
//!
//! A root such as `/src/**2/include` is split into a literal fixed prefix
//! (`/src/`) and a wildcard suffix made of path segments. Each segment is a
//! short list of [`WildcardToken`]s. The recursive marker `**[N]` becomes a
//! `StarStar(N)` token whose counter the engine decrements as it descends.
//!
//! Supported syntax:
//! - `*` matches any run of characters inside one path component
//! - `?` matches exactly one character
//! - `**` descends up to 30 directory levels, `**N` up to N (1-254) levels,
//!   `**0` is dropped entirely
//!
//! Every other character is literal, so names containing `[` or `]` need no
//! escaping.

use std::fmt;
use std::path::is_separator;

use crate::errors::{FindError, FindResult};

/// Default number of levels a bare `**` may descend.
pub const DEFAULT_STAR_STAR_DEPTH: u8 = 30;

/// Upper bound on the length of any path the engine builds.
pub const MAX_PATH_LEN: usize = 4096;

/// One token of a compiled wildcard segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardToken {
    Literal(String),
    AnyChar,
    Star,
    StarStar(u8),
}

/// The tokens between two path separators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    tokens: Vec<WildcardToken>,
}

impl Segment {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            tokens: vec![WildcardToken::Literal(text.into())],
        }
    }

    pub fn tokens(&self) -> &[WildcardToken] {
        &self.tokens
    }

    /// Depth counter of a leading `**`, if this segment is a recursive marker.
    pub fn recursion_depth(&self) -> Option<u8> {
        match self.tokens.first() {
            Some(WildcardToken::StarStar(depth)) => Some(*depth),
            _ => None,
        }
    }

    /// Renders the segment as a `glob` pattern with literals escaped.
    ///
    /// A `**` that does not start its segment only matches inside one
    /// component, so it renders as a plain `*`.
    pub fn to_glob(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                WildcardToken::Literal(text) => out.push_str(&glob::Pattern::escape(text)),
                WildcardToken::AnyChar => out.push('?'),
                WildcardToken::Star | WildcardToken::StarStar(_) => out.push('*'),
            }
        }
        out
    }

    /// Raw text of the segment with wildcard characters left unexpanded.
    pub fn to_raw(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                WildcardToken::Literal(text) => out.push_str(text),
                WildcardToken::AnyChar => out.push('?'),
                WildcardToken::Star => out.push('*'),
                WildcardToken::StarStar(_) => out.push_str("**"),
            }
        }
        out
    }

    fn shape_eq(&self, other: &Segment, ignore_case: bool) -> bool {
        self.tokens.len() == other.tokens.len()
            && self
                .tokens
                .iter()
                .zip(&other.tokens)
                .all(|(a, b)| match (a, b) {
                    (WildcardToken::Literal(x), WildcardToken::Literal(y)) => {
                        if ignore_case {
                            x.to_lowercase() == y.to_lowercase()
                        } else {
                            x == y
                        }
                    }
                    (WildcardToken::StarStar(_), WildcardToken::StarStar(_)) => true,
                    (x, y) => x == y,
                })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                WildcardToken::Literal(text) => f.write_str(text)?,
                WildcardToken::AnyChar => f.write_str("?")?,
                WildcardToken::Star => f.write_str("*")?,
                WildcardToken::StarStar(depth) => write!(f, "**{}", depth)?,
            }
        }
        Ok(())
    }
}

/// A compiled wildcard suffix: the path segments still to be matched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wildcard {
    segments: Vec<Segment>,
}

impl Wildcard {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Depth counter of a leading `**`, if the suffix starts with one.
    pub fn leading_recursion(&self) -> Option<u8> {
        self.segments.first().and_then(Segment::recursion_depth)
    }

    /// Decrements the leading `**` counter, dropping the marker once it
    /// reaches zero. Returns false if the suffix does not start with `**`.
    pub(crate) fn consume_recursion(&mut self) -> bool {
        let Some(first) = self.segments.first_mut() else {
            return false;
        };
        match first.tokens.first_mut() {
            Some(WildcardToken::StarStar(depth)) => {
                *depth = depth.saturating_sub(1);
                if *depth == 0 {
                    self.segments.remove(0);
                }
                true
            }
            _ => false,
        }
    }

    /// The suffix left after the first segment.
    pub fn tail(&self) -> Wildcard {
        Wildcard {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    pub(crate) fn prepend(&mut self, segment: Segment) {
        self.segments.insert(0, segment);
    }

    /// Compares two suffixes ignoring the values of their `**` counters.
    ///
    /// `**5/include` and `**9/include` have the same shape; `**5/include`
    /// and `*/include` do not.
    pub fn shape_eq(&self, other: &Wildcard, ignore_case: bool) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.shape_eq(b, ignore_case))
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// A root path split into its literal prefix and its wildcard suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRoot {
    /// Everything before the segment holding the first wildcard. Ends with a
    /// separator whenever the suffix is non-empty.
    pub fixed_prefix: String,
    pub wildcard_suffix: Wildcard,
}

fn is_wildcard_char(c: char) -> bool {
    c == '*' || c == '?'
}

/// Compiles a root path into a fixed prefix and a tokenized wildcard suffix.
pub fn compile(path: &str) -> FindResult<CompiledRoot> {
    if path.len() + 5 >= MAX_PATH_LEN {
        return Err(FindError::path_too_long(path));
    }

    let Some(first_wild) = path.find(is_wildcard_char) else {
        return Ok(CompiledRoot {
            fixed_prefix: path.to_string(),
            wildcard_suffix: Wildcard::empty(),
        });
    };

    // Split on the separator that starts the first wildcard segment.
    let split = path[..first_wild]
        .rfind(is_separator)
        .map(|i| i + 1)
        .unwrap_or(0);
    let (fixed, rest) = path.split_at(split);

    let mut segments = Vec::new();
    for raw in rest.split(is_separator) {
        if raw.is_empty() {
            continue;
        }
        let segment = compile_segment(raw, path)?;
        if !segment.tokens.is_empty() {
            segments.push(segment);
        }
    }

    Ok(CompiledRoot {
        fixed_prefix: fixed.to_string(),
        wildcard_suffix: Wildcard { segments },
    })
}

fn compile_segment(raw: &str, whole: &str) -> FindResult<Segment> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                flush_literal(&mut literal, &mut tokens);

                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                }
                if chars.peek().is_some() {
                    return Err(FindError::invalid_pattern(format!(
                        "'{}': '**[number]' must be at the end of the path or be followed by '/'",
                        whole
                    )));
                }

                // "**0" disables recursion and leaves no token behind
                if let Some(depth) = star_star_depth(&digits) {
                    tokens.push(WildcardToken::StarStar(depth));
                }
            }
            '*' => {
                flush_literal(&mut literal, &mut tokens);
                tokens.push(WildcardToken::Star);
            }
            '?' => {
                flush_literal(&mut literal, &mut tokens);
                tokens.push(WildcardToken::AnyChar);
            }
            _ => literal.push(c),
        }
    }
    flush_literal(&mut literal, &mut tokens);

    Ok(Segment { tokens })
}

/// Maps the digits after `**` to a depth counter; `None` means the marker is
/// elided.
fn star_star_depth(digits: &str) -> Option<u8> {
    if digits.is_empty() {
        return Some(DEFAULT_STAR_STAR_DEPTH);
    }
    if digits.bytes().all(|b| b == b'0') {
        return None;
    }
    match digits.parse::<u32>() {
        Ok(n) if n < 255 => Some(n as u8),
        _ => Some(DEFAULT_STAR_STAR_DEPTH),
    }
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<WildcardToken>) {
    if !literal.is_empty() {
        tokens.push(WildcardToken::Literal(std::mem::take(literal)));
    }
}
