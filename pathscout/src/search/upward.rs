//! Upward re-rooting once a downward search is exhausted.
//!
//! A search path entry such as `./**;/home/me` asks for a downward search
//! from the current file's directory, then from its parent, and so on until
//! the start directory reaches `/home/me`.

use std::path::{is_separator, PathBuf};

/// Directories at which upward search stops.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StopDirs {
    dirs: Vec<String>,
}

impl StopDirs {
    /// Parses a `;`-separated stop list. Leading `;` are ignored and the last
    /// piece may be empty, which never matches and so lets the search climb
    /// to the top of the tree.
    pub fn parse(list: &str) -> Self {
        let list = list.trim_start_matches(';');
        Self {
            dirs: list.split(';').map(str::to_string).collect(),
        }
    }

    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    /// True when `path` equals a stop directory or is an ancestor of one.
    ///
    /// `/home` stops against `/home` and `/home/me` but not against `/homer`.
    pub fn contains(&self, path: &str) -> bool {
        let path = trim_trailing_separators(path);
        if path.is_empty() {
            return true;
        }

        self.dirs.iter().any(|stop| {
            if stop.len() > path.len() {
                stop.starts_with(path)
                    && stop[path.len()..].starts_with(is_separator)
            } else {
                stop == path
            }
        })
    }
}

/// Removes trailing separators, keeping a lone root separator.
fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    if trimmed.is_empty() && !path.is_empty() {
        &path[..1]
    } else {
        trimmed
    }
}

/// Splits a search path entry `root;stops` into its root and its stop list.
///
/// A `\;` in the root stands for a literal `;`.
pub fn split_stop_dirs(entry: &str) -> (String, Option<String>) {
    let mut root = String::new();
    let mut chars = entry.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, ';'))) => {
                root.push(';');
                chars.next();
            }
            ';' => return (root, Some(entry[i + 1..].to_string())),
            _ => root.push(c),
        }
    }
    (root, None)
}

/// Moves `start_dir` one directory up unless it is a stop directory.
/// Returns false when the climb is over.
pub fn climb(start_dir: &mut PathBuf, stop_dirs: &StopDirs) -> bool {
    let current = start_dir.to_string_lossy();
    if stop_dirs.contains(&current) {
        return false;
    }
    if !start_dir.pop() {
        return false;
    }
    !start_dir.as_os_str().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(StopDirs::parse("/a;/b").dirs(), &["/a", "/b"]);
        assert_eq!(StopDirs::parse(";;/a").dirs(), &["/a"]);
        assert_eq!(StopDirs::parse("/a;").dirs(), &["/a", ""]);
        assert_eq!(StopDirs::parse("").dirs(), &[""]);
    }

    #[test]
    fn test_contains_matches_equal_and_ancestor() {
        let stops = StopDirs::parse("/home/me");
        assert!(stops.contains("/home/me"));
        assert!(stops.contains("/home/me/"));
        assert!(stops.contains("/home"));
        assert!(!stops.contains("/home/me/src"));
        assert!(!stops.contains("/hom"));

        let stops = StopDirs::parse("/homer");
        assert!(!stops.contains("/home"));
    }

    #[test]
    fn test_empty_entry_never_matches() {
        let stops = StopDirs::parse("");
        assert!(!stops.contains("/"));
        assert!(!stops.contains("/usr"));
        assert!(stops.contains(""));
    }

    #[test]
    fn test_split_stop_dirs() {
        assert_eq!(
            split_stop_dirs("./**;/home"),
            ("./**".to_string(), Some("/home".to_string()))
        );
        assert_eq!(split_stop_dirs("src"), ("src".to_string(), None));
        assert_eq!(split_stop_dirs("tags;"), ("tags".to_string(), Some(String::new())));
        assert_eq!(
            split_stop_dirs(r"odd\;name;/x;/y"),
            ("odd;name".to_string(), Some("/x;/y".to_string()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_climb_stops_at_stop_dir() {
        let stops = StopDirs::parse("/home");
        let mut dir = PathBuf::from("/home/me/src");
        assert!(climb(&mut dir, &stops));
        assert_eq!(dir, PathBuf::from("/home/me"));
        assert!(climb(&mut dir, &stops));
        assert_eq!(dir, PathBuf::from("/home"));
        assert!(stops.contains("/home"));
        assert!(!climb(&mut dir, &stops));
    }

    #[cfg(unix)]
    #[test]
    fn test_climb_to_root_with_empty_stop() {
        let stops = StopDirs::parse("");
        let mut dir = PathBuf::from("/a/b");
        assert!(climb(&mut dir, &stops));
        assert!(climb(&mut dir, &stops));
        assert_eq!(dir, PathBuf::from("/"));
        assert!(!climb(&mut dir, &stops));
    }
}
