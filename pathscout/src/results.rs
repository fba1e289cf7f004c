use serde::Serialize;
use std::path::PathBuf;

use crate::metrics::SearchStats;
use crate::search::FindKind;

/// Every match found for one requested name.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    /// The name as requested
    pub name: String,
    /// What the name was allowed to resolve to
    pub kind: FindKind,
    /// Matches in discovery order
    pub matches: Vec<PathBuf>,
}

impl LookupResult {
    pub fn new(name: impl Into<String>, kind: FindKind, matches: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            matches,
        }
    }

    pub fn is_found(&self) -> bool {
        !self.matches.is_empty()
    }

    /// The first match, which is what a single-answer lookup reports.
    pub fn first(&self) -> Option<&PathBuf> {
        self.matches.first()
    }
}

/// Results of a batch of lookups
#[derive(Debug, Clone, Default, Serialize)]
pub struct LookupReport {
    /// Results per name, in request order
    pub results: Vec<LookupResult>,
    /// Total number of matches found
    pub total_matches: usize,
    /// Number of names looked up
    pub names_searched: usize,
    /// Number of names with at least one match
    pub names_found: usize,
    /// Traversal counters, when collected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SearchStats>,
}

impl LookupReport {
    /// Creates a new empty report
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds the result for one name
    pub fn add_result(&mut self, result: LookupResult) {
        self.names_searched += 1;
        if result.is_found() {
            self.total_matches += result.matches.len();
            self.names_found += 1;
        }
        self.results.push(result);
    }

    /// Merges another report into this one
    pub fn merge(&mut self, other: LookupReport) {
        self.total_matches += other.total_matches;
        self.names_searched += other.names_searched;
        self.names_found += other.names_found;
        self.results.extend(other.results);
        if self.stats.is_none() {
            self.stats = other.stats;
        }
    }

    /// Names for which nothing was found
    pub fn missing(&self) -> impl Iterator<Item = &LookupResult> {
        self.results.iter().filter(|r| !r.is_found())
    }
}

impl FromIterator<LookupResult> for LookupReport {
    fn from_iter<I: IntoIterator<Item = LookupResult>>(iter: I) -> Self {
        let mut report = LookupReport::new();
        for result in iter {
            report.add_result(result);
        }
        report
    }
}
