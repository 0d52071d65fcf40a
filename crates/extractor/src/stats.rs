use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Files and lines seen for one language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTally {
    pub files: usize,
    pub lines: usize,
}

/// Counters for an extraction pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Snapshot entries examined
    pub files_seen: usize,

    /// Files that passed discovery
    pub files_scanned: usize,

    /// Files rejected by path, name or ecosystem rules
    pub files_skipped: usize,

    pub unreadable_files: usize,
    pub oversized_files: usize,

    /// Candidates emitted by matchers, before merging
    pub candidates: usize,

    pub malformed_candidates: usize,

    /// Records that survived merging
    pub records: usize,

    /// Servers where only the documentation fallback produced results
    pub fallback_used: usize,

    /// Candidates per matcher
    pub per_matcher: BTreeMap<String, usize>,

    /// Per-language tallies for scanned code files
    pub languages: BTreeMap<String, LanguageTally>,

    /// Human-readable issue log
    pub issues: Vec<String>,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, language: &str, lines: usize) {
        self.files_scanned += 1;
        let tally = self.languages.entry(language.to_string()).or_default();
        tally.files += 1;
        tally.lines += lines;
    }

    pub fn add_candidates(&mut self, matcher: &str, count: usize) {
        if count == 0 {
            return;
        }
        self.candidates += count;
        *self.per_matcher.entry(matcher.to_string()).or_insert(0) += count;
    }

    pub fn add_issue(&mut self, issue: String) {
        self.issues.push(issue);
    }

    pub fn total_lines(&self) -> usize {
        self.languages.values().map(|t| t.lines).sum()
    }

    /// Fold another pass into this one
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.files_seen += other.files_seen;
        self.files_scanned += other.files_scanned;
        self.files_skipped += other.files_skipped;
        self.unreadable_files += other.unreadable_files;
        self.oversized_files += other.oversized_files;
        self.candidates += other.candidates;
        self.malformed_candidates += other.malformed_candidates;
        self.records += other.records;
        self.fallback_used += other.fallback_used;
        for (matcher, count) in &other.per_matcher {
            *self.per_matcher.entry(matcher.clone()).or_insert(0) += count;
        }
        for (language, tally) in &other.languages {
            let entry = self.languages.entry(language.clone()).or_default();
            entry.files += tally.files;
            entry.lines += tally.lines;
        }
        self.issues.extend(other.issues.iter().cloned());
    }
}
