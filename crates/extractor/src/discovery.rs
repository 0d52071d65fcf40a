use crate::config::DiscoveryConfig;
use crate::ecosystem::Ecosystem;
use crate::error::ExtractIssue;
use crate::stats::ExtractionStats;
use atlas_model::{RepositorySnapshot, SnapshotEntry};
use std::collections::BTreeMap;

/// A snapshot file selected for scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile<'s> {
    pub path: &'s str,
    pub ecosystem: Ecosystem,
    /// Decoded content without a leading byte-order mark
    pub text: &'s str,
}

impl DiscoveredFile<'_> {
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Select the files of a snapshot worth scanning, sorted by path.
///
/// Pure function of the snapshot and config. Files that cannot be decoded or
/// exceed the size allowance are reported through `stats` and skipped.
pub fn discover<'s>(
    snapshot: &'s RepositorySnapshot,
    config: &DiscoveryConfig,
    stats: &mut ExtractionStats,
) -> Vec<DiscoveredFile<'s>> {
    // later duplicates of a path lose; BTreeMap gives the path order
    let mut selected: BTreeMap<&'s str, DiscoveredFile<'s>> = BTreeMap::new();

    for entry in snapshot.entries() {
        stats.files_seen += 1;
        if selected.contains_key(entry.path.as_str()) {
            log::debug!("Ignoring duplicate snapshot entry {}", entry.path);
            stats.files_skipped += 1;
            continue;
        }

        let Some(ecosystem) = classify(entry, config) else {
            stats.files_skipped += 1;
            continue;
        };

        if entry.size() > config.max_file_bytes {
            let issue = ExtractIssue::OversizedFile {
                path: entry.path.clone(),
                size: entry.size(),
                limit: config.max_file_bytes,
            };
            log::warn!("{issue}");
            stats.oversized_files += 1;
            stats.add_issue(issue.to_string());
            continue;
        }

        let text = match entry.text() {
            Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text),
            Err(err) => {
                let issue = ExtractIssue::UnreadableFile {
                    path: entry.path.clone(),
                    reason: err.to_string(),
                };
                log::warn!("{issue}");
                stats.unreadable_files += 1;
                stats.add_issue(issue.to_string());
                continue;
            }
        };

        selected.insert(
            entry.path.as_str(),
            DiscoveredFile {
                path: entry.path.as_str(),
                ecosystem,
                text,
            },
        );
    }

    let files: Vec<_> = selected.into_values().collect();
    for file in &files {
        if file.ecosystem.is_code() {
            stats.add_file(file.ecosystem.display_name(), file.line_count());
        }
    }

    log::debug!(
        "Discovered {} of {} snapshot files",
        files.len(),
        snapshot.len()
    );
    files
}

/// Ecosystem of an entry that passes the path rules
fn classify(entry: &SnapshotEntry, config: &DiscoveryConfig) -> Option<Ecosystem> {
    let mut components: Vec<&str> = entry.path.split('/').filter(|c| !c.is_empty()).collect();
    let file_name = components.pop()?;

    if components.iter().any(|dir| config.is_skipped_dir(dir)) {
        return None;
    }

    let depth = match components.first() {
        Some(first) if config.is_root(first) => components.len() - 1,
        _ => components.len(),
    };
    if depth > config.max_depth {
        log::trace!("Skipping {} below depth {}", entry.path, config.max_depth);
        return None;
    }

    let by_extension = Ecosystem::from_path(file_name);
    if by_extension == Ecosystem::Markdown {
        let is_readme = file_name.to_ascii_lowercase().starts_with("readme");
        return is_readme.then_some(Ecosystem::Markdown);
    }

    if config.is_skipped_name(file_name) {
        return None;
    }

    let hinted = entry
        .language_hint
        .as_deref()
        .map(Ecosystem::from_hint)
        .filter(|e| e.is_code());
    match hinted {
        Some(ecosystem) if by_extension != Ecosystem::Unknown => Some(ecosystem),
        _ => by_extension.is_code().then_some(by_extension),
    }
}
