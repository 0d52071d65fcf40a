use crate::error::{ModelError, Result};
use std::path::{Component, Path};
use walkdir::WalkDir;

/// One file of a server's source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Forward-slash, root-relative path.
    pub path: String,
    /// Language reported by the producer, if any (e.g. "TypeScript").
    pub language_hint: Option<String>,
    pub content: Vec<u8>,
}

impl SnapshotEntry {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            language_hint: None,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn with_language_hint(mut self, hint: impl Into<String>) -> Self {
        self.language_hint = Some(hint.into());
        self
    }

    /// Decode the content as UTF-8.
    pub fn text(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.content)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Immutable view of one server's source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySnapshot {
    entries: Vec<SnapshotEntry>,
}

impl RepositorySnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    /// Convenience for tests and in-memory producers.
    #[must_use]
    pub fn from_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<Vec<u8>>,
    {
        Self {
            entries: files
                .into_iter()
                .map(|(path, content)| SnapshotEntry::new(path, content))
                .collect(),
        }
    }

    /// Build a snapshot from a checked-out tree. Unreadable files are skipped
    /// with a warning; `.git` is never descended into.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ModelError::InvalidRoot(root.display().to_string()));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Failed to read entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative_path_string(relative);

            match std::fs::read(entry.path()) {
                Ok(content) => entries.push(SnapshotEntry::new(relative, content)),
                Err(err) => log::warn!("Skipping unreadable file {relative}: {err}"),
            }
        }

        log::debug!(
            "Loaded snapshot of {} files from {}",
            entries.len(),
            root.display()
        );
        Ok(Self { entries })
    }

    pub fn push(&mut self, entry: SnapshotEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn relative_path_string(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_path(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn entry_paths_are_normalized() {
        let entry = SnapshotEntry::new("./src\\tools//index.ts", "x");
        assert_eq!(entry.path, "src/tools/index.ts");
    }

    #[test]
    fn from_dir_collects_relative_paths_and_skips_git() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        fs::write(src.join("index.ts"), "export {}").unwrap();
        fs::write(temp.path().join(".git").join("HEAD"), "ref").unwrap();
        fs::write(temp.path().join("README.md"), "# demo").unwrap();

        let snapshot = RepositorySnapshot::from_dir(temp.path()).unwrap();
        let paths: Vec<_> = snapshot.entries().iter().map(|e| e.path.as_str()).collect();

        assert_eq!(paths, vec!["README.md", "src/index.ts"]);
    }

    #[test]
    fn from_dir_rejects_missing_root() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope");
        assert!(matches!(
            RepositorySnapshot::from_dir(missing),
            Err(crate::ModelError::InvalidRoot(_))
        ));
    }

    #[test]
    fn non_utf8_content_fails_to_decode() {
        let entry = SnapshotEntry::new("src/bin.py", vec![0xff, 0xfe, 0x00]);
        assert!(entry.text().is_err());
    }
}
