use crate::error::{ExtractorError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for file discovery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Conventional source roots; depth is measured from these when present
    pub roots: Vec<String>,

    /// Maximum directory depth below a root
    pub max_depth: usize,

    /// Files above this size are skipped
    pub max_file_bytes: usize,

    /// Directory names that are never descended into (case-insensitive)
    pub skip_dirs: Vec<String>,

    /// File-name tokens marking test, build and tooling files
    pub skip_name_tokens: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            roots: ["src", "lib", "operations", "tools"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_depth: 3,
            max_file_bytes: 1024 * 1024,
            skip_dirs: [
                "node_modules",
                ".git",
                "dist",
                "build",
                "__pycache__",
                ".pytest_cache",
                "coverage",
                ".nyc_output",
                ".vscode",
                ".idea",
                "target",
                "bin",
                "obj",
                "vendor",
                "__tests__",
                ".venv",
                "venv",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            skip_name_tokens: [
                "test", "tests", "spec", "specs", "build", "dist", "webpack", "babel",
                "eslint", "prettier", "d",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl DiscoveryConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ExtractorError::invalid_config(
                "max_depth must be greater than 0",
            ));
        }

        if self.max_file_bytes == 0 {
            return Err(ExtractorError::invalid_config(
                "max_file_bytes must be greater than 0",
            ));
        }

        if self.roots.iter().any(|r| r.trim().is_empty() || r.contains('/')) {
            return Err(ExtractorError::invalid_config(
                "roots must be single, non-empty directory names",
            ));
        }

        Ok(())
    }

    pub(crate) fn is_skipped_dir(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|d| d.eq_ignore_ascii_case(name))
    }

    pub(crate) fn is_root(&self, name: &str) -> bool {
        self.roots.iter().any(|r| r == name)
    }

    /// `webpack.config.js`, `server.test.ts` and `test_tools.py` are skipped;
    /// `latest.ts` is not.
    pub(crate) fn is_skipped_name(&self, file_name: &str) -> bool {
        let stem_tokens = file_name
            .split(['.', '_', '-'])
            .filter(|t| !t.is_empty())
            .map(|t| t.to_ascii_lowercase());
        let mut tokens: Vec<String> = stem_tokens.collect();
        // the extension itself is never a skip token
        tokens.pop();
        tokens
            .iter()
            .any(|t| self.skip_name_tokens.iter().any(|s| s == t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_file_bytes, 1024 * 1024);
    }

    #[test]
    fn test_invalid_config() {
        let config = DiscoveryConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DiscoveryConfig {
            roots: vec!["src/main".into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_skipped_names() {
        let config = DiscoveryConfig::default();
        assert!(config.is_skipped_name("server.test.ts"));
        assert!(config.is_skipped_name("test_tools.py"));
        assert!(config.is_skipped_name("webpack.config.js"));
        assert!(config.is_skipped_name("build-tools.ts"));
        assert!(config.is_skipped_name("index.d.ts"));
        assert!(!config.is_skipped_name("latest.ts"));
        assert!(!config.is_skipped_name("index.ts"));
        assert!(!config.is_skipped_name("contest_tools.py"));
    }

    #[test]
    fn test_skipped_dirs_ignore_case() {
        let config = DiscoveryConfig::default();
        assert!(config.is_skipped_dir("Node_Modules"));
        assert!(!config.is_skipped_dir("handlers"));
    }
}
