use crate::error::{PipelineError, Result};
use crate::retry::RetryPolicy;
use anyhow::Context;
use atlas_extractor::DiscoveryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAX_CONCURRENCY: usize = 32;
pub const CONCURRENCY_ENV: &str = "ATLAS_CONCURRENCY";

/// Run-scoped configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stop scheduling new servers after this many; `None` processes all
    pub max_servers: Option<usize>,

    /// When off, servers are ingested without capability records
    pub extraction_enabled: bool,

    /// When off, no category or domain edges are written
    pub classification_enabled: bool,

    /// Servers processed at the same time
    pub concurrency: usize,

    pub retry: RetryPolicy,

    pub discovery: DiscoveryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_servers: None,
            extraction_enabled: true,
            classification_enabled: true,
            concurrency: default_concurrency(),
            retry: RetryPolicy::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse pipeline config {}", path.display()))?;
        Ok(config.with_env_overrides())
    }

    /// `ATLAS_CONCURRENCY`, when set and numeric, replaces `concurrency`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        let raw = std::env::var(CONCURRENCY_ENV).ok();
        self.concurrency = parse_concurrency(raw.as_deref(), self.concurrency);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(PipelineError::config(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}"
            )));
        }
        if self.max_servers == Some(0) {
            return Err(PipelineError::config("max_servers must be greater than 0"));
        }
        self.retry.validate()?;
        self.discovery
            .validate()
            .map_err(|e| PipelineError::config(e.to_string()))
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, 8)
}

fn parse_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_CONCURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_concurrency_defaults_and_clamps() {
        assert_eq!(parse_concurrency(None, 4), 4);
        assert_eq!(parse_concurrency(Some("  "), 4), 4);
        assert_eq!(parse_concurrency(Some("abc"), 4), 4);
        assert_eq!(parse_concurrency(Some("0"), 4), 1);
        assert_eq!(parse_concurrency(Some("999"), 4), MAX_CONCURRENCY);
        assert_eq!(parse_concurrency(Some(" 6 "), 4), 6);
    }

    #[test]
    fn toml_fields_default_individually() {
        let config = PipelineConfig::from_toml_str(
            r#"
max_servers = 10
classification_enabled = false
concurrency = 2

[retry]
max_attempts = 5

[discovery]
max_depth = 4
"#,
        )
        .unwrap();

        assert_eq!(config.max_servers, Some(10));
        assert!(config.extraction_enabled);
        assert!(!config.classification_enabled);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 200);
        assert_eq!(config.discovery.max_depth, 4);
        assert_eq!(config.discovery.max_file_bytes, 1024 * 1024);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("concurrency = 0"),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("max_servers = 0"),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("concurrency = \"many\""),
            Err(PipelineError::Toml(_))
        ));
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.toml");
        std::fs::write(&path, "concurrency = 3\n").unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap().retry, RetryPolicy::default());

        let missing = dir.path().join("missing.toml");
        let err = PipelineConfig::load(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
