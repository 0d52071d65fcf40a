use crate::config::DiscoveryConfig;
use crate::discovery::{discover, DiscoveredFile};
use crate::error::Result;
use crate::frameworks::detect_frameworks;
use crate::matchers::SourceFile;
use crate::merger::merge;
use crate::registry::MatcherRegistry;
use crate::stats::ExtractionStats;
use atlas_model::{
    CapabilityKind, CapabilityRecord, LanguageShare, RepositorySnapshot, ServerIdentity,
};
use serde::{Deserialize, Serialize};

/// Everything extracted from one server's snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerExtraction {
    /// Merged records, sorted by `(kind, name)`
    pub records: Vec<CapabilityRecord>,
    pub frameworks: Vec<String>,
    /// Sorted by descending line count
    pub languages: Vec<LanguageShare>,
    pub stats: ExtractionStats,
}

impl ServerExtraction {
    pub fn count(&self, kind: CapabilityKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    pub fn capability_names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }
}

/// Discovery, matching and merging for one server at a time.
///
/// Holds no per-server state; one instance can be shared by every worker.
#[derive(Debug, Clone)]
pub struct Extractor {
    registry: MatcherRegistry,
    config: DiscoveryConfig,
}

impl Extractor {
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        Self::with_registry(MatcherRegistry::standard(), config)
    }

    pub fn with_registry(registry: MatcherRegistry, config: DiscoveryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn registry(&self) -> &MatcherRegistry {
        &self.registry
    }

    /// Extract and merge the capabilities of one server
    pub fn extract(&self, server: &ServerIdentity, snapshot: &RepositorySnapshot) -> ServerExtraction {
        let mut stats = ExtractionStats::new();
        let files = discover(snapshot, &self.config, &mut stats);

        let (code, docs): (Vec<&DiscoveredFile<'_>>, Vec<&DiscoveredFile<'_>>) =
            files.iter().partition(|f| f.ecosystem.is_code());

        let mut candidates = Vec::new();
        for file in &code {
            let source = SourceFile::new(file.path, file.ecosystem, file.text);
            candidates.extend(self.registry.extract_file(&source, &mut stats));
        }

        if candidates.is_empty() {
            for file in docs
                .iter()
                .filter(|f| self.registry.has_fallback_for(f.ecosystem))
            {
                let source = SourceFile::new(file.path, file.ecosystem, file.text);
                candidates.extend(self.registry.extract_fallback(&source, &mut stats));
            }
            if !candidates.is_empty() {
                log::info!(
                    "{server}: no capabilities in code, {} taken from documentation",
                    candidates.len()
                );
                stats.fallback_used += 1;
            }
        }

        let records = merge(server, candidates);
        stats.records = records.len();
        let frameworks = detect_frameworks(snapshot, code.iter().map(|f| f.text));
        let languages = language_shares(&stats);

        log::debug!(
            "{server}: {} files scanned, {} candidates, {} records",
            stats.files_scanned,
            stats.candidates,
            records.len()
        );

        ServerExtraction {
            records,
            frameworks,
            languages,
            stats,
        }
    }
}

fn language_shares(stats: &ExtractionStats) -> Vec<LanguageShare> {
    let total = stats.total_lines();
    let mut shares: Vec<LanguageShare> = stats
        .languages
        .iter()
        .map(|(language, tally)| LanguageShare {
            language: language.clone(),
            lines_of_code: tally.lines,
            percentage: if total == 0 {
                0.0
            } else {
                (tally.lines as f64 * 10_000.0 / total as f64).round() / 100.0
            },
        })
        .collect();
    shares.sort_by(|a, b| {
        b.lines_of_code
            .cmp(&a.lines_of_code)
            .then_with(|| a.language.cmp(&b.language))
    });
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extractor() -> Extractor {
        Extractor::new(DiscoveryConfig::default()).unwrap()
    }

    #[test]
    fn readme_only_used_without_code_matches() {
        let readme = "## Tools\n- fetch_page: Fetch a page\n";
        let with_code = RepositorySnapshot::from_files([
            ("README.md", readme),
            ("src/index.ts", "server.tool(\"fetch_url\", \"Fetch a URL\", {}, async () => {});"),
        ]);
        let without_code = RepositorySnapshot::from_files([("README.md", readme)]);
        let server = ServerIdentity::new("fetch");

        let found = extractor().extract(&server, &with_code);
        assert_eq!(found.capability_names().collect::<Vec<_>>(), vec!["fetch_url"]);
        assert_eq!(found.stats.fallback_used, 0);

        let found = extractor().extract(&server, &without_code);
        assert_eq!(found.capability_names().collect::<Vec<_>>(), vec!["fetch_page"]);
        assert_eq!(found.records[0].confidence, 0.3);
        assert_eq!(found.stats.fallback_used, 1);
    }

    #[test]
    fn language_percentages() {
        let snapshot = RepositorySnapshot::from_files([
            ("src/a.ts", "a\nb\nc\n"),
            ("tools/b.py", "x = 1\n"),
        ]);
        let found = extractor().extract(&ServerIdentity::new("s"), &snapshot);
        assert_eq!(
            found.languages,
            vec![
                LanguageShare {
                    language: "TypeScript".into(),
                    lines_of_code: 3,
                    percentage: 75.0
                },
                LanguageShare {
                    language: "Python".into(),
                    lines_of_code: 1,
                    percentage: 25.0
                },
            ]
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = DiscoveryConfig {
            max_file_bytes: 0,
            ..Default::default()
        };
        assert!(Extractor::new(config).is_err());
    }
}
