use crate::ecosystem::Ecosystem;
use crate::matchers::{
    AnnotationMatcher, CapabilityMatcher, ConstantTableMatcher, ExportPatternMatcher,
    ReadmeFallbackMatcher, RegistrationCallMatcher, SourceFile, StructLiteralMatcher,
};
use crate::stats::ExtractionStats;
use atlas_model::CapabilityCandidate;
use std::sync::Arc;

/// Ordered set of matchers applied to every discovered file.
///
/// Matchers are independent: each sees the whole file and may produce
/// overlapping candidates, which the merger reconciles.
#[derive(Clone, Default)]
pub struct MatcherRegistry {
    primary: Vec<Arc<dyn CapabilityMatcher>>,
    fallback: Vec<Arc<dyn CapabilityMatcher>>,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in matcher, strongest first
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RegistrationCallMatcher));
        registry.register(Arc::new(AnnotationMatcher));
        registry.register(Arc::new(ConstantTableMatcher));
        registry.register(Arc::new(StructLiteralMatcher));
        registry.register(Arc::new(ExportPatternMatcher));
        registry.register_fallback(Arc::new(ReadmeFallbackMatcher));
        registry
    }

    /// Add a matcher that runs on every file of its ecosystems
    pub fn register(&mut self, matcher: Arc<dyn CapabilityMatcher>) -> &mut Self {
        log::trace!("Registered matcher {}", matcher.id());
        self.primary.push(matcher);
        self
    }

    /// Add a matcher consulted only when primary matchers find nothing
    pub fn register_fallback(&mut self, matcher: Arc<dyn CapabilityMatcher>) -> &mut Self {
        log::trace!("Registered fallback matcher {}", matcher.id());
        self.fallback.push(matcher);
        self
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.primary
            .iter()
            .chain(&self.fallback)
            .map(|m| m.id())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.fallback.is_empty()
    }

    /// Run the primary matchers over one file
    pub fn extract_file(
        &self,
        file: &SourceFile<'_>,
        stats: &mut ExtractionStats,
    ) -> Vec<CapabilityCandidate> {
        run_matchers(&self.primary, file, stats)
    }

    /// Run the fallback matchers over one file
    pub fn extract_fallback(
        &self,
        file: &SourceFile<'_>,
        stats: &mut ExtractionStats,
    ) -> Vec<CapabilityCandidate> {
        run_matchers(&self.fallback, file, stats)
    }

    /// Whether any fallback matcher reads this ecosystem
    pub fn has_fallback_for(&self, ecosystem: Ecosystem) -> bool {
        self.fallback.iter().any(|m| m.applies_to(ecosystem))
    }
}

fn run_matchers(
    matchers: &[Arc<dyn CapabilityMatcher>],
    file: &SourceFile<'_>,
    stats: &mut ExtractionStats,
) -> Vec<CapabilityCandidate> {
    let mut candidates = Vec::new();
    for matcher in matchers.iter().filter(|m| m.applies_to(file.ecosystem)) {
        let extraction = matcher.extract(file);
        for issue in &extraction.issues {
            log::warn!("{issue}");
            stats.malformed_candidates += 1;
            stats.add_issue(issue.to_string());
        }
        if !extraction.candidates.is_empty() {
            log::debug!(
                "{} found {} candidates in {}",
                matcher.id(),
                extraction.candidates.len(),
                file.path
            );
        }
        stats.add_candidates(matcher.id(), extraction.candidates.len());
        candidates.extend(extraction.candidates);
    }
    candidates
}

impl std::fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("matchers", &self.ids())
            .finish()
    }
}
