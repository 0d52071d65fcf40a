use crate::error::{IngestError, StoreError};
use crate::locks::KeyLocks;
use crate::schema::{constraints, NodeLabel, RelType};
use crate::store::GraphStore;
use crate::types::{EdgeUpsert, IngestResult, IngestState, NodeKey, NodeUpsert, WriteBatch};
use atlas_model::{
    CapabilityKind, CapabilityRecord, CategoryAssignment, LanguageShare, ServerProfile,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Everything written for one server.
#[derive(Debug, Clone, Copy)]
pub struct IngestRequest<'a> {
    pub profile: &'a ServerProfile,
    pub records: &'a [CapabilityRecord],
    pub categories: &'a [CategoryAssignment],
    pub domains: &'a [CategoryAssignment],
    pub languages: &'a [LanguageShare],
    pub frameworks: &'a [String],
}

impl<'a> IngestRequest<'a> {
    pub fn new(profile: &'a ServerProfile, records: &'a [CapabilityRecord]) -> Self {
        Self {
            profile,
            records,
            categories: &[],
            domains: &[],
            languages: &[],
            frameworks: &[],
        }
    }

    #[must_use]
    pub fn categories(mut self, categories: &'a [CategoryAssignment]) -> Self {
        self.categories = categories;
        self
    }

    #[must_use]
    pub fn domains(mut self, domains: &'a [CategoryAssignment]) -> Self {
        self.domains = domains;
        self
    }

    #[must_use]
    pub fn languages(mut self, languages: &'a [LanguageShare]) -> Self {
        self.languages = languages;
        self
    }

    #[must_use]
    pub fn frameworks(mut self, frameworks: &'a [String]) -> Self {
        self.frameworks = frameworks;
        self
    }

    fn count(&self, kind: CapabilityKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }
}

/// Turns one server's records and assignments into idempotent upserts and
/// commits them atomically, holding per-key locks for the batch's keys.
///
/// Never retries; retryable failures are reported through
/// [`IngestError::is_retryable`].
pub struct GraphIngestor {
    store: Arc<dyn GraphStore>,
    locks: KeyLocks,
}

impl GraphIngestor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    /// Register the uniqueness constraints with the store
    pub async fn prepare(&self) -> Result<(), StoreError> {
        self.store.ensure_constraints(&constraints()).await
    }

    pub async fn ingest(&self, request: IngestRequest<'_>) -> Result<IngestResult, IngestError> {
        let batch = build_batch(request, Utc::now());
        let server = batch.server.clone();

        let state = IngestState::Pending.begin();
        log::debug!(
            "{server}: {state} ({} nodes, {} edges)",
            batch.nodes.len(),
            batch.edges.len()
        );

        let committed = {
            let _guards = self.locks.acquire(&batch.lock_keys()).await;
            self.store.commit(&batch).await
        };

        match committed {
            Ok(result) => {
                let state = state.finish(Ok(()));
                log::debug!(
                    "{server}: {state}, {} nodes created, {} edges created",
                    result.nodes_created,
                    result.edges_created
                );
                Ok(result)
            }
            Err(source) => {
                let state = state.finish(Err(source.to_string()));
                log::warn!("{server}: {state}");
                Err(IngestError { server, source })
            }
        }
    }
}

/// Build the write batch for one server; `assigned_at` stamps the
/// category and domain edges.
pub fn build_batch(request: IngestRequest<'_>, assigned_at: DateTime<Utc>) -> WriteBatch {
    let profile = request.profile;
    let server = &profile.identity;
    let server_key = NodeKey::server(server);
    let assigned_at = assigned_at.to_rfc3339();
    let mut batch = WriteBatch::new(server.clone());

    batch.upsert_node(
        NodeUpsert::new(server_key.clone())
            .set_opt("description", profile.description.clone())
            .set("topics", profile.topics.clone())
            .set_opt(
                "repository_url",
                profile.repository.as_ref().map(|r| r.url.clone()),
            )
            .set("tools_count", request.count(CapabilityKind::Tool))
            .set("prompts_count", request.count(CapabilityKind::Prompt))
            .set("resources_count", request.count(CapabilityKind::Resource)),
    );

    for record in request.records {
        let key = NodeKey::capability(record.kind, &record.name, server);
        batch.upsert_node(
            NodeUpsert::new(key.clone())
                .set("description", record.description.clone())
                .set("parameters_count", record.parameters_count)
                .set("confidence", record.confidence)
                .set("source_file", record.source_file.clone())
                .set("source_matcher", record.source_matcher.clone())
                .set_opt("uri", record.uri.clone()),
        );
        batch.upsert_edge(EdgeUpsert::new(
            server_key.clone(),
            RelType::provides(record.kind),
            key,
        ));
    }

    for assignment in request.categories {
        let key = NodeKey::named(NodeLabel::Category, &assignment.category);
        batch.upsert_node(NodeUpsert::new(key.clone()));
        batch.upsert_edge(
            EdgeUpsert::new(server_key.clone(), RelType::BelongsToCategory, key)
                .set("confidence", assignment.confidence)
                .set("assigned_at", assigned_at.clone()),
        );
    }

    for assignment in request.domains {
        let key = NodeKey::named(NodeLabel::Domain, &assignment.category);
        batch.upsert_node(NodeUpsert::new(key.clone()));
        batch.upsert_edge(
            EdgeUpsert::new(server_key.clone(), RelType::OperatesInDomain, key)
                .set("relevance_score", assignment.confidence)
                .set("assigned_at", assigned_at.clone()),
        );
    }

    for share in request.languages {
        let key = NodeKey::named(NodeLabel::Language, &share.language);
        batch.upsert_node(NodeUpsert::new(key.clone()));
        batch.upsert_edge(
            EdgeUpsert::new(server_key.clone(), RelType::ImplementedIn, key)
                .set("lines_of_code", share.lines_of_code)
                .set("percentage", share.percentage),
        );
    }

    for framework in request.frameworks {
        let key = NodeKey::named(NodeLabel::Framework, framework);
        batch.upsert_node(NodeUpsert::new(key.clone()));
        batch.upsert_edge(EdgeUpsert::new(
            server_key.clone(),
            RelType::UsesFramework,
            key,
        ));
    }

    let repository_key = profile.repository.as_ref().map(|repo| {
        let key = NodeKey::named(NodeLabel::Repository, &repo.url);
        batch.upsert_node(
            NodeUpsert::new(key.clone())
                .identity("owner", repo.owner.clone())
                .identity("name", repo.name.clone())
                .set_opt("description", repo.description.clone())
                .set_opt("primary_language", repo.primary_language.clone())
                .set_opt("default_branch", repo.default_branch.clone())
                .set("stars", repo.stars)
                .set("forks", repo.forks)
                .set("is_fork", repo.is_fork)
                .set("is_archived", repo.is_archived),
        );
        batch.upsert_edge(EdgeUpsert::new(
            server_key.clone(),
            RelType::HostedIn,
            key.clone(),
        ));
        key
    });

    for package in &profile.packages {
        let package_key = NodeKey::new(
            NodeLabel::Package,
            [package.name.as_str(), package.ecosystem.as_str()],
        );
        batch.upsert_node(
            NodeUpsert::new(package_key.clone())
                .set_opt("version", package.version.clone())
                .set_opt("description", package.description.clone()),
        );
        batch.upsert_edge(EdgeUpsert::new(
            server_key.clone(),
            RelType::PackagedAs,
            package_key.clone(),
        ));

        if let Some(version) = &package.version {
            let key = NodeKey::new(NodeLabel::Version, [version.as_str(), package.name.as_str()]);
            batch.upsert_node(NodeUpsert::new(key.clone()));
            batch.upsert_edge(EdgeUpsert::new(
                package_key.clone(),
                RelType::HasVersion,
                key,
            ));
        }

        for (dependency, constraint) in &package.dependencies {
            let key = NodeKey::new(
                NodeLabel::Dependency,
                [dependency.as_str(), package.ecosystem.as_str()],
            );
            batch.upsert_node(NodeUpsert::new(key.clone()));
            batch.upsert_edge(
                EdgeUpsert::new(package_key.clone(), RelType::DependsOn, key)
                    .set("version_constraint", constraint.clone()),
            );
        }
    }

    if let Some(license) = &profile.license {
        let key = NodeKey::named(NodeLabel::License, &license.name);
        batch.upsert_node(NodeUpsert::new(key.clone()).set_opt("spdx_id", license.spdx_id.clone()));
        batch.upsert_edge(EdgeUpsert::new(
            server_key.clone(),
            RelType::LicensedUnder,
            key,
        ));
    }

    if let Some(organization) = &profile.organization {
        let key = NodeKey::named(NodeLabel::Organization, &organization.name);
        batch.upsert_node(NodeUpsert::new(key.clone()).set_opt("kind", organization.kind.clone()));
        batch.upsert_edge(EdgeUpsert::new(key, RelType::Maintains, server_key.clone()));
    }

    // contributions belong to the repository when there is one
    let contributed = repository_key.unwrap_or_else(|| server_key.clone());
    for contributor in &profile.contributors {
        let key = NodeKey::named(NodeLabel::Developer, &contributor.identifier);
        batch.upsert_node(NodeUpsert::new(key.clone()));
        batch.upsert_edge(
            EdgeUpsert::new(key, RelType::ContributesTo, contributed.clone())
                .set("contributions", contributor.contributions),
        );
    }

    batch
}
