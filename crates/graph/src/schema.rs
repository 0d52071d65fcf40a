//! Published graph schema: node labels, relationship types and the
//! uniqueness constraints every upsert is keyed by.

use atlas_model::CapabilityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    #[serde(rename = "MCPServer")]
    McpServer,
    Tool,
    Prompt,
    Resource,
    Repository,
    Package,
    Category,
    Domain,
    Language,
    Framework,
    License,
    Organization,
    Developer,
    Version,
    Dependency,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 15] = [
        Self::McpServer,
        Self::Tool,
        Self::Prompt,
        Self::Resource,
        Self::Repository,
        Self::Package,
        Self::Category,
        Self::Domain,
        Self::Language,
        Self::Framework,
        Self::License,
        Self::Organization,
        Self::Developer,
        Self::Version,
        Self::Dependency,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::McpServer => "MCPServer",
            Self::Tool => "Tool",
            Self::Prompt => "Prompt",
            Self::Resource => "Resource",
            Self::Repository => "Repository",
            Self::Package => "Package",
            Self::Category => "Category",
            Self::Domain => "Domain",
            Self::Language => "Language",
            Self::Framework => "Framework",
            Self::License => "License",
            Self::Organization => "Organization",
            Self::Developer => "Developer",
            Self::Version => "Version",
            Self::Dependency => "Dependency",
        }
    }

    /// Properties that together identify one node of this label
    pub const fn key_properties(self) -> &'static [&'static str] {
        match self {
            Self::Tool | Self::Prompt | Self::Resource => &["name", "server_name"],
            Self::Repository => &["url"],
            Self::Package | Self::Dependency => &["name", "ecosystem"],
            Self::Developer => &["identifier"],
            Self::Version => &["number", "package_name"],
            Self::McpServer
            | Self::Category
            | Self::Domain
            | Self::Language
            | Self::Framework
            | Self::License
            | Self::Organization => &["name"],
        }
    }

    pub const fn for_kind(kind: CapabilityKind) -> Self {
        match kind {
            CapabilityKind::Tool => Self::Tool,
            CapabilityKind::Prompt => Self::Prompt,
            CapabilityKind::Resource => Self::Resource,
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelType {
    ProvidesTool,
    ProvidesPrompt,
    ProvidesResource,
    /// `{confidence, assigned_at}`
    BelongsToCategory,
    /// `{relevance_score, assigned_at}`
    OperatesInDomain,
    /// `{lines_of_code, percentage}`
    ImplementedIn,
    UsesFramework,
    HostedIn,
    PackagedAs,
    LicensedUnder,
    Maintains,
    ContributesTo,
    HasVersion,
    DependsOn,
}

impl RelType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProvidesTool => "PROVIDES_TOOL",
            Self::ProvidesPrompt => "PROVIDES_PROMPT",
            Self::ProvidesResource => "PROVIDES_RESOURCE",
            Self::BelongsToCategory => "BELONGS_TO_CATEGORY",
            Self::OperatesInDomain => "OPERATES_IN_DOMAIN",
            Self::ImplementedIn => "IMPLEMENTED_IN",
            Self::UsesFramework => "USES_FRAMEWORK",
            Self::HostedIn => "HOSTED_IN",
            Self::PackagedAs => "PACKAGED_AS",
            Self::LicensedUnder => "LICENSED_UNDER",
            Self::Maintains => "MAINTAINS",
            Self::ContributesTo => "CONTRIBUTES_TO",
            Self::HasVersion => "HAS_VERSION",
            Self::DependsOn => "DEPENDS_ON",
        }
    }

    /// Relationship from a server to a capability of this kind
    pub const fn provides(kind: CapabilityKind) -> Self {
        match kind {
            CapabilityKind::Tool => Self::ProvidesTool,
            CapabilityKind::Prompt => Self::ProvidesPrompt,
            CapabilityKind::Resource => Self::ProvidesResource,
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node-key uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    pub label: NodeLabel,
    pub properties: &'static [&'static str],
}

impl Constraint {
    /// `tool_name_server_name_unique`
    pub fn name(&self) -> String {
        format!(
            "{}_{}_unique",
            self.label.as_str().to_ascii_lowercase(),
            self.properties.join("_")
        )
    }

    pub fn to_cypher(&self) -> String {
        let properties = self
            .properties
            .iter()
            .map(|p| format!("n.{p}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE ({properties}) IS UNIQUE",
            self.name(),
            self.label
        )
    }
}

/// One uniqueness constraint per label
pub fn constraints() -> Vec<Constraint> {
    NodeLabel::ALL
        .iter()
        .map(|&label| Constraint {
            label,
            properties: label.key_properties(),
        })
        .collect()
}
