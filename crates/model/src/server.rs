use crate::confidence::{clamp_confidence, Confidence};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Stable key for a server: its registry name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerIdentity(String);

impl ServerIdentity {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Repository metadata as delivered by the upstream crawler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub url: String,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub primary_language: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub is_fork: bool,
    #[serde(default)]
    pub is_archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    /// npm, pypi, cargo, go, nuget, maven
    pub ecosystem: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// dependency name -> version constraint
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub name: String,
    #[serde(default)]
    pub spdx_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationInfo {
    pub name: String,
    /// company, individual, community, academic, government
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Platform username.
    pub identifier: String,
    #[serde(default)]
    pub contributions: u64,
}

/// Everything the core knows about a server besides its source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    pub identity: ServerIdentity,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub repository: Option<RepositoryInfo>,
    #[serde(default)]
    pub packages: Vec<PackageInfo>,
    #[serde(default)]
    pub license: Option<LicenseInfo>,
    #[serde(default)]
    pub organization: Option<OrganizationInfo>,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
}

impl ServerProfile {
    #[must_use]
    pub fn new(identity: impl Into<ServerIdentity>) -> Self {
        Self {
            identity: identity.into(),
            description: None,
            topics: Vec::new(),
            repository: None,
            packages: Vec::new(),
            license: None,
            organization: None,
            contributors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: RepositoryInfo) -> Self {
        self.repository = Some(repository);
        self
    }
}

impl From<String> for ServerIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Share of a server's scanned code written in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub language: String,
    pub lines_of_code: usize,
    /// Percentage of scanned lines, `0.0..=100.0`.
    pub percentage: f64,
}

/// One category (or domain) a server was assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssignment {
    pub category: String,
    pub confidence: Confidence,
}

impl CategoryAssignment {
    #[must_use]
    pub fn new(category: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            category: category.into(),
            confidence: clamp_confidence(confidence),
        }
    }

    /// Descending confidence, ties broken by category name.
    pub fn ordering(a: &Self, b: &Self) -> Ordering {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.category.cmp(&b.category))
    }
}
