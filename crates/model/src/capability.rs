use crate::confidence::{clamp_confidence, Confidence};
use crate::server::ServerIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three capability shapes an MCP server can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Tool,
    Prompt,
    Resource,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 3] = [Self::Tool, Self::Prompt, Self::Resource];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Prompt => "prompt",
            Self::Resource => "resource",
        }
    }

    /// Infer the kind from an identifier such as `TOOLS`, `listPrompts` or
    /// `mcp.Resource`. Resource wins over prompt wins over tool.
    #[must_use]
    pub fn from_identifier(ident: &str) -> Option<Self> {
        let lowered = ident.to_ascii_lowercase();
        if lowered.contains("resource") {
            Some(Self::Resource)
        } else if lowered.contains("prompt") {
            Some(Self::Prompt)
        } else if lowered.contains("tool") {
            Some(Self::Tool)
        } else {
            None
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unmerged, matcher-produced guess at one capability definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityCandidate {
    pub kind: CapabilityKind,
    pub name: String,
    /// Empty when the matcher found no description.
    pub description: String,
    pub parameter_count: usize,
    /// Snapshot-relative path of the file the candidate came from.
    pub source_file: String,
    pub source_matcher: String,
    pub confidence: Confidence,
    /// Resource URI or URI template, when one was declared.
    pub uri: Option<String>,
    /// Byte offset of the match inside `source_file`.
    pub offset: usize,
}

impl CapabilityCandidate {
    /// Start a candidate; confidence is clamped into `[0, 1]`.
    #[must_use]
    pub fn new(
        kind: CapabilityKind,
        name: impl Into<String>,
        source_file: impl Into<String>,
        source_matcher: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            kind,
            name: name.into().trim().to_string(),
            description: String::new(),
            parameter_count: 0,
            source_file: source_file.into(),
            source_matcher: source_matcher.into(),
            confidence: clamp_confidence(confidence),
            uri: None,
            offset: 0,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl AsRef<str>) -> Self {
        self.description = normalize_description(description.as_ref());
        self
    }

    #[must_use]
    pub fn parameters(mut self, count: usize) -> Self {
        self.parameter_count = count;
        self
    }

    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn at(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn key(&self) -> CandidateKey {
        CandidateKey {
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}

/// Collapse runs of whitespace so multi-line literals compare equal.
fn normalize_description(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Grouping key inside one server's candidate set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateKey {
    pub kind: CapabilityKind,
    pub name: String,
}

/// Canonical capability definition for one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRecord {
    pub kind: CapabilityKind,
    pub name: String,
    pub description: String,
    pub server_name: ServerIdentity,
    pub parameters_count: usize,
    pub uri: Option<String>,
    pub source_file: String,
    pub source_matcher: String,
    pub confidence: Confidence,
}

impl CapabilityRecord {
    #[must_use]
    pub fn from_candidate(server: &ServerIdentity, candidate: CapabilityCandidate) -> Self {
        Self {
            kind: candidate.kind,
            name: candidate.name,
            description: candidate.description,
            server_name: server.clone(),
            parameters_count: candidate.parameter_count,
            uri: candidate.uri,
            source_file: candidate.source_file,
            source_matcher: candidate.source_matcher,
            confidence: candidate.confidence,
        }
    }

    #[must_use]
    pub fn export_row(&self) -> ExportRow {
        ExportRow {
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            server_name: self.server_name.to_string(),
            parameters_count: self.parameters_count,
        }
    }
}

/// Flat row consumed by JSON/CSV exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub kind: CapabilityKind,
    pub name: String,
    pub description: String,
    pub server_name: String,
    pub parameters_count: usize,
}
