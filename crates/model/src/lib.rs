//! # Atlas Model
//!
//! Types shared by every stage of the extraction and ingestion core.
//!
//! ```text
//! RepositorySnapshot ──> CapabilityCandidate* ──> CapabilityRecord ──> ExportRow
//!        │                                              │
//! ServerProfile ─────────────> CategoryAssignment* ─────┴──> graph upserts
//! ```
//!
//! Candidates are produced once and never mutated; records are the merged,
//! canonical form keyed by `(kind, name, server)`.

mod capability;
mod confidence;
mod error;
mod server;
mod snapshot;

pub use capability::{
    CandidateKey, CapabilityCandidate, CapabilityKind, CapabilityRecord, ExportRow,
};
pub use confidence::{clamp_confidence, Confidence};
pub use error::{ModelError, Result};
pub use server::{
    CategoryAssignment, Contributor, LanguageShare, LicenseInfo, OrganizationInfo, PackageInfo, RepositoryInfo,
    ServerIdentity, ServerProfile,
};
pub use snapshot::{RepositorySnapshot, SnapshotEntry};
