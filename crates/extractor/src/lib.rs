//! # Atlas Extractor
//!
//! Pattern-based discovery of MCP capabilities in heterogeneous source trees.
//!
//! ## Pipeline
//!
//! ```text
//! RepositorySnapshot
//!     │
//!     ├──> Discovery (roots, depth, skip rules, size allowance)
//!     │      └─> DiscoveredFile* (path-sorted)
//!     │
//!     ├──> MatcherRegistry (per file, per ecosystem)
//!     │      ├─> registration_call · annotation · constant_table
//!     │      ├─> struct_literal · export_pattern
//!     │      └─> readme_fallback (only when code yields nothing)
//!     │
//!     └──> merge (per server)
//!            └─> CapabilityRecord* sorted by (kind, name)
//! ```
//!
//! Matchers never fail a pass: unreadable files and malformed constructs are
//! logged, counted in [`ExtractionStats`] and skipped.
//!
//! ## Example
//!
//! ```
//! use atlas_extractor::{DiscoveryConfig, Extractor};
//! use atlas_model::{RepositorySnapshot, ServerIdentity};
//!
//! let snapshot = RepositorySnapshot::from_files([(
//!     "src/index.ts",
//!     r#"server.tool("echo", "Echo the input", { text: z.string() }, async () => ({}));"#,
//! )]);
//! let extractor = Extractor::new(DiscoveryConfig::default())?;
//! let found = extractor.extract(&ServerIdentity::new("echo-server"), &snapshot);
//!
//! assert_eq!(found.records.len(), 1);
//! assert_eq!(found.records[0].parameters_count, 1);
//! # Ok::<(), atlas_extractor::ExtractorError>(())
//! ```

mod config;
mod discovery;
mod ecosystem;
mod error;
mod extract;
mod frameworks;
mod lexer;
pub mod matchers;
mod merger;
mod registry;
mod resolve;
mod stats;
mod values;

pub use config::DiscoveryConfig;
pub use discovery::{discover, DiscoveredFile};
pub use ecosystem::Ecosystem;
pub use error::{ExtractIssue, ExtractorError, Result};
pub use extract::{Extractor, ServerExtraction};
pub use frameworks::detect_frameworks;
pub use matchers::{CapabilityMatcher, Extraction, SourceFile};
pub use merger::merge;
pub use registry::MatcherRegistry;
pub use stats::{ExtractionStats, LanguageTally};
