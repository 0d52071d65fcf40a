//! # Atlas Graph
//!
//! Idempotent ingestion of extracted servers into a property graph.
//!
//! ## Architecture
//!
//! ```text
//! ServerProfile + CapabilityRecord* + CategoryAssignment*
//!     │
//!     ├──> build_batch
//!     │      └─ NodeUpsert / EdgeUpsert keyed by the uniqueness constraints
//!     │
//!     ├──> KeyLocks (sorted per-key acquisition)
//!     │
//!     └──> GraphStore::commit (all of a server's writes, or none)
//!            ├─ MemoryGraphStore (petgraph)
//!            └─ cypher::render_batch for external stores
//! ```
//!
//! ## Example
//!
//! ```
//! use atlas_graph::{build_batch, IngestRequest, NodeLabel};
//! use atlas_model::ServerProfile;
//!
//! let profile = ServerProfile::new("fetch").with_topics(["web"]);
//! let batch = build_batch(IngestRequest::new(&profile, &[]), chrono::Utc::now());
//!
//! assert_eq!(batch.nodes.len(), 1);
//! assert_eq!(batch.nodes[0].key.label, NodeLabel::McpServer);
//! ```

pub mod cypher;
mod error;
mod ingestor;
mod locks;
mod memory;
pub mod schema;
mod store;
mod types;

pub use error::{IngestError, Result, StoreError};
pub use ingestor::{build_batch, GraphIngestor, IngestRequest};
pub use locks::{KeyGuards, KeyLocks};
pub use memory::MemoryGraphStore;
pub use schema::{constraints, Constraint, NodeLabel, RelType};
pub use store::GraphStore;
pub use types::{
    EdgeUpsert, GraphStatistics, IngestResult, IngestState, NodeKey, NodeUpsert, Properties,
    WriteBatch,
};
