//! # Atlas Classifier
//!
//! Assigns functional categories and business domains to MCP servers from
//! their description, topics and capability names.
//!
//! ```text
//! description ─┐
//! topics ──────┼──> word streams ──> keyword hits per label ──> score / total weight
//! tool names ──┘     (names split on _ - and camel humps)            │
//!                                                       threshold (0.15) + sort
//! ```
//!
//! ## Example
//!
//! ```
//! use atlas_classifier::{Classifier, ClassifierInput};
//!
//! let classifier = Classifier::default();
//! let result = classifier.classify(ClassifierInput {
//!     description: "Query a PostgreSQL database with read-only SQL",
//!     ..Default::default()
//! });
//! assert_eq!(result.categories[0].category, "database");
//! ```

mod classifier;
mod error;
mod taxonomy;

pub use classifier::{Classification, Classifier, ClassifierInput, DEFAULT_THRESHOLD};
pub use error::{ClassifierError, Result};
pub use taxonomy::{Dictionary, Taxonomy};
