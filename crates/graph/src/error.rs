use atlas_model::ServerIdentity;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection or timeout failure; safe to retry
    #[error("transient store error: {0}")]
    Transient(String),

    #[error("constraint conflict on {key}: {reason}")]
    ConstraintConflict { key: String, reason: String },

    #[error("{rel} edge references missing node {key}")]
    MissingEndpoint { rel: String, key: String },

    #[error("graph store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A server whose writes were rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ingestion of {server} rolled back: {source}")]
pub struct IngestError {
    pub server: ServerIdentity,
    #[source]
    pub source: StoreError,
}

impl IngestError {
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}
