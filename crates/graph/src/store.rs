use crate::error::Result;
use crate::schema::Constraint;
use crate::types::{GraphStatistics, IngestResult, WriteBatch};
use async_trait::async_trait;

/// Backend the ingestor writes through.
///
/// Implementations must apply a [`WriteBatch`] atomically: after an `Err`
/// none of the batch is observable to later reads.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn ensure_constraints(&self, constraints: &[Constraint]) -> Result<()>;

    async fn commit(&self, batch: &WriteBatch) -> Result<IngestResult>;

    async fn statistics(&self) -> Result<GraphStatistics>;
}
