//! # Atlas Pipeline
//!
//! Runs the extraction core over many servers and reports what happened.
//!
//! ```text
//! ServerInput* ──> [max_servers] ──> Semaphore(concurrency)
//!                                       │ per server, in order:
//!                                       ├─ extract   (spawn_blocking)
//!                                       ├─ classify
//!                                       └─ ingest    (retry with backoff)
//!                                                │
//!                                  RunSummary <──┘ per-server outcomes
//! ```
//!
//! Configuration comes from [`PipelineConfig`]: built in code, parsed from
//! TOML, and optionally overridden by `ATLAS_CONCURRENCY`.

mod config;
mod error;
mod pipeline;
mod retry;
mod summary;

pub use config::{PipelineConfig, CONCURRENCY_ENV, MAX_CONCURRENCY};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, ServerInput};
pub use retry::{Attempted, RetryPolicy};
pub use summary::{RunSummary, ServerOutcome};
