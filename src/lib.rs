// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod compose;
pub mod config;
pub mod dedup;
pub mod http;
pub mod notify;
pub mod pipeline;
pub mod retry;
pub mod sources;
pub mod telemetry;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::compose::{compose, ComposeOptions, Digest};
pub use crate::config::{ConfigError, DigestConfig};
pub use crate::dedup::{is_similar, Deduplicator, TopicFilter};
pub use crate::pipeline::{DigestPipeline, RunReport};
pub use crate::retry::{retry, RetryPolicy};
pub use crate::sources::{FetchResult, RunContext, SourceAdapter};
