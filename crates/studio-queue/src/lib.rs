//! Retry-capable job queue.
//!
//! This crate provides:
//! - Per-job-type queue policies (attempts, exponential backoff, retention)
//! - Typed job payloads for render, publish and scheduled-publish jobs
//! - The `JobQueue` façade (enqueue, claim, complete, fail with retry)
//! - Durable Redis storage and an in-memory store for tests

pub mod config;
pub mod error;
pub mod job;
pub mod memory;
pub mod queue;
pub mod redis_store;
pub mod store;

pub use config::{Backoff, BackoffType, JobOptions, QueueConfig, QueueDefinition};
pub use error::{QueueError, QueueResult};
pub use job::{
    JobState, PublishJobPayload, QueueJob, QueuedJob, RenderJobPayload, ScheduledPublishPayload,
};
pub use memory::MemoryQueueStore;
pub use queue::{FailureDisposition, JobQueue};
pub use redis_store::RedisQueueStore;
pub use store::{QueueCounts, QueueStore};
