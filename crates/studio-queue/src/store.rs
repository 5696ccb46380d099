//! Storage backend abstraction for the job queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use studio_models::JobId;

use crate::error::QueueResult;
use crate::job::{JobState, QueuedJob};

/// Number of jobs per state in one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub waiting: u64,
    pub delayed: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueCounts {
    /// Jobs that still have work ahead of them.
    pub fn pending(&self) -> u64 {
        self.waiting + self.delayed + self.active
    }
}

/// Persistence operations the queue needs from a backend.
///
/// Implementations only move jobs between state collections; retry and
/// retention decisions are made by [`crate::JobQueue`].
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Store a new job as waiting or delayed according to its state.
    async fn insert(&self, job: &QueuedJob) -> QueueResult<()>;

    /// Promote due delayed jobs, then claim the oldest waiting job.
    ///
    /// The claimed job is returned in the `Active` state with
    /// `attempts_made` already incremented.
    async fn claim_next(&self, queue: &str, now: DateTime<Utc>) -> QueueResult<Option<QueuedJob>>;

    /// Move an active job back to the delayed set (retry with backoff).
    async fn reschedule(&self, job: &QueuedJob) -> QueueResult<()>;

    /// Move an active job to its finished collection, keeping at most
    /// `keep` finished jobs of that state for the queue.
    async fn finish(&self, job: &QueuedJob, keep: usize) -> QueueResult<()>;

    async fn get(&self, id: &JobId) -> QueueResult<Option<QueuedJob>>;

    async fn counts(&self, queue: &str) -> QueueResult<QueueCounts>;

    /// Retained finished jobs of the given state, newest first.
    async fn finished(&self, queue: &str, state: JobState) -> QueueResult<Vec<QueuedJob>>;

    /// Return jobs left active (e.g. by a crashed worker) to the waiting list.
    async fn requeue_active(&self, queue: &str) -> QueueResult<usize>;
}
