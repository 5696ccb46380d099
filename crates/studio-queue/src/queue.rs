//! The job queue façade.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use studio_models::JobId;

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::job::{
    JobState, PublishJobPayload, QueueJob, QueuedJob, RenderJobPayload, ScheduledPublishPayload,
};
use crate::memory::MemoryQueueStore;
use crate::redis_store::RedisQueueStore;
use crate::store::{QueueCounts, QueueStore};

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Another attempt is scheduled after `delay`.
    Retrying { attempt: u32, delay: Duration },
    /// No attempts left (or the error is not retryable); the job is retained as failed.
    Failed { attempts: u32 },
}

/// Job queue client.
///
/// Enqueueing returns as soon as the job is stored; execution happens
/// later in whichever worker claims it.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn QueueStore>,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a queue over an arbitrary store.
    pub fn new(config: QueueConfig, store: Arc<dyn QueueStore>) -> Self {
        Self { store, config }
    }

    /// Create a queue kept in process memory.
    pub fn in_memory(config: QueueConfig) -> Self {
        Self::new(config, Arc::new(MemoryQueueStore::new()))
    }

    /// Create a durable queue on Redis.
    pub fn redis(config: QueueConfig) -> QueueResult<Self> {
        let store = RedisQueueStore::new(&config.redis_url, config.key_prefix.clone())
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Create a Redis queue from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::redis(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Names of all configured queues.
    pub fn queue_names(&self) -> Vec<String> {
        self.config.queue_names().map(str::to_string).collect()
    }

    /// Add a job for immediate processing.
    pub async fn add(&self, job: QueueJob) -> QueueResult<JobId> {
        self.add_with_delay(job, None).await
    }

    /// Add a job that becomes claimable after `delay`.
    pub async fn add_delayed(&self, job: QueueJob, delay: Duration) -> QueueResult<JobId> {
        self.add_with_delay(job, Some(delay)).await
    }

    async fn add_with_delay(&self, job: QueueJob, delay: Option<Duration>) -> QueueResult<JobId> {
        job.validate()
            .map_err(|e| QueueError::Validation(e.to_string()))?;

        let definition = self
            .config
            .definition(job.queue_name())
            .ok_or_else(|| QueueError::UnknownQueue(job.queue_name().to_string()))?;

        let process_at = match delay {
            Some(delay) => {
                let delay = chrono::Duration::from_std(delay)
                    .map_err(|e| QueueError::enqueue_failed(format!("invalid delay: {}", e)))?;
                Utc::now() + delay
            }
            None => Utc::now(),
        };

        let queued = QueuedJob::new(job, definition.default_job_options, process_at);
        self.store.insert(&queued).await?;

        info!(
            "Enqueued job {} on {} ({})",
            queued.id,
            queued.queue,
            queued.state.as_str()
        );
        Ok(queued.id)
    }

    /// Enqueue a video render job.
    pub async fn enqueue_render_video(&self, payload: RenderJobPayload) -> QueueResult<JobId> {
        self.add(QueueJob::RenderVideo(payload)).await
    }

    /// Enqueue a print render job.
    pub async fn enqueue_render_print(&self, payload: RenderJobPayload) -> QueueResult<JobId> {
        self.add(QueueJob::RenderPrint(payload)).await
    }

    /// Enqueue a video publish job.
    pub async fn enqueue_publish_video(&self, payload: PublishJobPayload) -> QueueResult<JobId> {
        self.add(QueueJob::PublishVideo(payload)).await
    }

    /// Enqueue a print publish job.
    pub async fn enqueue_publish_print(&self, payload: PublishJobPayload) -> QueueResult<JobId> {
        self.add(QueueJob::PublishPrint(payload)).await
    }

    /// Enqueue a scheduled-publish check, optionally deferred.
    pub async fn enqueue_scheduled_publish(
        &self,
        payload: ScheduledPublishPayload,
        delay: Option<Duration>,
    ) -> QueueResult<JobId> {
        self.add_with_delay(QueueJob::ScheduledPublish(payload), delay)
            .await
    }

    /// Claim the next job of a queue, if any is ready.
    pub async fn next_job(&self, queue: &str) -> QueueResult<Option<QueuedJob>> {
        let job = self.store.claim_next(queue, Utc::now()).await?;
        if let Some(job) = &job {
            debug!(
                "Claimed job {} from {} (attempt {}/{})",
                job.id, queue, job.attempts_made, job.options.attempts
            );
        }
        Ok(job)
    }

    /// Mark an active job as completed.
    pub async fn complete(
        &self,
        mut job: QueuedJob,
        result: Option<serde_json::Value>,
    ) -> QueueResult<()> {
        if job.state != JobState::Active {
            return Err(QueueError::invalid_state(format!(
                "job {} is {}, not active",
                job.id,
                job.state.as_str()
            )));
        }

        job.state = JobState::Completed;
        job.result = result;
        job.failed_reason = None;
        job.finished_at = Some(Utc::now());

        let keep = job.options.remove_on_complete;
        self.store.finish(&job, keep).await?;
        debug!("Completed job {} on {}", job.id, job.queue);
        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// Retryable failures with attempts left are rescheduled with the
    /// queue's backoff; everything else is retained as failed.
    pub async fn fail(
        &self,
        mut job: QueuedJob,
        reason: &str,
        retryable: bool,
    ) -> QueueResult<FailureDisposition> {
        if job.state != JobState::Active {
            return Err(QueueError::invalid_state(format!(
                "job {} is {}, not active",
                job.id,
                job.state.as_str()
            )));
        }

        job.failed_reason = Some(reason.to_string());

        if retryable && job.has_attempts_left() {
            let delay = job.options.backoff.delay_for_attempt(job.attempts_made);
            let backoff = chrono::Duration::from_std(delay)
                .map_err(|e| QueueError::invalid_state(format!("invalid backoff: {}", e)))?;
            job.state = JobState::Delayed;
            job.process_at = Utc::now() + backoff;
            self.store.reschedule(&job).await?;

            info!(
                "Job {} will be retried in {:?} (attempt {}/{})",
                job.id, delay, job.attempts_made, job.options.attempts
            );
            return Ok(FailureDisposition::Retrying {
                attempt: job.attempts_made + 1,
                delay,
            });
        }

        job.state = JobState::Failed;
        job.finished_at = Some(Utc::now());
        let attempts = job.attempts_made;
        let keep = job.options.remove_on_fail;
        self.store.finish(&job, keep).await?;

        warn!(
            "Job {} failed after {} attempt(s): {}",
            job.id, attempts, reason
        );
        Ok(FailureDisposition::Failed { attempts })
    }

    pub async fn get_job(&self, id: &JobId) -> QueueResult<Option<QueuedJob>> {
        self.store.get(id).await
    }

    pub async fn counts(&self, queue: &str) -> QueueResult<QueueCounts> {
        self.store.counts(queue).await
    }

    /// Retained failed jobs, newest first.
    pub async fn failed_jobs(&self, queue: &str) -> QueueResult<Vec<QueuedJob>> {
        self.store.finished(queue, JobState::Failed).await
    }

    /// Retained completed jobs, newest first.
    pub async fn completed_jobs(&self, queue: &str) -> QueueResult<Vec<QueuedJob>> {
        self.store.finished(queue, JobState::Completed).await
    }

    /// Return jobs stuck in the active state to the waiting list.
    pub async fn requeue_active(&self, queue: &str) -> QueueResult<usize> {
        self.store.requeue_active(queue).await
    }
}
