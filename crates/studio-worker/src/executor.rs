//! Job executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Semaphore, TryAcquireError};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use studio_models::ProjectKind;
use studio_queue::{FailureDisposition, JobQueue, QueueJob, QueuedJob};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::publish::PublishProcessor;
use crate::render::RenderProcessor;

/// How a job attempt ended, as recorded in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retrying { attempt: u32, delay: Duration },
    Failed { attempts: u32, reason: String },
}

impl JobOutcome {
    fn status(&self) -> &'static str {
        match self {
            JobOutcome::Completed => "completed",
            JobOutcome::Retrying { .. } => "retrying",
            JobOutcome::Failed { .. } => "failed",
        }
    }
}

/// Everything a job needs, shared with spawned job tasks.
struct JobContext {
    queue: JobQueue,
    render: RenderProcessor,
    publish: PublishProcessor,
}

impl JobContext {
    /// Run one claimed job and settle it in the queue.
    async fn execute(&self, job: QueuedJob) -> WorkerResult<JobOutcome> {
        let job_type = job.job_type();
        let started = Instant::now();
        debug!(
            "Executing job {} ({}, attempt {}/{})",
            job.id, job_type, job.attempts_made, job.options.attempts
        );

        let mut logger = JobLogger::new(&job.id, job_type);
        if let Some(project_id) = job.job.project_id() {
            logger = logger.with_project(project_id);
        }

        let processed = self.process(&job).instrument(logger.create_span()).await;
        let outcome = match processed {
            Ok(result) => {
                self.queue.complete(job, Some(result)).await?;
                JobOutcome::Completed
            }
            Err(e) => {
                let reason = e.to_string();
                match self.queue.fail(job, &reason, e.is_retryable()).await? {
                    FailureDisposition::Retrying { attempt, delay } => {
                        JobOutcome::Retrying { attempt, delay }
                    }
                    FailureDisposition::Failed { attempts } => {
                        JobOutcome::Failed { attempts, reason }
                    }
                }
            }
        };

        metrics::record_job(job_type, outcome.status(), started.elapsed());
        Ok(outcome)
    }

    async fn process(&self, job: &QueuedJob) -> WorkerResult<serde_json::Value> {
        match &job.job {
            QueueJob::RenderVideo(payload) => to_value(
                self.render
                    .process(&job.id, ProjectKind::Video, payload)
                    .await?,
            ),
            QueueJob::RenderPrint(payload) => to_value(
                self.render
                    .process(&job.id, ProjectKind::Print, payload)
                    .await?,
            ),
            QueueJob::PublishVideo(payload) => to_value(
                self.publish
                    .publish(&job.id, ProjectKind::Video, payload)
                    .await?,
            ),
            QueueJob::PublishPrint(payload) => to_value(
                self.publish
                    .publish(&job.id, ProjectKind::Print, payload)
                    .await?,
            ),
            QueueJob::ScheduledPublish(payload) => {
                to_value(self.publish.run_scheduled(&job.id, payload).await?)
            }
        }
    }
}

fn to_value<T: serde::Serialize>(value: T) -> WorkerResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| WorkerError::internal(e.to_string()))
}

/// Job executor that processes jobs from every configured queue.
pub struct JobExecutor {
    config: WorkerConfig,
    ctx: Arc<JobContext>,
    queue_names: Vec<String>,
    job_semaphore: Arc<Semaphore>,
    max_permits: usize,
    shutdown: watch::Sender<bool>,
    worker_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        config: WorkerConfig,
        queue: JobQueue,
        render: RenderProcessor,
        publish: PublishProcessor,
    ) -> Self {
        let max_permits = config.max_concurrent_jobs.max(1);
        let (shutdown, _) = watch::channel(false);
        let queue_names = queue.queue_names();

        Self {
            config,
            ctx: Arc::new(JobContext {
                queue,
                render,
                publish,
            }),
            queue_names,
            job_semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits,
            shutdown,
            worker_name: format!("worker-{}", Uuid::new_v4()),
        }
    }

    /// Claim and run the next job of `queue` inline.
    ///
    /// Returns `None` when the queue has nothing ready.
    pub async fn process_next(&self, queue: &str) -> WorkerResult<Option<JobOutcome>> {
        match self.ctx.queue.next_job(queue).await? {
            Some(job) => Ok(Some(self.ctx.execute(job).await?)),
            None => Ok(None),
        }
    }

    /// Start the executor and run until [`JobExecutor::shutdown`] is called.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs on {} queue(s)",
            self.worker_name,
            self.max_permits,
            self.queue_names.len()
        );

        // Jobs left active by a dead worker go back to waiting.
        for queue in &self.queue_names {
            match self.ctx.queue.requeue_active(queue).await {
                Ok(0) => {}
                Ok(n) => warn!("Requeued {} interrupted job(s) on {}", n, queue),
                Err(e) => warn!("Failed to requeue active jobs on {}: {}", queue, e),
            }
        }

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow_and_update() {
                info!("Shutdown signal received, stopping executor");
                break;
            }

            tokio::select! {
                _ = shutdown_rx.changed() => {}
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "In-flight jobs still running after {:?}; they will be redelivered",
                self.config.shutdown_timeout
            );
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Claim at most one job per queue while permits are available.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let mut claimed = 0;

        for queue in &self.queue_names {
            let permit = match Arc::clone(&self.job_semaphore).try_acquire_owned() {
                Ok(permit) => permit,
                Err(TryAcquireError::NoPermits) => {
                    // All slots busy, wait a bit
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    return Ok(());
                }
                Err(TryAcquireError::Closed) => {
                    return Err(WorkerError::internal("job semaphore closed"));
                }
            };

            let Some(job) = self.ctx.queue.next_job(queue).await? else {
                continue;
            };
            claimed += 1;

            let ctx = Arc::clone(&self.ctx);
            tokio::spawn(async move {
                let _permit = permit;
                let job_id = job.id.clone();
                match ctx.execute(job).await {
                    Ok(JobOutcome::Completed) => info!("Job {} completed", job_id),
                    Ok(JobOutcome::Retrying { attempt, delay }) => {
                        info!("Job {} will be retried (attempt {}) in {:?}", job_id, attempt, delay)
                    }
                    Ok(JobOutcome::Failed { attempts, reason }) => {
                        error!("Job {} failed after {} attempt(s): {}", job_id, attempts, reason)
                    }
                    Err(e) => error!("Failed to settle job {}: {}", job_id, e),
                }
            });
        }

        if claimed == 0 {
            tokio::time::sleep(self.config.idle_poll_interval).await;
        }
        Ok(())
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.max_permits {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
