//! Publish job processing.
//!
//! Immediate publish drives a project through
//! `RENDERED -> PUBLISHING -> {PUBLISHED | FAILED}` and tracks the attempt in
//! a job record. Scheduled publish turns a due schedule into a publish job.

mod destinations;

pub use destinations::{
    DestinationError, DestinationHandler, DestinationRegistry, EmailHandler, SocialHandler,
    WebsiteHandler,
};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use studio_models::{
    JobId, JobRecord, JobRecordId, JobRecordUpdate, JobType, Project, ProjectKind, ProjectStatus,
    PublishOutcome, PublishRequest, PublishResult, Schedule,
};
use studio_queue::{JobQueue, PublishJobPayload, QueueJob, ScheduledPublishPayload};
use studio_store::ProjectStore;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Result of a scheduled-publish job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ScheduledOutcome {
    /// Not due yet; a new check was enqueued for the scheduled time.
    #[serde(rename_all = "camelCase")]
    Deferred {
        scheduled_at: DateTime<Utc>,
        check_job_id: JobId,
    },
    /// Publish job enqueued and schedule marked executed.
    #[serde(rename_all = "camelCase")]
    Executed {
        publish_job_id: JobId,
        job_record_id: JobRecordId,
    },
    /// Schedule was executed by an earlier delivery.
    AlreadyExecuted,
}

/// Publish processor.
pub struct PublishProcessor {
    store: Arc<dyn ProjectStore>,
    queue: JobQueue,
    destinations: DestinationRegistry,
}

impl PublishProcessor {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        queue: JobQueue,
        destinations: DestinationRegistry,
    ) -> Self {
        Self {
            store,
            queue,
            destinations,
        }
    }

    /// Publish a project to every requested destination, in request order.
    ///
    /// Any handler error fails the whole job: the project moves to FAILED
    /// and the job record keeps the handler's message.
    pub async fn publish(
        &self,
        job_id: &JobId,
        kind: ProjectKind,
        payload: &PublishJobPayload,
    ) -> WorkerResult<PublishOutcome> {
        let job_type = JobType::publish_for(kind);
        let logger = JobLogger::new(job_id, job_type).with_project(&payload.project_id);

        payload
            .validate()
            .map_err(|e| WorkerError::validation(e.to_string()))?;

        let project = self
            .store
            .find_project(&payload.tenant_id, &payload.project_id)
            .await?
            .ok_or_else(|| {
                WorkerError::not_found(format!("project {}", payload.project_id))
            })?;
        if project.kind != kind {
            return Err(WorkerError::validation(format!(
                "project {} is a {} project, not {}",
                project.id, project.kind, kind
            )));
        }

        let request = &payload.publish_dto;
        let handlers = request
            .destinations
            .iter()
            .map(|d| {
                self.destinations.get(*d).ok_or_else(|| {
                    WorkerError::validation(format!("no handler for destination {}", d))
                })
            })
            .collect::<WorkerResult<Vec<_>>>()?;

        logger.log_start(&format!(
            "publishing to {}",
            request
                .destinations
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        self.store
            .update_project_status(&project.id, ProjectStatus::Publishing)
            .await?;
        let record_id = match self.start_record(&project, job_type, payload).await {
            Ok(record_id) => record_id,
            Err(e) => {
                logger.log_error(&e.to_string());
                self.fail_project(&project, &logger).await;
                return Err(e);
            }
        };

        let mut results: Vec<PublishResult> = Vec::with_capacity(handlers.len());
        for handler in &handlers {
            match handler.publish(&project, request).await {
                Ok(result) => {
                    metrics::record_destination(result.destination, result.success);
                    logger.log_progress(&format!(
                        "{}: {}",
                        result.destination, result.message
                    ));
                    results.push(result);
                }
                Err(e) => {
                    metrics::record_destination(e.destination, false);
                    let err = WorkerError::from(e);
                    self.fail(&project, &record_id, &err, &logger).await;
                    return Err(err);
                }
            }
        }

        let outcome = PublishOutcome {
            publish_results: results,
        };
        if let Err(e) = self.finish(&project, &record_id, &outcome).await {
            self.fail(&project, &record_id, &e, &logger).await;
            return Err(e);
        }

        logger.log_completion(&format!(
            "{} destination(s) handled",
            outcome.publish_results.len()
        ));
        Ok(outcome)
    }

    /// Move the job record to PROCESSING, creating it unless the payload
    /// names one from the scheduled path.
    async fn start_record(
        &self,
        project: &Project,
        job_type: JobType,
        payload: &PublishJobPayload,
    ) -> WorkerResult<JobRecordId> {
        if let Some(record_id) = &payload.job_record_id {
            let existing = self
                .store
                .find_job_record(&payload.tenant_id, record_id)
                .await?;
            if existing.is_some() {
                self.store
                    .update_job_record(record_id, JobRecordUpdate::started())
                    .await?;
                return Ok(record_id.clone());
            }
        }

        let record = JobRecord::processing(
            project.tenant_id.clone(),
            project.id.clone(),
            job_type,
            publish_request_value(&payload.publish_dto)?,
        );
        Ok(self.store.create_job_record(record).await?)
    }

    async fn finish(
        &self,
        project: &Project,
        record_id: &JobRecordId,
        outcome: &PublishOutcome,
    ) -> WorkerResult<()> {
        self.store
            .mark_published(&project.id, outcome.publish_results.clone(), Utc::now())
            .await?;
        let result =
            serde_json::to_value(outcome).map_err(|e| WorkerError::internal(e.to_string()))?;
        self.store
            .update_job_record(record_id, JobRecordUpdate::completed(result))
            .await?;
        Ok(())
    }

    /// Leave the project FAILED and the record carrying the error.
    async fn fail(
        &self,
        project: &Project,
        record_id: &JobRecordId,
        err: &WorkerError,
        logger: &JobLogger,
    ) {
        logger.log_error(&err.to_string());
        self.fail_project(project, logger).await;
        if let Err(e) = self
            .store
            .update_job_record(record_id, JobRecordUpdate::failed(err.to_string()))
            .await
        {
            logger.log_warning(&format!("could not update job record: {}", e));
        }
    }

    async fn fail_project(&self, project: &Project, logger: &JobLogger) {
        if let Err(e) = self
            .store
            .update_project_status(&project.id, ProjectStatus::Failed)
            .await
        {
            logger.log_warning(&format!("could not mark project failed: {}", e));
        }
    }

    /// Handle a scheduled-publish check.
    ///
    /// Not yet due: enqueue another check for the scheduled time and return
    /// without touching the schedule. Due: create the schedule's PENDING job
    /// record, mark the schedule executed, then enqueue the publish job.
    ///
    /// A redelivered check never enqueues a second publish job. If the
    /// enqueue fails the record is left FAILED with the queue error.
    pub async fn run_scheduled(
        &self,
        job_id: &JobId,
        payload: &ScheduledPublishPayload,
    ) -> WorkerResult<ScheduledOutcome> {
        let logger = JobLogger::new(job_id, JobType::ScheduledPublish);

        payload
            .validate()
            .map_err(|e| WorkerError::validation(e.to_string()))?;

        let schedule = self
            .store
            .find_schedule(&payload.tenant_id, &payload.schedule_id)
            .await?
            .ok_or_else(|| {
                WorkerError::not_found(format!("schedule {}", payload.schedule_id))
            })?;
        let logger = logger.with_project(&schedule.project_id);

        if schedule.is_executed() {
            logger.log_warning(&format!(
                "schedule {} already executed, skipping",
                schedule.id
            ));
            return Ok(ScheduledOutcome::AlreadyExecuted);
        }

        let now = Utc::now();
        if !schedule.is_due(now) {
            let delay = (schedule.scheduled_at - now)
                .to_std()
                .map_err(|e| WorkerError::internal(e.to_string()))?;
            let check_job_id = self
                .queue
                .enqueue_scheduled_publish(payload.clone(), Some(delay))
                .await?;
            logger.log_progress(&format!(
                "schedule {} due at {}, rechecking in {:?}",
                schedule.id, schedule.scheduled_at, delay
            ));
            return Ok(ScheduledOutcome::Deferred {
                scheduled_at: schedule.scheduled_at,
                check_job_id,
            });
        }

        let job_record_id = self.schedule_record(&schedule).await?;

        self.store
            .mark_schedule_executed(&schedule.id, Utc::now())
            .await?;

        let publish = PublishJobPayload::new(
            schedule.project_id.clone(),
            schedule.publish_request.clone(),
            schedule.tenant_id.clone(),
        )
        .with_job_record(job_record_id.clone());
        let enqueued = match schedule.project_kind {
            ProjectKind::Video => self.queue.add(QueueJob::PublishVideo(publish)).await,
            ProjectKind::Print => self.queue.add(QueueJob::PublishPrint(publish)).await,
        };
        let publish_job_id = match enqueued {
            Ok(id) => id,
            Err(e) => {
                let err = WorkerError::from(e);
                logger.log_error(&err.to_string());
                if let Err(e) = self
                    .store
                    .update_job_record(&job_record_id, JobRecordUpdate::failed(err.to_string()))
                    .await
                {
                    logger.log_warning(&format!("could not update job record: {}", e));
                }
                return Err(err);
            }
        };

        logger.log_completion(&format!(
            "schedule {} executed as {}",
            schedule.id, publish_job_id
        ));
        Ok(ScheduledOutcome::Executed {
            publish_job_id,
            job_record_id,
        })
    }

    /// PENDING record for a due schedule, reused when an earlier delivery
    /// created it but failed before marking the schedule executed.
    async fn schedule_record(&self, schedule: &Schedule) -> WorkerResult<JobRecordId> {
        let record_id = JobRecordId::from(format!("{}-publish", schedule.id));
        if self
            .store
            .find_job_record(&schedule.tenant_id, &record_id)
            .await?
            .is_some()
        {
            return Ok(record_id);
        }

        let mut record = JobRecord::pending(
            schedule.tenant_id.clone(),
            schedule.project_id.clone(),
            JobType::publish_for(schedule.project_kind),
            publish_request_value(&schedule.publish_request)?,
        );
        record.id = record_id;
        Ok(self.store.create_job_record(record).await?)
    }
}

fn publish_request_value(request: &PublishRequest) -> WorkerResult<serde_json::Value> {
    serde_json::to_value(request).map_err(|e| WorkerError::internal(e.to_string()))
}
