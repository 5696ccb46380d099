//! Render job processing.
//!
//! One render job drives a project through
//! `DRAFT -> RENDERING -> {RENDERED | FAILED}`:
//! submit to the provider, record the provider job id on the matching
//! variants, poll until the provider reports a terminal status, then write
//! the output URL back.

use std::sync::Arc;

use tracing::warn;
use validator::Validate;

use studio_models::{JobId, JobType, ProjectKind, ProjectStatus, RenderJob, RenderResult, RenderStatus};
use studio_provider::RenderProvider;
use studio_queue::RenderJobPayload;
use studio_store::ProjectStore;

use crate::config::RenderPollConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Render processor with one provider per project kind.
pub struct RenderProcessor {
    store: Arc<dyn ProjectStore>,
    video: Arc<dyn RenderProvider>,
    print: Arc<dyn RenderProvider>,
    poll: RenderPollConfig,
}

impl RenderProcessor {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        video: Arc<dyn RenderProvider>,
        print: Arc<dyn RenderProvider>,
        poll: RenderPollConfig,
    ) -> Self {
        Self {
            store,
            video,
            print,
            poll,
        }
    }

    fn provider(&self, kind: ProjectKind) -> &Arc<dyn RenderProvider> {
        match kind {
            ProjectKind::Video => &self.video,
            ProjectKind::Print => &self.print,
        }
    }

    /// Run one render job to a terminal state.
    ///
    /// Once the project is RENDERING, any error moves it to FAILED before
    /// being returned. Nothing else is rolled back; a retried attempt
    /// submits a fresh provider job.
    pub async fn process(
        &self,
        job_id: &JobId,
        kind: ProjectKind,
        payload: &RenderJobPayload,
    ) -> WorkerResult<RenderResult> {
        let logger = JobLogger::new(job_id, JobType::render_for(kind))
            .with_project(&payload.project_id);

        payload
            .validate()
            .map_err(|e| WorkerError::validation(e.to_string()))?;

        let provider = self.provider(kind);
        if !provider.supports_format(&payload.output_format) {
            return Err(WorkerError::validation(format!(
                "{} does not support output format '{}'",
                provider.name(),
                payload.output_format
            )));
        }

        let project = self
            .store
            .get_project(&payload.project_id)
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

        logger.log_start(&format!(
            "rendering aspect {} as {} via {}",
            payload.aspect,
            payload.output_format,
            provider.name()
        ));

        self.store
            .update_project_status(&payload.project_id, ProjectStatus::Rendering)
            .await?;

        match self.render(job_id, provider.as_ref(), payload, &logger).await {
            Ok(result) => {
                logger.log_completion(&format!(
                    "output {}",
                    result.output_url.as_deref().unwrap_or_default()
                ));
                Ok(result)
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                if let Err(status_err) = self
                    .store
                    .update_project_status(&payload.project_id, ProjectStatus::Failed)
                    .await
                {
                    logger.log_warning(&format!("could not mark project failed: {}", status_err));
                }
                Err(e)
            }
        }
    }

    async fn render(
        &self,
        job_id: &JobId,
        provider: &dyn RenderProvider,
        payload: &RenderJobPayload,
        logger: &JobLogger,
    ) -> WorkerResult<RenderResult> {
        let render_job = RenderJob {
            id: job_id.to_string(),
            project_id: payload.project_id.clone(),
            aspect: payload.aspect.clone(),
            script: payload.script.clone(),
            properties: payload.properties.clone(),
            output_format: payload.output_format.clone(),
        };

        let provider_job_id = provider.submit_job(&render_job).await?;
        let variants = self
            .store
            .set_variant_job_id(&payload.project_id, &payload.aspect, &provider_job_id)
            .await?;
        logger.log_progress(&format!(
            "submitted as {} ({} variant(s), estimated {:?})",
            provider_job_id,
            variants,
            provider.estimated_render_time(&payload.properties)
        ));

        let result = self.poll(provider, &provider_job_id, logger).await?;

        let output_url = result.output_url.clone().ok_or_else(|| {
            WorkerError::render_failed(format!(
                "render {} completed without an output URL",
                provider_job_id
            ))
        })?;

        self.store
            .set_variant_output(&payload.project_id, &payload.aspect, &output_url)
            .await?;
        self.store
            .update_project_status(&payload.project_id, ProjectStatus::Rendered)
            .await?;

        Ok(result)
    }

    /// Poll until completed, failed or out of polls.
    async fn poll(
        &self,
        provider: &dyn RenderProvider,
        provider_job_id: &str,
        logger: &JobLogger,
    ) -> WorkerResult<RenderResult> {
        for poll in 1..=self.poll.max_polls {
            let result = provider.get_job_status(provider_job_id).await?;
            metrics::record_render_poll();

            match result.status {
                RenderStatus::Completed => return Ok(result),
                RenderStatus::Failed => {
                    return Err(WorkerError::render_failed(
                        result.error.unwrap_or_else(|| "Render failed".to_string()),
                    ))
                }
                RenderStatus::Queued | RenderStatus::Processing => {
                    if poll % 12 == 0 {
                        logger.log_progress(&format!(
                            "{} still {} after {} poll(s)",
                            provider_job_id, result.status, poll
                        ));
                    }
                }
            }

            if poll < self.poll.max_polls {
                tokio::time::sleep(self.poll.interval).await;
            }
        }

        match provider.cancel_job(provider_job_id).await {
            Ok(cancelled) => {
                logger.log_warning(&format!(
                    "cancel of {} after timeout: {}",
                    provider_job_id, cancelled
                ));
            }
            Err(e) => warn!("Failed to cancel render {}: {}", provider_job_id, e),
        }

        Err(WorkerError::timeout(format!(
            "render {} not finished after {} polls",
            provider_job_id, self.poll.max_polls
        )))
    }
}
