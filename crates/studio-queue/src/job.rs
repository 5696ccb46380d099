//! Job payloads and the stored queue job.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use studio_models::{JobId, JobRecordId, JobType, ProjectId, PublishRequest, ScheduleId, TenantId};

use crate::config::JobOptions;

fn validate_project_id(id: &ProjectId) -> Result<(), ValidationError> {
    if id.as_str().trim().is_empty() {
        return Err(ValidationError::new("project_id_required"));
    }
    Ok(())
}

fn validate_tenant_id(id: &TenantId) -> Result<(), ValidationError> {
    if id.as_str().trim().is_empty() {
        return Err(ValidationError::new("tenant_id_required"));
    }
    Ok(())
}

fn validate_schedule_id(id: &ScheduleId) -> Result<(), ValidationError> {
    if id.as_str().trim().is_empty() {
        return Err(ValidationError::new("schedule_id_required"));
    }
    Ok(())
}

/// Payload of a render job (video or print).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenderJobPayload {
    #[validate(custom(function = "validate_project_id"))]
    pub project_id: ProjectId,
    /// Aspect (video, e.g. "9:16") or format descriptor (print, e.g. "A4").
    #[validate(length(min = 1, message = "aspect is required"))]
    pub aspect: String,
    pub script: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[validate(length(min = 1, message = "output format is required"))]
    pub output_format: String,
}

impl RenderJobPayload {
    pub fn new(
        project_id: ProjectId,
        aspect: impl Into<String>,
        script: impl Into<String>,
        output_format: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            aspect: aspect.into(),
            script: script.into(),
            properties: serde_json::Map::new(),
            output_format: output_format.into(),
        }
    }

    /// Set a render property.
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Payload of a publish job (video or print).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PublishJobPayload {
    #[validate(custom(function = "validate_project_id"))]
    pub project_id: ProjectId,
    #[validate(nested)]
    pub publish_dto: PublishRequest,
    #[validate(custom(function = "validate_tenant_id"))]
    pub tenant_id: TenantId,
    /// Existing job record to reuse (set by the scheduled-publish path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_record_id: Option<JobRecordId>,
}

impl PublishJobPayload {
    pub fn new(project_id: ProjectId, publish_dto: PublishRequest, tenant_id: TenantId) -> Self {
        Self {
            project_id,
            publish_dto,
            tenant_id,
            job_record_id: None,
        }
    }

    /// Attach an existing job record.
    pub fn with_job_record(mut self, id: JobRecordId) -> Self {
        self.job_record_id = Some(id);
        self
    }
}

/// Payload of a scheduled-publish job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPublishPayload {
    #[validate(custom(function = "validate_schedule_id"))]
    pub schedule_id: ScheduleId,
    #[validate(custom(function = "validate_tenant_id"))]
    pub tenant_id: TenantId,
}

impl ScheduledPublishPayload {
    pub fn new(schedule_id: ScheduleId, tenant_id: TenantId) -> Self {
        Self {
            schedule_id,
            tenant_id,
        }
    }
}

/// Job wrapper for queue storage. The tag is the job type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QueueJob {
    RenderVideo(RenderJobPayload),
    RenderPrint(RenderJobPayload),
    PublishVideo(PublishJobPayload),
    PublishPrint(PublishJobPayload),
    ScheduledPublish(ScheduledPublishPayload),
}

impl QueueJob {
    pub fn job_type(&self) -> JobType {
        match self {
            QueueJob::RenderVideo(_) => JobType::RenderVideo,
            QueueJob::RenderPrint(_) => JobType::RenderPrint,
            QueueJob::PublishVideo(_) => JobType::PublishVideo,
            QueueJob::PublishPrint(_) => JobType::PublishPrint,
            QueueJob::ScheduledPublish(_) => JobType::ScheduledPublish,
        }
    }

    /// Name of the queue this job belongs to.
    pub fn queue_name(&self) -> &'static str {
        self.job_type().as_str()
    }

    /// Returns the project id if the payload names one directly.
    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            QueueJob::RenderVideo(j) | QueueJob::RenderPrint(j) => Some(&j.project_id),
            QueueJob::PublishVideo(j) | QueueJob::PublishPrint(j) => Some(&j.project_id),
            QueueJob::ScheduledPublish(_) => None,
        }
    }

    /// Validate the payload.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            QueueJob::RenderVideo(j) | QueueJob::RenderPrint(j) => j.validate(),
            QueueJob::PublishVideo(j) | QueueJob::PublishPrint(j) => j.validate(),
            QueueJob::ScheduledPublish(j) => j.validate(),
        }
    }
}

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Waiting,
    Delayed,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Delayed => "delayed",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// A job as stored by the queue, with its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedJob {
    pub id: JobId,
    pub queue: String,
    pub job: QueueJob,
    pub options: JobOptions,
    pub state: JobState,
    /// Attempts started so far (incremented when a worker claims the job).
    pub attempts_made: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Earliest time the job may be claimed.
    pub process_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl QueuedJob {
    /// Create a job ready to be claimed at `process_at`.
    pub fn new(job: QueueJob, options: JobOptions, process_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        let state = if process_at > now {
            JobState::Delayed
        } else {
            JobState::Waiting
        };
        Self {
            id: JobId::new(),
            queue: job.queue_name().to_string(),
            job,
            options,
            state,
            attempts_made: 0,
            failed_reason: None,
            result: None,
            created_at: now,
            process_at,
            finished_at: None,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.job.job_type()
    }

    /// Whether another attempt is allowed after the current one.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts_made < self.options.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_models::Destination;

    #[test]
    fn test_render_payload_wire_format() {
        let json = serde_json::json!({
            "type": "render-video",
            "projectId": "p1",
            "aspect": "9:16",
            "script": "intro",
            "properties": { "duration": 15 },
            "outputFormat": "mp4"
        });
        let job: QueueJob = serde_json::from_value(json).unwrap();
        assert_eq!(job.job_type(), JobType::RenderVideo);
        assert_eq!(job.project_id().map(|p| p.as_str()), Some("p1"));
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_publish_payload_wire_format() {
        let json = serde_json::json!({
            "type": "publish-print",
            "projectId": "p2",
            "publishDto": { "destinations": ["website"] },
            "tenantId": "t1"
        });
        let job: QueueJob = serde_json::from_value(json).unwrap();
        assert_eq!(job.queue_name(), "publish-print");
        match job {
            QueueJob::PublishPrint(p) => {
                assert_eq!(p.publish_dto.destinations, vec![Destination::Website]);
                assert!(p.job_record_id.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_payloads() {
        let render = QueueJob::RenderPrint(RenderJobPayload::new(
            ProjectId::from("p1"),
            "",
            "script",
            "pdf",
        ));
        assert!(render.validate().is_err());

        let render = QueueJob::RenderPrint(RenderJobPayload::new(
            ProjectId::from(" "),
            "A4",
            "script",
            "pdf",
        ));
        assert!(render.validate().is_err());

        let publish = QueueJob::PublishVideo(PublishJobPayload::new(
            ProjectId::from("p1"),
            PublishRequest::new(vec![]),
            TenantId::from("t1"),
        ));
        assert!(publish.validate().is_err());

        let scheduled = QueueJob::ScheduledPublish(ScheduledPublishPayload::new(
            ScheduleId::from("s1"),
            TenantId::from(""),
        ));
        assert!(scheduled.validate().is_err());
    }

    #[test]
    fn test_new_job_state_depends_on_process_at() {
        let job = QueueJob::ScheduledPublish(ScheduledPublishPayload::new(
            ScheduleId::from("s1"),
            TenantId::from("t1"),
        ));
        let now = QueuedJob::new(job.clone(), JobOptions::publish(), Utc::now());
        assert_eq!(now.state, JobState::Waiting);

        let later = QueuedJob::new(
            job,
            JobOptions::publish(),
            Utc::now() + chrono::Duration::minutes(1),
        );
        assert_eq!(later.state, JobState::Delayed);
        assert!(later.has_attempts_left());
    }
}
