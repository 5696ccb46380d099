//! Job types and persisted job records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{JobRecordId, ProjectId, TenantId};
use crate::project::ProjectKind;

/// Type of asynchronous job. The wire name doubles as the queue name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    RenderVideo,
    RenderPrint,
    PublishVideo,
    PublishPrint,
    ScheduledPublish,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::RenderVideo,
        JobType::RenderPrint,
        JobType::PublishVideo,
        JobType::PublishPrint,
        JobType::ScheduledPublish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::RenderVideo => "render-video",
            JobType::RenderPrint => "render-print",
            JobType::PublishVideo => "publish-video",
            JobType::PublishPrint => "publish-print",
            JobType::ScheduledPublish => "scheduled-publish",
        }
    }

    /// Parse a queue/job type name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Render job type for a project kind.
    pub fn render_for(kind: ProjectKind) -> Self {
        match kind {
            ProjectKind::Video => JobType::RenderVideo,
            ProjectKind::Print => JobType::RenderPrint,
        }
    }

    /// Publish job type for a project kind.
    pub fn publish_for(kind: ProjectKind) -> Self {
        match kind {
            ProjectKind::Video => JobType::PublishVideo,
            ProjectKind::Print => JobType::PublishPrint,
        }
    }

    /// Project kind this job operates on, if it is bound to one.
    pub fn project_kind(&self) -> Option<ProjectKind> {
        match self {
            JobType::RenderVideo | JobType::PublishVideo => Some(ProjectKind::Video),
            JobType::RenderPrint | JobType::PublishPrint => Some(ProjectKind::Print),
            JobType::ScheduledPublish => None,
        }
    }

    pub fn is_render(&self) -> bool {
        matches!(self, JobType::RenderVideo | JobType::RenderPrint)
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a persisted job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobRecordStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobRecordStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobRecordStatus::Completed | JobRecordStatus::Failed)
    }
}

/// Project-level job record kept for observability and diagnostics.
///
/// This is distinct from the queue's own job: it lives next to the
/// project data and survives queue retention limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobRecordId,
    pub tenant_id: TenantId,
    pub project_id: ProjectId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobRecordStatus,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a pending record.
    pub fn pending(
        tenant_id: TenantId,
        project_id: ProjectId,
        job_type: JobType,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: JobRecordId::new(),
            tenant_id,
            project_id,
            job_type,
            status: JobRecordStatus::Pending,
            payload,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Create a record that is already being processed.
    pub fn processing(
        tenant_id: TenantId,
        project_id: ProjectId,
        job_type: JobType,
        payload: serde_json::Value,
    ) -> Self {
        let mut record = Self::pending(tenant_id, project_id, job_type, payload);
        record.status = JobRecordStatus::Processing;
        record.started_at = Some(record.created_at);
        record
    }

    /// Apply a partial update.
    pub fn apply(&mut self, update: JobRecordUpdate) {
        match update {
            JobRecordUpdate::Started { at } => {
                self.status = JobRecordStatus::Processing;
                self.started_at = Some(at);
                self.error = None;
            }
            JobRecordUpdate::Completed { result, at } => {
                self.status = JobRecordStatus::Completed;
                self.result = Some(result);
                self.error = None;
                self.completed_at = Some(at);
            }
            JobRecordUpdate::Failed { error, at } => {
                self.status = JobRecordStatus::Failed;
                self.error = Some(error);
                self.completed_at = Some(at);
            }
        }
    }
}

/// Partial update of a job record.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRecordUpdate {
    Started { at: DateTime<Utc> },
    Completed { result: serde_json::Value, at: DateTime<Utc> },
    Failed { error: String, at: DateTime<Utc> },
}

impl JobRecordUpdate {
    pub fn started() -> Self {
        Self::Started { at: Utc::now() }
    }

    pub fn completed(result: serde_json::Value) -> Self {
        Self::Completed { result, at: Utc::now() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed { error: error.into(), at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_names() {
        for job_type in JobType::ALL {
            let json = serde_json::to_string(&job_type).unwrap();
            assert_eq!(json, format!("\"{}\"", job_type.as_str()));
            assert_eq!(JobType::parse(job_type.as_str()), Some(job_type));
        }
        assert_eq!(JobType::parse("render-audio"), None);
    }

    #[test]
    fn test_job_type_kind_mapping() {
        assert_eq!(JobType::publish_for(ProjectKind::Print), JobType::PublishPrint);
        assert_eq!(JobType::render_for(ProjectKind::Video), JobType::RenderVideo);
        assert_eq!(JobType::ScheduledPublish.project_kind(), None);
        assert!(JobType::RenderPrint.is_render());
        assert!(!JobType::PublishVideo.is_render());
    }

    #[test]
    fn test_record_lifecycle() {
        let mut record = JobRecord::pending(
            TenantId::from("t1"),
            ProjectId::from("p1"),
            JobType::PublishVideo,
            serde_json::json!({}),
        );
        assert_eq!(record.status, JobRecordStatus::Pending);

        record.apply(JobRecordUpdate::started());
        assert_eq!(record.status, JobRecordStatus::Processing);
        assert!(record.started_at.is_some());

        record.apply(JobRecordUpdate::failed("boom"));
        assert_eq!(record.status, JobRecordStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert!(record.status.is_terminal());
    }
}
