//! Deferred publication schedules.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, ScheduleId, TenantId};
use crate::project::ProjectKind;
use crate::publish::PublishRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    #[default]
    Pending,
    Executed,
}

/// A publication scheduled for a future time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: ScheduleId,
    pub tenant_id: TenantId,
    pub project_id: ProjectId,
    pub project_kind: ProjectKind,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ScheduleStatus,
    pub publish_request: PublishRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn new(
        tenant_id: TenantId,
        project_id: ProjectId,
        project_kind: ProjectKind,
        scheduled_at: DateTime<Utc>,
        publish_request: PublishRequest,
    ) -> Self {
        Self {
            id: ScheduleId::new(),
            tenant_id,
            project_id,
            project_kind,
            scheduled_at,
            status: ScheduleStatus::Pending,
            publish_request,
            executed_at: None,
        }
    }

    /// Whether the schedule should run at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }

    pub fn is_executed(&self) -> bool {
        self.status == ScheduleStatus::Executed
    }
}
