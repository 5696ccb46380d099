//! Persistence trait consumed by the processors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use studio_models::{
    JobRecord, JobRecordId, JobRecordUpdate, Project, ProjectId, ProjectStatus, PublishResult,
    Schedule, ScheduleId, TenantId,
};

use crate::error::StoreResult;

/// Project, variant, job record and schedule persistence.
///
/// Lookups that start from caller input are tenant-scoped. Updates address
/// records by id only; callers obtained the id from a scoped lookup or from
/// a job payload that was created under the tenant.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Find a project by id within a tenant.
    async fn find_project(
        &self,
        tenant_id: &TenantId,
        project_id: &ProjectId,
    ) -> StoreResult<Option<Project>>;

    /// Get a project by id, regardless of tenant.
    async fn get_project(&self, project_id: &ProjectId) -> StoreResult<Option<Project>>;

    /// Move a project to `status`.
    ///
    /// Fails with `InvalidTransition` if the state machine forbids the move.
    async fn update_project_status(
        &self,
        project_id: &ProjectId,
        status: ProjectStatus,
    ) -> StoreResult<()>;

    /// Record the provider job id on every variant matching `aspect`.
    ///
    /// Returns the number of variants updated.
    async fn set_variant_job_id(
        &self,
        project_id: &ProjectId,
        aspect: &str,
        provider_job_id: &str,
    ) -> StoreResult<usize>;

    /// Record the output URL on every variant matching `aspect`.
    ///
    /// Returns the number of variants updated.
    async fn set_variant_output(
        &self,
        project_id: &ProjectId,
        aspect: &str,
        output_url: &str,
    ) -> StoreResult<usize>;

    /// Move a project to PUBLISHED and record the publish results.
    async fn mark_published(
        &self,
        project_id: &ProjectId,
        results: Vec<PublishResult>,
        published_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Persist a new job record.
    async fn create_job_record(&self, record: JobRecord) -> StoreResult<JobRecordId>;

    /// Apply an update to a job record and return the updated record.
    async fn update_job_record(
        &self,
        record_id: &JobRecordId,
        update: JobRecordUpdate,
    ) -> StoreResult<JobRecord>;

    /// Find a job record within a tenant.
    async fn find_job_record(
        &self,
        tenant_id: &TenantId,
        record_id: &JobRecordId,
    ) -> StoreResult<Option<JobRecord>>;

    /// Find a schedule within a tenant.
    async fn find_schedule(
        &self,
        tenant_id: &TenantId,
        schedule_id: &ScheduleId,
    ) -> StoreResult<Option<Schedule>>;

    /// Mark a schedule as executed.
    async fn mark_schedule_executed(
        &self,
        schedule_id: &ScheduleId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<()>;
}
