//! In-memory project store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use studio_models::{
    JobRecord, JobRecordId, JobRecordUpdate, Project, ProjectId, ProjectStatus, PublishResult,
    Schedule, ScheduleId, ScheduleStatus, TenantId, VariantStatus,
};

use crate::error::{StoreError, StoreResult};
use crate::store::ProjectStore;

#[derive(Debug, Default)]
struct Inner {
    projects: HashMap<ProjectId, Project>,
    job_records: HashMap<JobRecordId, JobRecord>,
    schedules: HashMap<ScheduleId, Schedule>,
}

/// Store kept in process memory.
///
/// Besides the [`ProjectStore`] operations it offers seeding and inspection
/// helpers for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a project.
    pub async fn insert_project(&self, project: Project) {
        self.inner
            .write()
            .await
            .projects
            .insert(project.id.clone(), project);
    }

    /// Insert or replace a schedule.
    pub async fn insert_schedule(&self, schedule: Schedule) {
        self.inner
            .write()
            .await
            .schedules
            .insert(schedule.id.clone(), schedule);
    }

    pub async fn project(&self, project_id: &ProjectId) -> Option<Project> {
        self.inner.read().await.projects.get(project_id).cloned()
    }

    pub async fn schedule(&self, schedule_id: &ScheduleId) -> Option<Schedule> {
        self.inner.read().await.schedules.get(schedule_id).cloned()
    }

    /// All job records of a project, oldest first.
    pub async fn job_records_for(&self, project_id: &ProjectId) -> Vec<JobRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<JobRecord> = inner
            .job_records
            .values()
            .filter(|r| &r.project_id == project_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    fn project_mut<'a>(
        projects: &'a mut HashMap<ProjectId, Project>,
        project_id: &ProjectId,
    ) -> StoreResult<&'a mut Project> {
        projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::project_not_found(project_id.as_str()))
    }

    fn transition(project: &mut Project, status: ProjectStatus) -> StoreResult<()> {
        if !project.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: project.status,
                to: status,
            });
        }
        project.status = status;
        project.updated_at = Utc::now();
        Ok(())
    }

    fn ensure_variants_writable(project: &Project) -> StoreResult<()> {
        if project.status.allows_variant_writes() {
            Ok(())
        } else {
            Err(StoreError::VariantLocked {
                project_id: project.id.to_string(),
                status: project.status,
            })
        }
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_project(
        &self,
        tenant_id: &TenantId,
        project_id: &ProjectId,
    ) -> StoreResult<Option<Project>> {
        let inner = self.inner.read().await;
        Ok(inner
            .projects
            .get(project_id)
            .filter(|p| &p.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_project(&self, project_id: &ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.project(project_id).await)
    }

    async fn update_project_status(
        &self,
        project_id: &ProjectId,
        status: ProjectStatus,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let project = Self::project_mut(&mut inner.projects, project_id)?;
        let previous = project.status;
        Self::transition(project, status)?;
        debug!("Project {} status {} -> {}", project_id, previous, status);
        Ok(())
    }

    async fn set_variant_job_id(
        &self,
        project_id: &ProjectId,
        aspect: &str,
        provider_job_id: &str,
    ) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let project = Self::project_mut(&mut inner.projects, project_id)?;
        Self::ensure_variants_writable(project)?;

        let mut updated = 0;
        for variant in project.variants.iter_mut().filter(|v| v.aspect == aspect) {
            variant.job_id = Some(provider_job_id.to_string());
            variant.status = VariantStatus::Rendering;
            updated += 1;
        }
        if updated > 0 {
            project.updated_at = Utc::now();
        }
        Ok(updated)
    }

    async fn set_variant_output(
        &self,
        project_id: &ProjectId,
        aspect: &str,
        output_url: &str,
    ) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let project = Self::project_mut(&mut inner.projects, project_id)?;
        Self::ensure_variants_writable(project)?;

        let mut updated = 0;
        for variant in project.variants.iter_mut().filter(|v| v.aspect == aspect) {
            variant.url = Some(output_url.to_string());
            variant.status = VariantStatus::Rendered;
            updated += 1;
        }
        if updated > 0 {
            project.updated_at = Utc::now();
        }
        Ok(updated)
    }

    async fn mark_published(
        &self,
        project_id: &ProjectId,
        results: Vec<PublishResult>,
        published_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let project = Self::project_mut(&mut inner.projects, project_id)?;
        Self::transition(project, ProjectStatus::Published)?;
        project.published_at = Some(published_at);
        project.publish_results = results;
        info!("Project {} published", project_id);
        Ok(())
    }

    async fn create_job_record(&self, record: JobRecord) -> StoreResult<JobRecordId> {
        let mut inner = self.inner.write().await;
        if !inner.projects.contains_key(&record.project_id) {
            return Err(StoreError::project_not_found(record.project_id.as_str()));
        }
        let id = record.id.clone();
        inner.job_records.insert(id.clone(), record);
        Ok(id)
    }

    async fn update_job_record(
        &self,
        record_id: &JobRecordId,
        update: JobRecordUpdate,
    ) -> StoreResult<JobRecord> {
        let mut inner = self.inner.write().await;
        let record = inner
            .job_records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::job_record_not_found(record_id.as_str()))?;
        record.apply(update);
        Ok(record.clone())
    }

    async fn find_job_record(
        &self,
        tenant_id: &TenantId,
        record_id: &JobRecordId,
    ) -> StoreResult<Option<JobRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .job_records
            .get(record_id)
            .filter(|r| &r.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_schedule(
        &self,
        tenant_id: &TenantId,
        schedule_id: &ScheduleId,
    ) -> StoreResult<Option<Schedule>> {
        let inner = self.inner.read().await;
        Ok(inner
            .schedules
            .get(schedule_id)
            .filter(|s| &s.tenant_id == tenant_id)
            .cloned())
    }

    async fn mark_schedule_executed(
        &self,
        schedule_id: &ScheduleId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let schedule = inner
            .schedules
            .get_mut(schedule_id)
            .ok_or_else(|| StoreError::schedule_not_found(schedule_id.as_str()))?;
        schedule.status = ScheduleStatus::Executed;
        schedule.executed_at = Some(executed_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_models::{Destination, JobType, ProjectKind, PublishRequest};

    async fn seeded(status: ProjectStatus) -> (MemoryStore, Project) {
        let mut project = Project::new(TenantId::from("t1"), ProjectKind::Video, "Launch")
            .with_variant("9:16")
            .with_variant("9:16")
            .with_variant("16:9");
        project.status = status;
        let store = MemoryStore::new();
        store.insert_project(project.clone()).await;
        (store, project)
    }

    #[tokio::test]
    async fn test_find_project_is_tenant_scoped() {
        let (store, project) = seeded(ProjectStatus::Draft).await;

        let found = store.find_project(&TenantId::from("t1"), &project.id).await.unwrap();
        assert!(found.is_some());

        let other = store.find_project(&TenantId::from("t2"), &project.id).await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_status_transitions_enforced() {
        let (store, project) = seeded(ProjectStatus::Draft).await;

        let err = store
            .update_project_status(&project.id, ProjectStatus::Published)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        store
            .update_project_status(&project.id, ProjectStatus::Rendering)
            .await
            .unwrap();
        store
            .update_project_status(&project.id, ProjectStatus::Rendered)
            .await
            .unwrap();
        assert_eq!(
            store.project(&project.id).await.unwrap().status,
            ProjectStatus::Rendered
        );
    }

    #[tokio::test]
    async fn test_variant_writes_match_aspect() {
        let (store, project) = seeded(ProjectStatus::Rendering).await;

        let updated = store
            .set_variant_output(&project.id, "9:16", "https://x/y.mp4")
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let project = store.project(&project.id).await.unwrap();
        for variant in project.variants_for("9:16") {
            assert_eq!(variant.url.as_deref(), Some("https://x/y.mp4"));
            assert_eq!(variant.status, VariantStatus::Rendered);
        }
        assert!(project.variants_for("16:9").all(|v| v.url.is_none()));
    }

    #[tokio::test]
    async fn test_variant_writes_locked_outside_progress() {
        let (store, project) = seeded(ProjectStatus::Rendered).await;

        let err = store
            .set_variant_job_id(&project.id, "9:16", "r-1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VariantLocked { .. }));
    }

    #[tokio::test]
    async fn test_mark_published_records_results() {
        let (store, project) = seeded(ProjectStatus::Publishing).await;
        let results = vec![PublishResult::success(Destination::Social, "posted")];

        store
            .mark_published(&project.id, results.clone(), Utc::now())
            .await
            .unwrap();

        let project = store.project(&project.id).await.unwrap();
        assert_eq!(project.status, ProjectStatus::Published);
        assert_eq!(project.publish_results, results);
        assert!(project.published_at.is_some());
    }

    #[tokio::test]
    async fn test_job_record_lifecycle() {
        let (store, project) = seeded(ProjectStatus::Publishing).await;
        let record = JobRecord::processing(
            project.tenant_id.clone(),
            project.id.clone(),
            JobType::PublishVideo,
            serde_json::json!({ "destinations": ["social"] }),
        );

        let id = store.create_job_record(record).await.unwrap();
        let updated = store
            .update_job_record(&id, JobRecordUpdate::failed("boom"))
            .await
            .unwrap();
        assert_eq!(updated.error.as_deref(), Some("boom"));

        let missing = store
            .find_job_record(&TenantId::from("t2"), &id)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_schedule_executed() {
        let store = MemoryStore::new();
        let schedule = Schedule::new(
            TenantId::from("t1"),
            ProjectId::from("p1"),
            ProjectKind::Print,
            Utc::now(),
            PublishRequest::new(vec![Destination::Website]),
        );
        store.insert_schedule(schedule.clone()).await;

        let now = Utc::now();
        store.mark_schedule_executed(&schedule.id, now).await.unwrap();

        let schedule = store.schedule(&schedule.id).await.unwrap();
        assert!(schedule.is_executed());
        assert_eq!(schedule.executed_at, Some(now));
    }
}
