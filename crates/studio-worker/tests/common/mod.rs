//! Shared fixtures for worker integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use studio_models::{
    Destination, JobRecord, JobRecordId, JobRecordUpdate, Project, ProjectId, ProjectKind,
    ProjectStatus, PublishRequest, PublishResult, RenderJob, RenderResult, Schedule, ScheduleId,
    TenantId,
};
use studio_provider::{MockRenderProvider, ProviderError, ProviderResult, RenderProvider};
use studio_queue::{Backoff, JobQueue, QueueConfig};
use studio_store::{MemoryStore, ProjectStore, StoreError, StoreResult};
use studio_worker::{
    DestinationError, DestinationHandler, DestinationRegistry, JobExecutor, PublishProcessor,
    RenderPollConfig, RenderProcessor, WorkerConfig,
};

pub const TENANT: &str = "tenant-1";

/// What the scripted provider answers to status reads.
#[derive(Debug, Clone)]
pub enum Script {
    Complete(String),
    CompleteWithoutUrl,
    Fail(Option<String>),
    NeverFinish,
    RejectSubmit,
}

/// Provider that answers every status read the same way.
pub struct ScriptedProvider {
    script: Script,
    pub submits: AtomicU32,
    pub polls: AtomicU32,
    pub cancels: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            submits: AtomicU32::new(0),
            polls: AtomicU32::new(0),
            cancels: AtomicU32::new(0),
        })
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> u32 {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit_job(&self, _job: &RenderJob) -> ProviderResult<String> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        match self.script {
            Script::RejectSubmit => Err(ProviderError::submit_failed("render farm unavailable")),
            _ => Ok(format!("render-{}", n)),
        }
    }

    async fn get_job_status(&self, provider_job_id: &str) -> ProviderResult<RenderResult> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(match &self.script {
            Script::Complete(url) => RenderResult::completed(provider_job_id, url.clone()),
            Script::CompleteWithoutUrl => {
                let mut result = RenderResult::completed(provider_job_id, String::new());
                result.output_url = None;
                result
            }
            Script::Fail(error) => RenderResult::failed(provider_job_id, error.clone()),
            Script::NeverFinish | Script::RejectSubmit => RenderResult::processing(provider_job_id),
        })
    }

    async fn cancel_job(&self, _provider_job_id: &str) -> ProviderResult<bool> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn supported_formats(&self) -> Vec<String> {
        vec!["mp4".to_string(), "pdf".to_string()]
    }

    fn estimated_render_time(
        &self,
        _properties: &serde_json::Map<String, serde_json::Value>,
    ) -> Duration {
        Duration::from_secs(1)
    }
}

/// Destination handler that always fails with the given message.
pub struct FailingHandler {
    pub destination: Destination,
    pub message: String,
    pub calls: AtomicU32,
}

impl FailingHandler {
    pub fn new(destination: Destination, message: &str) -> Arc<Self> {
        Arc::new(Self {
            destination,
            message: message.to_string(),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl DestinationHandler for FailingHandler {
    fn destination(&self) -> Destination {
        self.destination
    }

    async fn publish(
        &self,
        _project: &Project,
        _request: &PublishRequest,
    ) -> Result<PublishResult, DestinationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DestinationError::new(self.destination, self.message.clone()))
    }
}

/// Store, queue and executor wired with fast timings.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub queue: JobQueue,
    pub executor: JobExecutor,
}

impl Harness {
    pub fn new(video: Arc<dyn RenderProvider>, destinations: DestinationRegistry) -> Self {
        Self::with_polls(video, destinations, 60)
    }

    pub fn with_polls(
        video: Arc<dyn RenderProvider>,
        destinations: DestinationRegistry,
        max_polls: u32,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::in_memory(QueueConfig::default().with_backoff(Backoff::fixed(0)));
        let poll = RenderPollConfig {
            interval: Duration::from_millis(1),
            max_polls,
        };
        let dyn_store: Arc<dyn ProjectStore> = store.clone();

        let render = RenderProcessor::new(
            Arc::clone(&dyn_store),
            video,
            Arc::new(MockRenderProvider::print()),
            poll,
        );
        let publish = PublishProcessor::new(dyn_store, queue.clone(), destinations);
        let config = WorkerConfig {
            render: poll,
            ..WorkerConfig::default()
        };
        let executor = JobExecutor::new(config, queue.clone(), render, publish);

        Self {
            store,
            queue,
            executor,
        }
    }

    /// Seed a project in the given status.
    pub async fn project(&self, kind: ProjectKind, status: ProjectStatus) -> Project {
        let project = sample_project(kind, status);
        self.store.insert_project(project.clone()).await;
        project
    }
}

/// Project with two "9:16" variants and one "16:9" variant.
pub fn sample_project(kind: ProjectKind, status: ProjectStatus) -> Project {
    let mut project = Project::new(TenantId::from(TENANT), kind, "Spring launch")
        .with_variant("9:16")
        .with_variant("9:16")
        .with_variant("16:9");
    project.status = status;
    project
}

pub fn stub_destinations() -> DestinationRegistry {
    DestinationRegistry::with_stubs(Duration::ZERO)
}

/// Store whose job record and schedule writes fail a set number of times.
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    create_record_failures: AtomicU32,
    mark_schedule_failures: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            create_record_failures: AtomicU32::new(0),
            mark_schedule_failures: AtomicU32::new(0),
        })
    }

    pub fn fail_create_record(self: Arc<Self>, times: u32) -> Arc<Self> {
        self.create_record_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn fail_mark_schedule(self: Arc<Self>, times: u32) -> Arc<Self> {
        self.mark_schedule_failures.store(times, Ordering::SeqCst);
        self
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ProjectStore for FlakyStore {
    async fn find_project(
        &self,
        tenant_id: &TenantId,
        project_id: &ProjectId,
    ) -> StoreResult<Option<Project>> {
        self.inner.find_project(tenant_id, project_id).await
    }

    async fn get_project(&self, project_id: &ProjectId) -> StoreResult<Option<Project>> {
        self.inner.get_project(project_id).await
    }

    async fn update_project_status(
        &self,
        project_id: &ProjectId,
        status: ProjectStatus,
    ) -> StoreResult<()> {
        self.inner.update_project_status(project_id, status).await
    }

    async fn set_variant_job_id(
        &self,
        project_id: &ProjectId,
        aspect: &str,
        job_id: &str,
    ) -> StoreResult<usize> {
        self.inner.set_variant_job_id(project_id, aspect, job_id).await
    }

    async fn set_variant_output(
        &self,
        project_id: &ProjectId,
        aspect: &str,
        url: &str,
    ) -> StoreResult<usize> {
        self.inner.set_variant_output(project_id, aspect, url).await
    }

    async fn mark_published(
        &self,
        project_id: &ProjectId,
        results: Vec<PublishResult>,
        published_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.mark_published(project_id, results, published_at).await
    }

    async fn create_job_record(&self, record: JobRecord) -> StoreResult<JobRecordId> {
        if Self::take_failure(&self.create_record_failures) {
            return Err(StoreError::backend("connection reset"));
        }
        self.inner.create_job_record(record).await
    }

    async fn update_job_record(
        &self,
        record_id: &JobRecordId,
        update: JobRecordUpdate,
    ) -> StoreResult<JobRecord> {
        self.inner.update_job_record(record_id, update).await
    }

    async fn find_job_record(
        &self,
        tenant_id: &TenantId,
        record_id: &JobRecordId,
    ) -> StoreResult<Option<JobRecord>> {
        self.inner.find_job_record(tenant_id, record_id).await
    }

    async fn find_schedule(
        &self,
        tenant_id: &TenantId,
        schedule_id: &ScheduleId,
    ) -> StoreResult<Option<Schedule>> {
        self.inner.find_schedule(tenant_id, schedule_id).await
    }

    async fn mark_schedule_executed(
        &self,
        schedule_id: &ScheduleId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if Self::take_failure(&self.mark_schedule_failures) {
            return Err(StoreError::backend("connection reset"));
        }
        self.inner.mark_schedule_executed(schedule_id, executed_at).await
    }
}
