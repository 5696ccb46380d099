//! Mock render provider.
//!
//! Simulates an asynchronous rendering service: a submitted job is
//! `queued`, becomes `processing` after `processing_after` and
//! `completed` after a further `complete_after`, driven by tokio timers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use studio_models::{ProjectKind, RenderJob, RenderMetadata, RenderResult, RenderStatus};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::RenderProvider;

const VIDEO_FORMATS: &[&str] = &["mp4", "mov", "webm", "gif"];
const PRINT_FORMATS: &[&str] = &["pdf", "png", "jpg"];

/// Mock provider configuration.
#[derive(Debug, Clone)]
pub struct MockProviderConfig {
    pub kind: ProjectKind,
    /// Time spent queued before processing starts
    pub processing_after: Duration,
    /// Time spent processing before completion
    pub complete_after: Duration,
    /// Base URL for generated output files
    pub output_base_url: String,
    /// How long finished renders stay queryable
    pub retention: Duration,
}

impl MockProviderConfig {
    pub fn video() -> Self {
        Self {
            kind: ProjectKind::Video,
            processing_after: Duration::from_secs(1),
            complete_after: Duration::from_secs(5),
            output_base_url: "https://cdn.example.com/renders".to_string(),
            retention: Duration::from_secs(3600),
        }
    }

    pub fn print() -> Self {
        Self {
            kind: ProjectKind::Print,
            processing_after: Duration::from_millis(500),
            complete_after: Duration::from_secs(2),
            output_base_url: "https://cdn.example.com/prints".to_string(),
            retention: Duration::from_secs(3600),
        }
    }

    /// Set both simulated phases.
    pub fn with_timings(mut self, processing_after: Duration, complete_after: Duration) -> Self {
        self.processing_after = processing_after;
        self.complete_after = complete_after;
        self
    }

    /// Set how long finished renders stay queryable.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}

struct MockJob {
    result: RenderResult,
    finished_at: Option<Instant>,
}

impl MockJob {
    fn new(result: RenderResult) -> Self {
        let finished_at = result.status.is_terminal().then(Instant::now);
        Self {
            result,
            finished_at,
        }
    }
}

type JobMap = HashMap<String, MockJob>;

/// Timer-driven mock provider.
#[derive(Clone)]
pub struct MockRenderProvider {
    config: MockProviderConfig,
    jobs: Arc<RwLock<JobMap>>,
}

impl MockRenderProvider {
    pub fn new(config: MockProviderConfig) -> Self {
        Self {
            config,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn video() -> Self {
        Self::new(MockProviderConfig::video())
    }

    pub fn print() -> Self {
        Self::new(MockProviderConfig::print())
    }

    fn output_metadata(&self, job: &RenderJob) -> RenderMetadata {
        match self.config.kind {
            ProjectKind::Video => {
                let duration = video_duration(&job.properties);
                RenderMetadata {
                    file_size: Some((duration * 250_000.0) as u64),
                    duration: Some(duration),
                    pages: None,
                }
            }
            ProjectKind::Print => {
                let pages = print_pages(&job.properties);
                RenderMetadata {
                    file_size: Some(u64::from(pages) * 500_000),
                    duration: None,
                    pages: Some(pages),
                }
            }
        }
    }

    /// Advance a job only if it is still in the expected state.
    async fn advance(
        jobs: &RwLock<JobMap>,
        id: &str,
        from: RenderStatus,
        next: RenderResult,
    ) -> bool {
        let mut jobs = jobs.write().await;
        match jobs.get_mut(id) {
            Some(current) if current.result.status == from => {
                *current = MockJob::new(next);
                true
            }
            _ => false,
        }
    }

    /// Drop finished renders older than the retention window.
    fn evict_finished(&self, jobs: &mut JobMap) {
        let retention = self.config.retention;
        let before = jobs.len();
        jobs.retain(|_, job| {
            job.finished_at
                .map_or(true, |finished| finished.elapsed() < retention)
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            debug!("Evicted {} finished mock render(s)", evicted);
        }
    }
}

fn video_duration(properties: &serde_json::Map<String, serde_json::Value>) -> f64 {
    properties
        .get("duration")
        .and_then(|v| v.as_f64())
        .filter(|d| *d > 0.0)
        .unwrap_or(30.0)
}

fn print_pages(properties: &serde_json::Map<String, serde_json::Value>) -> u32 {
    properties
        .get("pages")
        .and_then(|v| v.as_u64())
        .map(|p| p.clamp(1, u64::from(u32::MAX)) as u32)
        .unwrap_or(1)
}

#[async_trait]
impl RenderProvider for MockRenderProvider {
    fn name(&self) -> &str {
        match self.config.kind {
            ProjectKind::Video => "mock-video",
            ProjectKind::Print => "mock-print",
        }
    }

    async fn submit_job(&self, job: &RenderJob) -> ProviderResult<String> {
        if !self.supports_format(&job.output_format) {
            return Err(ProviderError::UnsupportedFormat(job.output_format.clone()));
        }

        let provider_job_id = format!("{}-{}", self.name(), Uuid::new_v4());
        {
            let mut jobs = self.jobs.write().await;
            self.evict_finished(&mut jobs);
            jobs.insert(
                provider_job_id.clone(),
                MockJob::new(RenderResult::queued(&provider_job_id)),
            );
        }

        let output_url = format!(
            "{}/{}/{}.{}",
            self.config.output_base_url,
            job.project_id,
            provider_job_id,
            job.output_format.to_lowercase()
        );
        let completed = RenderResult::completed(&provider_job_id, output_url)
            .with_metadata(self.output_metadata(job));

        let jobs = Arc::clone(&self.jobs);
        let id = provider_job_id.clone();
        let processing_after = self.config.processing_after;
        let complete_after = self.config.complete_after;

        tokio::spawn(async move {
            tokio::time::sleep(processing_after).await;
            if !Self::advance(&jobs, &id, RenderStatus::Queued, RenderResult::processing(&id)).await {
                return;
            }
            debug!("Mock render {} processing", id);

            tokio::time::sleep(complete_after).await;
            if Self::advance(&jobs, &id, RenderStatus::Processing, completed).await {
                debug!("Mock render {} completed", id);
            }
        });

        info!(
            "Submitted mock render {} for project {} ({})",
            provider_job_id, job.project_id, job.aspect
        );
        Ok(provider_job_id)
    }

    async fn get_job_status(&self, provider_job_id: &str) -> ProviderResult<RenderResult> {
        self.jobs
            .read()
            .await
            .get(provider_job_id)
            .map(|job| job.result.clone())
            .ok_or_else(|| ProviderError::job_not_found(provider_job_id))
    }

    async fn cancel_job(&self, provider_job_id: &str) -> ProviderResult<bool> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(provider_job_id)
            .ok_or_else(|| ProviderError::job_not_found(provider_job_id))?;

        if job.result.status.is_terminal() {
            return Ok(false);
        }

        *job = MockJob::new(RenderResult::failed(
            provider_job_id,
            Some("Cancelled".to_string()),
        ));
        info!("Cancelled mock render {}", provider_job_id);
        Ok(true)
    }

    fn supported_formats(&self) -> Vec<String> {
        let formats = match self.config.kind {
            ProjectKind::Video => VIDEO_FORMATS,
            ProjectKind::Print => PRINT_FORMATS,
        };
        formats.iter().map(|f| f.to_string()).collect()
    }

    fn estimated_render_time(
        &self,
        properties: &serde_json::Map<String, serde_json::Value>,
    ) -> Duration {
        match self.config.kind {
            ProjectKind::Video => {
                // Float to int casts saturate.
                let per_second = (video_duration(properties) * 2_000.0) as u64;
                Duration::from_millis(per_second.saturating_add(10_000))
            }
            ProjectKind::Print => {
                let per_page = u64::from(print_pages(properties)).saturating_mul(1_500);
                Duration::from_millis(per_page.saturating_add(5_000))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_models::ProjectId;

    fn render_job(format: &str) -> RenderJob {
        RenderJob {
            id: "job-1".to_string(),
            project_id: ProjectId::from("p1"),
            aspect: "9:16".to_string(),
            script: "intro".to_string(),
            properties: serde_json::Map::new(),
            output_format: format.to_string(),
        }
    }

    fn fast_video() -> MockRenderProvider {
        MockRenderProvider::new(
            MockProviderConfig::video()
                .with_timings(Duration::from_millis(5), Duration::from_millis(5)),
        )
    }

    #[tokio::test]
    async fn test_mock_completes_asynchronously() {
        let provider = fast_video();
        let id = provider.submit_job(&render_job("mp4")).await.unwrap();

        let status = provider.get_job_status(&id).await.unwrap();
        assert_eq!(status.status, RenderStatus::Queued);

        let mut result = status;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            result = provider.get_job_status(&id).await.unwrap();
            if result.status.is_terminal() {
                break;
            }
        }

        assert_eq!(result.status, RenderStatus::Completed);
        let url = result.output_url.unwrap();
        assert!(url.starts_with("https://cdn.example.com/renders/p1/"));
        assert!(url.ends_with(".mp4"));
        assert_eq!(result.metadata.unwrap().duration, Some(30.0));
    }

    #[tokio::test]
    async fn test_unknown_job_not_found() {
        let provider = fast_video();
        let err = provider.get_job_status("nope").await.unwrap_err();
        assert!(matches!(err, ProviderError::JobNotFound(_)));
        assert!(provider.cancel_job("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected() {
        let provider = MockRenderProvider::print();
        let err = provider.submit_job(&render_job("mp4")).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedFormat(_)));
        assert!(provider.supports_format("PDF"));
    }

    #[tokio::test]
    async fn test_cancel_stops_render() {
        let provider = MockRenderProvider::new(
            MockProviderConfig::video()
                .with_timings(Duration::from_secs(60), Duration::from_secs(60)),
        );
        let id = provider.submit_job(&render_job("webm")).await.unwrap();

        assert!(provider.cancel_job(&id).await.unwrap());
        let result = provider.get_job_status(&id).await.unwrap();
        assert_eq!(result.status, RenderStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("Cancelled"));

        // Already terminal.
        assert!(!provider.cancel_job(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_finished_renders_are_evicted() {
        let provider = MockRenderProvider::new(
            MockProviderConfig::video()
                .with_timings(Duration::from_secs(60), Duration::from_secs(60))
                .with_retention(Duration::ZERO),
        );
        let first = provider.submit_job(&render_job("mp4")).await.unwrap();
        assert!(provider.cancel_job(&first).await.unwrap());

        let second = provider.submit_job(&render_job("mp4")).await.unwrap();
        assert!(matches!(
            provider.get_job_status(&first).await,
            Err(ProviderError::JobNotFound(_))
        ));
        // Unfinished renders are kept.
        assert_eq!(
            provider.get_job_status(&second).await.unwrap().status,
            RenderStatus::Queued
        );
    }

    #[test]
    fn test_estimates() {
        let video = MockRenderProvider::video();
        let mut properties = serde_json::Map::new();
        properties.insert("duration".to_string(), serde_json::json!(15));
        assert_eq!(
            video.estimated_render_time(&properties),
            Duration::from_millis(40_000)
        );

        let print = MockRenderProvider::print();
        properties.insert("pages".to_string(), serde_json::json!(4));
        assert_eq!(
            print.estimated_render_time(&properties),
            Duration::from_millis(11_000)
        );
        assert_eq!(print.supported_formats(), vec!["pdf", "png", "jpg"]);
    }

    #[test]
    fn test_estimate_saturates_on_huge_input() {
        let mut properties = serde_json::Map::new();
        properties.insert("duration".to_string(), serde_json::json!(1e300));
        assert_eq!(
            MockRenderProvider::video().estimated_render_time(&properties),
            Duration::from_millis(u64::MAX)
        );

        properties.insert("pages".to_string(), serde_json::json!(u64::MAX));
        assert!(MockRenderProvider::print().estimated_render_time(&properties) > Duration::ZERO);
    }
}
