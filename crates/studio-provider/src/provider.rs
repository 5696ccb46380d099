//! The render provider trait.

use std::time::Duration;

use async_trait::async_trait;
use studio_models::{RenderJob, RenderResult};

use crate::error::ProviderResult;

/// Uniform interface to a video or print rendering backend.
///
/// `submit_job` returns as soon as the backend accepted the work; the
/// render itself progresses out of band and is observed through
/// `get_job_status`, which must be safe to call repeatedly.
#[async_trait]
pub trait RenderProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Submit a render and return the provider-assigned job id.
    async fn submit_job(&self, job: &RenderJob) -> ProviderResult<String>;

    /// Read the current status. Unknown ids fail with `JobNotFound`.
    async fn get_job_status(&self, provider_job_id: &str) -> ProviderResult<RenderResult>;

    /// Cancel a render. Returns `false` if it already reached a terminal state.
    async fn cancel_job(&self, provider_job_id: &str) -> ProviderResult<bool>;

    /// Output formats this provider can produce.
    fn supported_formats(&self) -> Vec<String>;

    /// Rough render time for the given properties.
    fn estimated_render_time(&self, properties: &serde_json::Map<String, serde_json::Value>)
        -> Duration;

    /// Whether `format` is one of the supported output formats.
    fn supports_format(&self, format: &str) -> bool {
        self.supported_formats()
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}
