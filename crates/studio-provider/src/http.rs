//! HTTP render provider.
//!
//! Talks to a REST rendering service:
//! - `POST {base}/renders` with a [`RenderJob`] body, answers `{ "id": ... }`
//! - `GET {base}/renders/{id}` answers a [`RenderResult`]
//! - `DELETE {base}/renders/{id}` cancels (404 unknown, 409 not cancellable)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use studio_models::{ProjectKind, RenderJob, RenderResult};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::RenderProvider;

/// Configuration for an HTTP provider.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Provider name for logs
    pub name: String,
    /// Base URL of the rendering service
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Output formats the service accepts
    pub supported_formats: Vec<String>,
    /// Fixed part of the render time estimate
    pub base_estimate: Duration,
    /// Estimate per second of video or per printed page
    pub unit_estimate: Duration,
}

impl HttpProviderConfig {
    /// Defaults for a project kind pointing at `base_url`.
    pub fn new(kind: ProjectKind, base_url: impl Into<String>) -> Self {
        let (formats, base_estimate, unit_estimate): (&[&str], u64, u64) = match kind {
            ProjectKind::Video => (&["mp4", "mov", "webm", "gif"], 10_000, 2_000),
            ProjectKind::Print => (&["pdf", "png", "jpg"], 5_000, 1_500),
        };
        Self {
            name: format!("http-{}", kind),
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
            supported_formats: formats.iter().map(|f| f.to_string()).collect(),
            base_estimate: Duration::from_millis(base_estimate),
            unit_estimate: Duration::from_millis(unit_estimate),
        }
    }

    /// Create config from `{prefix}_BASE_URL`, `{prefix}_API_KEY` and
    /// `{prefix}_TIMEOUT_SECS`. Returns `None` when no base URL is set.
    pub fn from_env(prefix: &str, kind: ProjectKind) -> Option<Self> {
        let base_url = std::env::var(format!("{}_BASE_URL", prefix)).ok()?;
        let mut config = Self::new(kind, base_url);
        config.api_key = std::env::var(format!("{}_API_KEY", prefix)).ok();
        if let Some(secs) = std::env::var(format!("{}_TIMEOUT_SECS", prefix))
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Some(config)
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(alias = "jobId")]
    id: String,
}

/// Provider fronting an external rendering service over HTTP.
pub struct HttpRenderProvider {
    http: Client,
    base: Url,
    config: HttpProviderConfig,
}

impl HttpRenderProvider {
    /// Create a new HTTP provider.
    pub fn new(config: HttpProviderConfig) -> ProviderResult<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| ProviderError::Config(format!("invalid base URL: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self { http, base, config })
    }

    fn renders_url(&self, id: Option<&str>) -> ProviderResult<Url> {
        let path = match id {
            Some(id) => format!("renders/{}", urlencode_segment(id)),
            None => "renders".to_string(),
        };
        self.base
            .join(&path)
            .map_err(|e| ProviderError::Config(format!("invalid render URL: {}", e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn error_for(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ProviderError::from_http_status(status, body)
    }
}

fn urlencode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[async_trait]
impl RenderProvider for HttpRenderProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn submit_job(&self, job: &RenderJob) -> ProviderResult<String> {
        if !self.supports_format(&job.output_format) {
            return Err(ProviderError::UnsupportedFormat(job.output_format.clone()));
        }

        let url = self.renders_url(None)?;
        debug!("Submitting render for project {} to {}", job.project_id, url);

        let response = self.authorize(self.http.post(url)).json(job).send().await?;
        if !response.status().is_success() {
            let err = Self::error_for(response).await;
            return Err(ProviderError::submit_failed(err.to_string()));
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(e.to_string()))?;

        info!(
            "{} accepted render {} for project {}",
            self.config.name, submitted.id, job.project_id
        );
        Ok(submitted.id)
    }

    async fn get_job_status(&self, provider_job_id: &str) -> ProviderResult<RenderResult> {
        let url = self.renders_url(Some(provider_job_id))?;
        let response = self.authorize(self.http.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::job_not_found(provider_job_id));
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        response
            .json::<RenderResult>()
            .await
            .map_err(|e| ProviderError::invalid_response(e.to_string()))
    }

    async fn cancel_job(&self, provider_job_id: &str) -> ProviderResult<bool> {
        let url = self.renders_url(Some(provider_job_id))?;
        let response = self.authorize(self.http.delete(url)).send().await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Err(ProviderError::job_not_found(provider_job_id)),
            StatusCode::CONFLICT => {
                warn!("Render {} is no longer cancellable", provider_job_id);
                Ok(false)
            }
            _ => Err(Self::error_for(response).await),
        }
    }

    fn supported_formats(&self) -> Vec<String> {
        self.config.supported_formats.clone()
    }

    fn estimated_render_time(
        &self,
        properties: &serde_json::Map<String, serde_json::Value>,
    ) -> Duration {
        let units = properties
            .get("duration")
            .or_else(|| properties.get("pages"))
            .and_then(|v| v.as_f64())
            .filter(|u| *u > 0.0)
            .unwrap_or(1.0);
        let per_unit = Duration::try_from_secs_f64(self.config.unit_estimate.as_secs_f64() * units)
            .unwrap_or(Duration::MAX);
        self.config.base_estimate.saturating_add(per_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_models::{ProjectId, RenderStatus};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn render_job() -> RenderJob {
        RenderJob {
            id: "job-1".to_string(),
            project_id: ProjectId::from("p1"),
            aspect: "16:9".to_string(),
            script: "intro".to_string(),
            properties: serde_json::Map::new(),
            output_format: "mp4".to_string(),
        }
    }

    async fn provider(server: &MockServer) -> HttpRenderProvider {
        let config = HttpProviderConfig::new(ProjectKind::Video, format!("{}/v1", server.uri()))
            .with_api_key("secret");
        HttpRenderProvider::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_submit_returns_provider_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/renders"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "r-42" })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        let id = provider.submit_job(&render_job()).await.unwrap();
        assert_eq!(id, "r-42");
    }

    #[tokio::test]
    async fn test_submit_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/renders"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        let err = provider.submit_job(&render_job()).await.unwrap_err();
        assert!(matches!(err, ProviderError::SubmitFailed(_)));
    }

    #[tokio::test]
    async fn test_status_parses_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/renders/r-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobId": "r-42",
                "status": "completed",
                "outputUrl": "https://x/y.mp4"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        let result = provider.get_job_status("r-42").await.unwrap();
        assert_eq!(result.status, RenderStatus::Completed);
        assert_eq!(result.output_url.as_deref(), Some("https://x/y.mp4"));
    }

    #[tokio::test]
    async fn test_status_unknown_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/renders/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        let err = provider.get_job_status("missing").await.unwrap_err();
        assert!(matches!(err, ProviderError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_conflict_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/renders/r-1"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/renders/r-2"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        assert!(!provider.cancel_job("r-1").await.unwrap());
        assert!(provider.cancel_job("r-2").await.unwrap());
    }

    #[test]
    fn test_invalid_base_url() {
        let config = HttpProviderConfig::new(ProjectKind::Print, "not a url");
        assert!(matches!(
            HttpRenderProvider::new(config),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn test_estimate_uses_duration() {
        let provider =
            HttpRenderProvider::new(HttpProviderConfig::new(ProjectKind::Video, "http://localhost"))
                .unwrap();
        let mut properties = serde_json::Map::new();
        properties.insert("duration".to_string(), serde_json::json!(10));
        assert_eq!(
            provider.estimated_render_time(&properties),
            Duration::from_millis(30_000)
        );
    }

    #[test]
    fn test_estimate_saturates_on_huge_duration() {
        let provider =
            HttpRenderProvider::new(HttpProviderConfig::new(ProjectKind::Video, "http://localhost"))
                .unwrap();
        let mut properties = serde_json::Map::new();
        properties.insert("duration".to_string(), serde_json::json!(1e300));
        assert_eq!(provider.estimated_render_time(&properties), Duration::MAX);
    }
}
