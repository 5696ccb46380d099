//! Provider-facing render jobs and results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::ProjectId;

/// Render work submitted to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    /// Caller-side id for correlation (the queue job id).
    pub id: String,
    pub project_id: ProjectId,
    pub aspect: String,
    pub script: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub output_format: String,
}

/// Provider-side render status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Queued => "queued",
            RenderStatus::Processing => "processing",
            RenderStatus::Completed => "completed",
            RenderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderStatus::Completed | RenderStatus::Failed)
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output metadata reported by a provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Duration in seconds (video).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Page count (print).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}

/// Result of a status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub job_id: String,
    pub status: RenderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RenderMetadata>,
}

impl RenderResult {
    pub fn queued(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: RenderStatus::Queued,
            output_url: None,
            error: None,
            metadata: None,
        }
    }

    pub fn processing(job_id: impl Into<String>) -> Self {
        Self {
            status: RenderStatus::Processing,
            ..Self::queued(job_id)
        }
    }

    pub fn completed(job_id: impl Into<String>, output_url: impl Into<String>) -> Self {
        Self {
            status: RenderStatus::Completed,
            output_url: Some(output_url.into()),
            ..Self::queued(job_id)
        }
    }

    pub fn failed(job_id: impl Into<String>, error: Option<String>) -> Self {
        Self {
            status: RenderStatus::Failed,
            error,
            ..Self::queued(job_id)
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: RenderMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_result_schema() {
        let json = serde_json::json!({
            "jobId": "r-1",
            "status": "completed",
            "outputUrl": "https://x/y.mp4",
            "metadata": { "fileSize": 1024, "duration": 12.5 }
        });
        let result: RenderResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.status, RenderStatus::Completed);
        assert_eq!(result.output_url.as_deref(), Some("https://x/y.mp4"));
        assert_eq!(result.metadata.unwrap().file_size, Some(1024));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RenderStatus::Completed.is_terminal());
        assert!(RenderStatus::Failed.is_terminal());
        assert!(!RenderStatus::Queued.is_terminal());
        assert!(!RenderStatus::Processing.is_terminal());
    }
}
