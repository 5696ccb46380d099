//! Provider error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Submit failed: {0}")]
    SubmitFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Render service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn job_not_found(id: impl Into<String>) -> Self {
        Self::JobNotFound(id.into())
    }

    pub fn submit_failed(msg: impl Into<String>) -> Self {
        Self::SubmitFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map an HTTP status to an error.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            404 => Self::JobNotFound(body),
            500..=599 => Self::ServiceUnavailable(format!("{}: {}", status, body)),
            _ => Self::RequestFailed(format!("{}: {}", status, body)),
        }
    }

    /// Check if error is caused by the request itself and will recur unchanged.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::UnsupportedFormat(_) | ProviderError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            ProviderError::from_http_status(404, "missing"),
            ProviderError::JobNotFound(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(503, "down"),
            ProviderError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(400, "bad"),
            ProviderError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_permanent_errors() {
        assert!(ProviderError::UnsupportedFormat("avi".into()).is_permanent());
        assert!(!ProviderError::submit_failed("quota").is_permanent());
        assert!(!ProviderError::job_not_found("r-1").is_permanent());
    }
}
