//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Enqueue failed: {0}")]
    EnqueueFailed(String),

    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job payload: {0}")]
    Validation(String),

    #[error("Invalid job state: {0}")]
    InvalidState(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn enqueue_failed(msg: impl Into<String>) -> Self {
        Self::EnqueueFailed(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Check if error is caused by the job itself rather than the backend.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            QueueError::Validation(_) | QueueError::UnknownQueue(_) | QueueError::Json(_)
        )
    }
}
