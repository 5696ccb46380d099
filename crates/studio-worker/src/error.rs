//! Worker error types.

use std::fmt;

use thiserror::Error;

use studio_provider::ProviderError;
use studio_queue::QueueError;
use studio_store::StoreError;

use crate::publish::DestinationError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Coarse classification used to decide whether a job is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Project or schedule absent for the tenant
    NotFound,
    /// Render provider or publish destination failure
    Provider,
    /// Render polling exhausted its budget
    Timeout,
    /// Malformed payload or a request the state machine rejects
    Validation,
    /// Infrastructure failure (queue, storage)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Provider => "provider",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Provider reported a failed render; the message is the provider's.
    #[error("{0}")]
    RenderFailed(String),

    #[error("Render timed out: {0}")]
    Timeout(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Destination(#[from] DestinationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailed(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::NotFound(_) => ErrorKind::NotFound,
            WorkerError::Validation(_) => ErrorKind::Validation,
            WorkerError::RenderFailed(_) | WorkerError::Destination(_) => ErrorKind::Provider,
            WorkerError::Timeout(_) => ErrorKind::Timeout,
            WorkerError::Provider(e) if e.is_permanent() => ErrorKind::Validation,
            WorkerError::Provider(_) => ErrorKind::Provider,
            WorkerError::Store(e) if e.is_not_found() => ErrorKind::NotFound,
            WorkerError::Store(e) if e.is_retryable() => ErrorKind::Internal,
            WorkerError::Store(_) => ErrorKind::Validation,
            WorkerError::Queue(e) if e.is_payload_error() => ErrorKind::Validation,
            WorkerError::Queue(_) | WorkerError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if error is retryable.
    ///
    /// Missing records and invalid payloads fail the same way on every
    /// attempt, so they go straight to the failed set.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Provider | ErrorKind::Timeout | ErrorKind::Internal
        )
    }
}
