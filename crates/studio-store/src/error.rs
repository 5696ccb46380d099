//! Store error types.

use thiserror::Error;

use studio_models::ProjectStatus;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("Job record not found: {0}")]
    JobRecordNotFound(String),

    #[error("Invalid project transition: {from} -> {to}")]
    InvalidTransition { from: ProjectStatus, to: ProjectStatus },

    #[error("Variants of project {project_id} are read-only while {status}")]
    VariantLocked {
        project_id: String,
        status: ProjectStatus,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn project_not_found(id: impl Into<String>) -> Self {
        Self::ProjectNotFound(id.into())
    }

    pub fn schedule_not_found(id: impl Into<String>) -> Self {
        Self::ScheduleNotFound(id.into())
    }

    pub fn job_record_not_found(id: impl Into<String>) -> Self {
        Self::JobRecordNotFound(id.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Check if error is a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::ProjectNotFound(_)
                | StoreError::ScheduleNotFound(_)
                | StoreError::JobRecordNotFound(_)
        )
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}
