//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for job processing with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

use studio_models::{JobId, JobType, ProjectId};

/// Job logger for structured logging with consistent formatting.
///
/// Every event carries the queue job id, the operation (job type) and,
/// once known, the project id.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
    project_id: String,
}

impl JobLogger {
    /// Create a new job logger for a queue job.
    pub fn new(job_id: &JobId, job_type: JobType) -> Self {
        Self::from_string(job_id.as_str(), job_type.as_str())
    }

    /// Create a new job logger from a string job ID.
    pub fn from_string(job_id: &str, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
            project_id: String::new(),
        }
    }

    /// Attach the project the job operates on.
    pub fn with_project(mut self, project_id: &ProjectId) -> Self {
        self.project_id = project_id.to_string();
        self
    }

    /// Log the start of a job operation.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            project_id = %self.project_id,
            "Job started: {}", message
        );
    }

    /// Log a progress update during job execution.
    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            project_id = %self.project_id,
            "Job progress: {}", message
        );
    }

    /// Log a warning during job execution.
    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            project_id = %self.project_id,
            "Job warning: {}", message
        );
    }

    /// Log an error during job execution.
    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            project_id = %self.project_id,
            "Job error: {}", message
        );
    }

    /// Log the completion of a job operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            project_id = %self.project_id,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation,
            project_id = %self.project_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, JobType::RenderVideo);

        assert_eq!(logger.job_id(), job_id.to_string());
        assert_eq!(logger.operation(), "render-video");
    }

    #[test]
    fn test_job_logger_from_string() {
        let logger = JobLogger::from_string("job-123", "publish-print")
            .with_project(&ProjectId::from("p1"));

        assert_eq!(logger.job_id(), "job-123");
        assert_eq!(logger.operation(), "publish-print");
    }
}
