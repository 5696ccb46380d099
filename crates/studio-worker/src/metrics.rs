//! Worker metrics.
//!
//! - Job counters by type and outcome
//! - Job duration histograms
//! - Render poll and publish destination counters

use std::time::Duration;

use metrics::{counter, histogram};

use studio_models::{Destination, JobType};

/// Metric name constants for consistency.
pub mod names {
    /// Jobs finished by job type and status (completed, retrying, failed).
    pub const JOBS_TOTAL: &str = "studio_jobs_total";

    /// Job execution time in seconds by job type.
    pub const JOB_DURATION_SECONDS: &str = "studio_job_duration_seconds";

    /// Provider status reads.
    pub const RENDER_POLLS_TOTAL: &str = "studio_render_polls_total";

    /// Destination handler outcomes by destination and success.
    pub const PUBLISH_DESTINATIONS_TOTAL: &str = "studio_publish_destinations_total";
}

/// Record a finished job attempt.
pub fn record_job(job_type: JobType, status: &'static str, elapsed: Duration) {
    counter!(
        names::JOBS_TOTAL,
        "job_type" => job_type.as_str(),
        "status" => status
    )
    .increment(1);

    histogram!(
        names::JOB_DURATION_SECONDS,
        "job_type" => job_type.as_str()
    )
    .record(elapsed.as_secs_f64());
}

/// Record one provider status read.
pub fn record_render_poll() {
    counter!(names::RENDER_POLLS_TOTAL).increment(1);
}

/// Record a destination handler outcome.
pub fn record_destination(destination: Destination, success: bool) {
    counter!(
        names::PUBLISH_DESTINATIONS_TOTAL,
        "destination" => destination.as_str(),
        "success" => if success { "true" } else { "false" }
    )
    .increment(1);
}
