//! Worker configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Render polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPollConfig {
    /// Delay between two status reads
    pub interval: Duration,
    /// Maximum number of status reads before giving up
    pub max_polls: u32,
}

impl Default for RenderPollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            max_polls: 60,
        }
    }
}

impl RenderPollConfig {
    /// Upper bound on the time spent polling one render.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_polls
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Sleep between queue scans when every queue is empty
    pub idle_poll_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Render polling
    pub render: RenderPollConfig,
    /// Simulated latency of the stub destination handlers
    pub publish_stub_delay: Duration,
    /// Prometheus listener, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            idle_poll_interval: Duration::from_millis(500),
            shutdown_timeout: Duration::from_secs(30),
            render: RenderPollConfig::default(),
            publish_stub_delay: Duration::from_millis(500),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            idle_poll_interval: Duration::from_millis(
                std::env::var("WORKER_IDLE_POLL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            render: RenderPollConfig {
                interval: Duration::from_millis(
                    std::env::var("RENDER_POLL_INTERVAL_MS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(5000),
                ),
                max_polls: std::env::var("RENDER_MAX_POLLS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            },
            publish_stub_delay: Duration::from_millis(
                std::env::var("PUBLISH_STUB_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            metrics_addr: std::env::var("METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_poll_defaults() {
        let poll = RenderPollConfig::default();
        assert_eq!(poll.interval, Duration::from_millis(5000));
        assert_eq!(poll.max_polls, 60);
        assert_eq!(poll.budget(), Duration::from_secs(300));
    }
}
