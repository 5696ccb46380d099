//! Queue policies and configuration.
//!
//! Every job type has its own queue with default job options. The
//! defaults mirror the production policy:
//!
//! | queue | attempts | backoff | keep completed | keep failed |
//! |---|---|---|---|---|
//! | render-video / render-print | 3 | exponential 2000 ms | 100 | 50 |
//! | publish-video / publish-print / scheduled-publish | 2 | exponential 1000 ms | 200 | 100 |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use studio_models::JobType;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffType {
    /// `delay * 2^(attempt - 1)`
    Exponential,
    /// Constant `delay`
    Fixed,
}

/// Backoff policy (`{ type, delay }` with delay in milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    #[serde(rename = "type")]
    pub kind: BackoffType,
    pub delay: u64,
}

impl Backoff {
    pub fn exponential(delay_ms: u64) -> Self {
        Self {
            kind: BackoffType::Exponential,
            delay: delay_ms,
        }
    }

    pub fn fixed(delay_ms: u64) -> Self {
        Self {
            kind: BackoffType::Fixed,
            delay: delay_ms,
        }
    }

    /// Delay before the next attempt after `attempts_made` failed attempts.
    pub fn delay_for_attempt(&self, attempts_made: u32) -> Duration {
        let base = Duration::from_millis(self.delay);
        match self.kind {
            BackoffType::Fixed => base,
            BackoffType::Exponential => {
                let exponent = attempts_made.saturating_sub(1).min(31);
                base.saturating_mul(2u32.pow(exponent))
            }
        }
    }
}

/// Per-job options applied when a job is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Total attempts including the first one.
    pub attempts: u32,
    pub backoff: Backoff,
    /// Number of completed jobs retained per queue.
    pub remove_on_complete: usize,
    /// Number of failed jobs retained per queue.
    pub remove_on_fail: usize,
}

impl JobOptions {
    pub fn render() -> Self {
        Self {
            attempts: 3,
            backoff: Backoff::exponential(2000),
            remove_on_complete: 100,
            remove_on_fail: 50,
        }
    }

    pub fn publish() -> Self {
        Self {
            attempts: 2,
            backoff: Backoff::exponential(1000),
            remove_on_complete: 200,
            remove_on_fail: 100,
        }
    }

    /// Replace the backoff policy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Queue name plus its default job options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDefinition {
    pub name: String,
    pub default_job_options: JobOptions,
}

impl QueueDefinition {
    pub fn new(name: impl Into<String>, default_job_options: JobOptions) -> Self {
        Self {
            name: name.into(),
            default_job_options,
        }
    }

    /// Default definition for a job type.
    pub fn for_job_type(job_type: JobType) -> Self {
        let options = if job_type.is_render() {
            JobOptions::render()
        } else {
            JobOptions::publish()
        };
        Self::new(job_type.as_str(), options)
    }
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Prefix for every Redis key
    pub key_prefix: String,
    /// Queue definitions, one per job type
    pub queues: Vec<QueueDefinition>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "studio".to_string(),
            queues: JobType::ALL
                .into_iter()
                .map(QueueDefinition::for_job_type)
                .collect(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("QUEUE_KEY_PREFIX").unwrap_or_else(|_| "studio".to_string()),
            ..Default::default()
        }
    }

    /// Look up a queue definition by name.
    pub fn definition(&self, name: &str) -> Option<&QueueDefinition> {
        self.queues.iter().find(|q| q.name == name)
    }

    /// Names of all configured queues.
    pub fn queue_names(&self) -> impl Iterator<Item = &str> {
        self.queues.iter().map(|q| q.name.as_str())
    }

    /// Replace (or add) a queue definition.
    pub fn with_definition(mut self, definition: QueueDefinition) -> Self {
        match self.queues.iter_mut().find(|q| q.name == definition.name) {
            Some(existing) => *existing = definition,
            None => self.queues.push(definition),
        }
        self
    }

    /// Override the backoff of every queue while keeping attempts and retention.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        for queue in &mut self.queues {
            queue.default_job_options.backoff = backoff;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_render_policy() {
        let config = QueueConfig::default();
        for name in ["render-video", "render-print"] {
            let options = config.definition(name).unwrap().default_job_options;
            assert_eq!(options.attempts, 3);
            assert_eq!(options.backoff, Backoff::exponential(2000));
            assert_eq!(options.remove_on_complete, 100);
            assert_eq!(options.remove_on_fail, 50);
        }
    }

    #[test]
    fn test_default_publish_policy() {
        let config = QueueConfig::default();
        for name in ["publish-video", "publish-print", "scheduled-publish"] {
            let options = config.definition(name).unwrap().default_job_options;
            assert_eq!(options.attempts, 2);
            assert_eq!(options.backoff, Backoff::exponential(1000));
            assert_eq!(options.remove_on_complete, 200);
            assert_eq!(options.remove_on_fail, 100);
        }
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff::exponential(2000);
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::fixed(500);
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(backoff.delay_for_attempt(7), Duration::from_millis(500));
    }

    #[test]
    fn test_definition_wire_shape() {
        let definition = QueueDefinition::for_job_type(JobType::PublishVideo);
        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(value["name"], "publish-video");
        assert_eq!(value["defaultJobOptions"]["attempts"], 2);
        assert_eq!(value["defaultJobOptions"]["backoff"]["type"], "exponential");
        assert_eq!(value["defaultJobOptions"]["backoff"]["delay"], 1000);
        assert_eq!(value["defaultJobOptions"]["removeOnComplete"], 200);
        assert_eq!(value["defaultJobOptions"]["removeOnFail"], 100);
    }

    #[test]
    fn test_with_backoff_keeps_attempts() {
        let config = QueueConfig::default().with_backoff(Backoff::fixed(1));
        let options = config.definition("render-print").unwrap().default_job_options;
        assert_eq!(options.attempts, 3);
        assert_eq!(options.backoff, Backoff::fixed(1));
    }
}
