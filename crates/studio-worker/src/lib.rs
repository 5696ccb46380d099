//! Render and publish worker.
//!
//! This crate provides:
//! - Render processing (submit, poll, write back variants)
//! - Publish processing with destination handlers and scheduled publish
//! - Job executor over every configured queue
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod publish;
pub mod render;

pub use config::{RenderPollConfig, WorkerConfig};
pub use error::{ErrorKind, WorkerError, WorkerResult};
pub use executor::{JobExecutor, JobOutcome};
pub use logging::JobLogger;
pub use publish::{
    DestinationError, DestinationHandler, DestinationRegistry, EmailHandler, PublishProcessor,
    ScheduledOutcome, SocialHandler, WebsiteHandler,
};
pub use render::RenderProcessor;
