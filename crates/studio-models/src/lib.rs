//! Shared data models for the render/publish pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Projects, variants and the project status state machine
//! - Job types and job records used for observability
//! - Provider-facing render jobs and results
//! - Publish requests, destinations and schedules

pub mod ids;
pub mod job;
pub mod project;
pub mod publish;
pub mod render;
pub mod schedule;

// Re-export common types
pub use ids::{JobId, JobRecordId, ProjectId, ScheduleId, TenantId, VariantId};
pub use job::{JobRecord, JobRecordStatus, JobRecordUpdate, JobType};
pub use project::{Project, ProjectKind, ProjectStatus, Variant, VariantStatus};
pub use publish::{Destination, PublishOutcome, PublishRequest, PublishResult};
pub use render::{RenderJob, RenderMetadata, RenderResult, RenderStatus};
pub use schedule::{Schedule, ScheduleStatus};
