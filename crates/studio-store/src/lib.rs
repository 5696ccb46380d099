//! Persistence facade for the render/publish pipeline.
//!
//! Processors only need read/update-by-id access to projects, variants,
//! job records and schedules. This crate provides:
//! - The `ProjectStore` trait, which enforces the project state machine
//!   and variant write locking
//! - `MemoryStore`, an in-process implementation for tests and local runs

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::ProjectStore;
