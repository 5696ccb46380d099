//! Render provider interface.
//!
//! This crate provides:
//! - The `RenderProvider` trait (submit, poll, cancel, formats, estimates)
//! - A timer-driven mock provider for video and print rendering
//! - An HTTP provider fronting an external rendering service

pub mod error;
pub mod http;
pub mod mock;
pub mod provider;

pub use error::{ProviderError, ProviderResult};
pub use http::{HttpProviderConfig, HttpRenderProvider};
pub use mock::{MockProviderConfig, MockRenderProvider};
pub use provider::RenderProvider;
