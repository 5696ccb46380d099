//! Publish destination handlers.
//!
//! Real integrations (social networks, CMS, mail) live outside the worker;
//! the stub handlers here stand in for them with a fixed delay and always
//! succeed. Handlers must tolerate redelivery: the worker does not
//! guarantee exactly-once delivery to a destination.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use studio_models::{Destination, Project, PublishRequest, PublishResult};

/// Error raised by a destination handler.
///
/// Any handler error aborts the publish job; the message is recorded on the
/// job record as-is.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DestinationError {
    pub destination: Destination,
    pub message: String,
}

impl DestinationError {
    pub fn new(destination: Destination, message: impl Into<String>) -> Self {
        Self {
            destination,
            message: message.into(),
        }
    }
}

/// Publishes a project to one destination.
#[async_trait]
pub trait DestinationHandler: Send + Sync {
    fn destination(&self) -> Destination;

    async fn publish(
        &self,
        project: &Project,
        request: &PublishRequest,
    ) -> Result<PublishResult, DestinationError>;
}

/// Stub social handler.
pub struct SocialHandler {
    delay: Duration,
}

impl SocialHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl DestinationHandler for SocialHandler {
    fn destination(&self) -> Destination {
        Destination::Social
    }

    async fn publish(
        &self,
        project: &Project,
        request: &PublishRequest,
    ) -> Result<PublishResult, DestinationError> {
        tokio::time::sleep(self.delay).await;
        let platforms = if request.platforms.is_empty() {
            "all connected platforms".to_string()
        } else {
            request.platforms.join(", ")
        };
        debug!("Posted project {} to {}", project.id, platforms);
        Ok(PublishResult::success(
            Destination::Social,
            format!("Posted to {}", platforms),
        ))
    }
}

/// Stub website handler.
pub struct WebsiteHandler {
    delay: Duration,
}

impl WebsiteHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl DestinationHandler for WebsiteHandler {
    fn destination(&self) -> Destination {
        Destination::Website
    }

    async fn publish(
        &self,
        project: &Project,
        _request: &PublishRequest,
    ) -> Result<PublishResult, DestinationError> {
        tokio::time::sleep(self.delay).await;
        Ok(PublishResult::success(
            Destination::Website,
            format!("Published {} to website", project.name),
        ))
    }
}

/// Stub email handler.
pub struct EmailHandler {
    delay: Duration,
}

impl EmailHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl DestinationHandler for EmailHandler {
    fn destination(&self) -> Destination {
        Destination::Email
    }

    async fn publish(
        &self,
        _project: &Project,
        request: &PublishRequest,
    ) -> Result<PublishResult, DestinationError> {
        tokio::time::sleep(self.delay).await;
        Ok(PublishResult::success(
            Destination::Email,
            format!("Sent to {} recipient(s)", request.recipients.len()),
        ))
    }
}

/// Handlers by destination.
#[derive(Clone, Default)]
pub struct DestinationRegistry {
    handlers: HashMap<Destination, Arc<dyn DestinationHandler>>,
}

impl DestinationRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stub social, website and email handlers.
    pub fn with_stubs(delay: Duration) -> Self {
        Self::new()
            .with_handler(Arc::new(SocialHandler::new(delay)))
            .with_handler(Arc::new(WebsiteHandler::new(delay)))
            .with_handler(Arc::new(EmailHandler::new(delay)))
    }

    /// Register a handler, replacing any previous one for its destination.
    pub fn with_handler(mut self, handler: Arc<dyn DestinationHandler>) -> Self {
        self.handlers.insert(handler.destination(), handler);
        self
    }

    pub fn get(&self, destination: Destination) -> Option<Arc<dyn DestinationHandler>> {
        self.handlers.get(&destination).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_models::{ProjectKind, TenantId};

    #[tokio::test]
    async fn test_stub_handlers_succeed() {
        let registry = DestinationRegistry::with_stubs(Duration::ZERO);
        let project = Project::new(TenantId::from("t1"), ProjectKind::Video, "Launch");
        let request = PublishRequest::new(vec![Destination::Email])
            .with_recipients(vec!["a@example.com".into(), "b@example.com".into()]);

        let handler = registry.get(Destination::Email).unwrap();
        let result = handler.publish(&project, &request).await.unwrap();
        assert!(result.success);
        assert_eq!(result.destination, Destination::Email);
        assert_eq!(result.message, "Sent to 2 recipient(s)");
    }

    #[test]
    fn test_empty_registry() {
        assert!(DestinationRegistry::new().get(Destination::Social).is_none());
    }
}
