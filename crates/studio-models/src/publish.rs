//! Publish requests, destinations and per-destination results.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// A publish target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Social,
    Website,
    Email,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Social => "social",
            Destination::Website => "website",
            Destination::Email => "email",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publish request (the `publishDto` of a publish job).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Destinations, handled sequentially in this order.
    #[validate(length(min = 1, message = "at least one destination is required"))]
    pub destinations: Vec<Destination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Social platforms (e.g. "instagram") when publishing to social.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    /// Recipients when publishing to email.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Free-form metadata passed through to destination handlers.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl PublishRequest {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self {
            destinations,
            caption: None,
            platforms: Vec::new(),
            recipients: Vec::new(),
            scheduled_at: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Set caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set email recipients.
    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.recipients = recipients;
        self
    }
}

/// Outcome of publishing to a single destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub destination: Destination,
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl PublishResult {
    pub fn success(destination: Destination, message: impl Into<String>) -> Self {
        Self {
            destination,
            success: true,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(destination: Destination, message: impl Into<String>) -> Self {
        Self {
            destination,
            success: false,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Aggregated publish results, stored as the job record result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub publish_results: Vec<PublishResult>,
}

impl PublishOutcome {
    /// Whether every destination reported success.
    pub fn all_succeeded(&self) -> bool {
        self.publish_results.iter().all(|r| r.success)
    }
}
