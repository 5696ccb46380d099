//! Project and variant models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ProjectId, TenantId, VariantId};
use crate::publish::PublishResult;

/// Kind of project, which also selects the render provider and queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    Video,
    Print,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Video => "video",
            ProjectKind::Print => "print",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Project lifecycle status.
///
/// ```text
/// DRAFT ──> RENDERING ──> RENDERED ──> PUBLISHING ──> PUBLISHED
///              │   ^         │             │   ^          │
///              v   └─────────┘             v   └──────────┘
///            FAILED ─────────────────> (retry either stage)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Rendering,
    Rendered,
    Publishing,
    Published,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "DRAFT",
            ProjectStatus::Rendering => "RENDERING",
            ProjectStatus::Rendered => "RENDERED",
            ProjectStatus::Publishing => "PUBLISHING",
            ProjectStatus::Published => "PUBLISHED",
            ProjectStatus::Failed => "FAILED",
        }
    }

    /// Whether a job is currently driving this project.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, ProjectStatus::Rendering | ProjectStatus::Publishing)
    }

    /// Whether variants may be written in this status.
    pub fn allows_variant_writes(&self) -> bool {
        self.is_in_progress()
    }

    /// Check whether moving from `self` to `next` is a legal transition.
    ///
    /// Re-entering the in-progress states from FAILED is allowed so that a
    /// retried attempt can start over.
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (*self, next),
            (Draft | Rendered | Failed, Rendering)
                | (Rendering, Rendered | Failed)
                | (Rendered | Published | Failed, Publishing)
                | (Publishing, Published | Failed)
        )
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Render status of a single variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantStatus {
    #[default]
    Pending,
    Rendering,
    Rendered,
}

/// One per-aspect/format rendering output of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub project_id: ProjectId,
    /// Aspect or format descriptor, e.g. "9:16" or "A4".
    pub aspect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Provider job id of the render that produced (or is producing) this variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: VariantStatus,
}

impl Variant {
    pub fn new(project_id: ProjectId, aspect: impl Into<String>) -> Self {
        Self {
            id: VariantId::new(),
            project_id,
            aspect: aspect.into(),
            url: None,
            job_id: None,
            status: VariantStatus::Pending,
        }
    }
}

/// A video or print project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub tenant_id: TenantId,
    pub kind: ProjectKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish_results: Vec<PublishResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new draft project.
    pub fn new(tenant_id: TenantId, kind: ProjectKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            tenant_id,
            kind,
            name: name.into(),
            brand_id: None,
            status: ProjectStatus::Draft,
            variants: Vec::new(),
            published_at: None,
            publish_results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a variant for the given aspect.
    pub fn with_variant(mut self, aspect: impl Into<String>) -> Self {
        self.variants.push(Variant::new(self.id.clone(), aspect));
        self
    }

    /// Variants matching an aspect.
    pub fn variants_for<'a>(&'a self, aspect: &'a str) -> impl Iterator<Item = &'a Variant> + 'a {
        self.variants.iter().filter(move |v| v.aspect == aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_path_transitions() {
        assert!(ProjectStatus::Draft.can_transition_to(ProjectStatus::Rendering));
        assert!(ProjectStatus::Rendering.can_transition_to(ProjectStatus::Rendered));
        assert!(ProjectStatus::Rendering.can_transition_to(ProjectStatus::Failed));
        assert!(ProjectStatus::Failed.can_transition_to(ProjectStatus::Rendering));
    }

    #[test]
    fn test_publish_path_transitions() {
        assert!(ProjectStatus::Rendered.can_transition_to(ProjectStatus::Publishing));
        assert!(ProjectStatus::Publishing.can_transition_to(ProjectStatus::Published));
        assert!(ProjectStatus::Publishing.can_transition_to(ProjectStatus::Failed));
        assert!(ProjectStatus::Published.can_transition_to(ProjectStatus::Publishing));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!ProjectStatus::Draft.can_transition_to(ProjectStatus::Publishing));
        assert!(!ProjectStatus::Draft.can_transition_to(ProjectStatus::Rendered));
        assert!(!ProjectStatus::Draft.can_transition_to(ProjectStatus::Failed));
        assert!(!ProjectStatus::Rendering.can_transition_to(ProjectStatus::Published));
        assert!(!ProjectStatus::Published.can_transition_to(ProjectStatus::Draft));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&ProjectStatus::Publishing).unwrap();
        assert_eq!(json, "\"PUBLISHING\"");
        let parsed: ProjectStatus = serde_json::from_str("\"RENDERED\"").unwrap();
        assert_eq!(parsed, ProjectStatus::Rendered);
    }

    #[test]
    fn test_variants_for_aspect() {
        let project = Project::new(TenantId::from("t1"), ProjectKind::Video, "Launch")
            .with_variant("9:16")
            .with_variant("1:1")
            .with_variant("9:16");

        assert_eq!(project.variants_for("9:16").count(), 2);
        assert_eq!(project.variants_for("16:9").count(), 0);
    }
}
