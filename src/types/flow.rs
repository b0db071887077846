//! Menu flow types.
//!
//! A flow is one version of the USSD menu tree served for a service. The
//! steps and options that make up the tree live in [`super::step`].

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// A versioned USSD menu flow owned by a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct MenuFlow {
    /// Unique identifier
    pub id: Uuid,

    /// Display name shown in the flow list
    pub name: String,

    /// Owning USSD service
    pub service_id: Uuid,

    /// Flow version, starts at 1
    pub version: i32,

    /// Whether the gateway should serve this flow
    #[serde(default)]
    pub is_active: bool,

    /// Published flows are frozen for their version
    #[serde(default)]
    pub is_published: bool,

    /// Pending publication time, if scheduled
    #[serde(default)]
    #[ts(type = "string | null")]
    pub scheduled_publish_at: Option<DateTime<Utc>>,

    /// Language code of the menu texts (e.g. "en", "sw")
    pub language: String,

    #[serde(default)]
    pub description: String,

    // ─────────────────────────────────────────────────────────────────────
    // Audit
    // ─────────────────────────────────────────────────────────────────────
    pub created_by: String,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,

    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl MenuFlow {
    /// Create a draft flow: inactive, unpublished, version 1
    pub fn draft(
        name: impl Into<String>,
        service_id: Uuid,
        language: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            service_id,
            version: 1,
            is_active: false,
            is_published: false,
            scheduled_publish_at: None,
            language: language.into(),
            description: String::new(),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True while a publication is pending
    pub fn is_scheduled(&self) -> bool {
        self.scheduled_publish_at.is_some() && !self.is_published
    }

    /// Check whether the flow matches a status filter
    pub fn matches_status(&self, status: FlowStatus) -> bool {
        match status {
            FlowStatus::Active => self.is_active,
            FlowStatus::Inactive => !self.is_active,
            FlowStatus::Published => self.is_published,
            FlowStatus::Draft => !self.is_published,
            FlowStatus::Scheduled => self.is_scheduled(),
        }
    }
}

/// Status filter for flow listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum FlowStatus {
    Active,
    Inactive,
    Published,
    /// Not yet published
    Draft,
    /// Unpublished with a pending publication time
    Scheduled,
}

impl std::str::FromStr for FlowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "published" => Ok(Self::Published),
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(format!(
                "unknown flow status '{}' (expected active, inactive, published, draft, scheduled)",
                other
            )),
        }
    }
}

/// Filter applied when listing flows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowFilter {
    pub service_id: Option<Uuid>,
    pub status: Option<FlowStatus>,
}

impl FlowFilter {
    pub fn matches(&self, flow: &MenuFlow) -> bool {
        self.service_id.map_or(true, |id| flow.service_id == id)
            && self.status.map_or(true, |s| flow.matches_status(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults() {
        let flow = MenuFlow::draft("Main menu", Uuid::new_v4(), "en", "ops");
        assert_eq!(flow.version, 1);
        assert!(!flow.is_active);
        assert!(!flow.is_published);
        assert!(flow.scheduled_publish_at.is_none());
    }

    #[test]
    fn test_scheduled_status_requires_unpublished() {
        let mut flow = MenuFlow::draft("Main menu", Uuid::new_v4(), "en", "ops");
        flow.scheduled_publish_at = Some(Utc::now());
        assert!(flow.matches_status(FlowStatus::Scheduled));

        flow.is_published = true;
        assert!(!flow.matches_status(FlowStatus::Scheduled));
        assert!(flow.matches_status(FlowStatus::Published));
    }

    #[test]
    fn test_filter_by_service_and_status() {
        let service = Uuid::new_v4();
        let mut flow = MenuFlow::draft("Main menu", service, "en", "ops");
        flow.is_active = true;

        let filter = FlowFilter {
            service_id: Some(service),
            status: Some(FlowStatus::Active),
        };
        assert!(filter.matches(&flow));

        let other = FlowFilter {
            service_id: Some(Uuid::new_v4()),
            status: None,
        };
        assert!(!other.matches(&flow));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Draft".parse::<FlowStatus>(), Ok(FlowStatus::Draft));
        assert!("live".parse::<FlowStatus>().is_err());
    }
}
