use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// One entry in a patient's activity feed, projected from any of the
/// five source collections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    /// `<kind>-<source id>`, unique across collections.
    pub id: String,
    pub source_id: i64,
    pub date: DateTime<Utc>,
    pub event_type: EventType,
    pub title: String,
    pub description: String,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    HealthMetric,
    Update,
    Appointment,
    Prescription,
    DeviceAlert,
}

impl EventType {
    /// Source-collection order used as the merge tie-break.
    pub const ALL: [EventType; 5] = [
        EventType::HealthMetric,
        EventType::Update,
        EventType::Appointment,
        EventType::Prescription,
        EventType::DeviceAlert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HealthMetric => "health_metric",
            Self::Update => "update",
            Self::Appointment => "appointment",
            Self::Prescription => "prescription",
            Self::DeviceAlert => "device_alert",
        }
    }

    /// Prefix of `TimelineItem::id`.
    pub(super) fn id_prefix(&self) -> &'static str {
        match self {
            Self::HealthMetric => "metric",
            Self::Update => "update",
            Self::Appointment => "appointment",
            Self::Prescription => "prescription",
            Self::DeviceAlert => "alert",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::HealthMetric => "activity",
            Self::Update => "message-square",
            Self::Appointment => "calendar",
            Self::Prescription => "pill",
            Self::DeviceAlert => "alert-triangle",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DatabaseError::InvalidEnum {
                field: "EventType".into(),
                value: s.into(),
            })
    }
}

/// Post-merge filter. `None` means "everything".
#[derive(Debug, Clone, Default)]
pub struct TimelineFilter {
    pub event_types: Option<Vec<EventType>>,
    pub limit: Option<usize>,
}

/// Complete timeline data: single response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    pub events: Vec<TimelineItem>,
    pub date_range: DateRange,
    pub event_counts: EventCounts,
}

/// Span of the returned events.
#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

/// Per-type totals before filtering, for filter badges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCounts {
    pub health_metrics: u32,
    pub updates: u32,
    pub appointments: u32,
    pub prescriptions: u32,
    pub device_alerts: u32,
}
