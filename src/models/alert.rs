//! Device alerts and their read/resolve lifecycle.
//!
//! `Unread → Read → Resolved`, one direction only. Severity and type
//! are fixed at creation. Resolving implies reading, and a resolved
//! alert is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{AlertSeverity, AlertType};
use crate::db::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAlert {
    pub id: i64,
    pub patient_id: i64,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub is_resolved: bool,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Unread,
    Read,
    Resolved,
}

impl DeviceAlert {
    pub fn state(&self) -> AlertState {
        match (self.is_read, self.is_resolved) {
            (_, true) => AlertState::Resolved,
            (true, false) => AlertState::Read,
            (false, false) => AlertState::Unread,
        }
    }

    /// Idempotent; a no-op once read or resolved.
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }

    pub fn resolve(&mut self, notes: String, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        if self.is_resolved {
            return Err(DatabaseError::Conflict(format!(
                "alert {} is already resolved",
                self.id
            )));
        }
        self.is_read = true;
        self.is_resolved = true;
        self.resolution_notes = Some(notes);
        self.resolved_at = Some(at);
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertDeviceAlert {
    pub patient_id: i64,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl InsertDeviceAlert {
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.message.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("message is required".into()));
        }
        Ok(())
    }

    /// New alerts always start unread and unresolved.
    pub fn into_alert(self, id: i64, now: DateTime<Utc>) -> DeviceAlert {
        DeviceAlert {
            id,
            patient_id: self.patient_id,
            alert_type: self.alert_type,
            severity: self.severity,
            message: self.message,
            timestamp: self.timestamp.unwrap_or(now),
            is_read: false,
            is_resolved: false,
            resolution_notes: None,
            resolved_at: None,
        }
    }
}
