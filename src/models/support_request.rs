use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{SupportPriority, SupportStatus};
use crate::db::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequest {
    pub id: i64,
    pub patient_id: i64,
    pub subject: String,
    pub description: String,
    pub category: Option<String>,
    pub status: SupportStatus,
    pub priority: SupportPriority,
    /// Medical staff id.
    pub assigned_to: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_priority() -> SupportPriority {
    SupportPriority::Medium
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSupportRequest {
    pub patient_id: i64,
    pub subject: String,
    pub description: String,
    pub category: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: SupportPriority,
}

impl InsertSupportRequest {
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.subject.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("subject is required".into()));
        }
        Ok(())
    }

    pub fn into_request(self, id: i64, now: DateTime<Utc>) -> SupportRequest {
        SupportRequest {
            id,
            patient_id: self.patient_id,
            subject: self.subject,
            description: self.description,
            category: self.category,
            status: SupportStatus::Open,
            priority: self.priority,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }
}
