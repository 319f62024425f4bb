use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::UpdateType;
use crate::db::DatabaseError;

/// Append-only activity log entry. `source_type`/`source_name` name
/// whatever produced it (a doctor, the device, the system).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: i64,
    pub patient_id: i64,
    pub update_type: UpdateType,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub source_type: Option<String>,
    pub source_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertUpdate {
    pub patient_id: i64,
    pub update_type: UpdateType,
    pub title: String,
    pub description: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub source_type: Option<String>,
    pub source_name: Option<String>,
}

impl InsertUpdate {
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.title.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("title is required".into()));
        }
        Ok(())
    }

    pub fn into_update(self, id: i64, now: DateTime<Utc>) -> Update {
        Update {
            id,
            patient_id: self.patient_id,
            update_type: self.update_type,
            title: self.title,
            description: self.description,
            timestamp: self.timestamp.unwrap_or(now),
            source_type: self.source_type,
            source_name: self.source_name,
        }
    }
}
