use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Direct message between two users. `is_read` only ever flips to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    pub fn involves(&self, user_id: i64) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    pub fn between(&self, a: i64, b: i64) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
}

impl InsertMessage {
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.content.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("content is required".into()));
        }
        if self.sender_id == self.receiver_id {
            return Err(DatabaseError::ConstraintViolation(
                "cannot send a message to yourself".into(),
            ));
        }
        Ok(())
    }

    pub fn into_message(self, id: i64, now: DateTime<Utc>) -> Message {
        Message {
            id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            timestamp: now,
            is_read: false,
        }
    }
}
