pub mod memory;
pub mod repository;
pub mod seed;

pub use memory::*;
pub use repository::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// The record is in a terminal state for the requested change.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Duplicate {entity_type}: {key}")]
    Duplicate { entity_type: String, key: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl DatabaseError {
    pub(crate) fn not_found(entity_type: &str, id: i64) -> Self {
        DatabaseError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}
