//! API endpoint handlers.
//!
//! One module per resource. Handlers check record ownership, call the
//! storage layer and return JSON.

pub mod appointments;
pub mod auth;
pub mod device_alerts;
pub mod health;
pub mod health_metrics;
pub mod medical_staff;
pub mod messages;
pub mod patients;
pub mod prescriptions;
pub mod support_requests;
pub mod timeline;
pub mod updates;
pub mod users;
