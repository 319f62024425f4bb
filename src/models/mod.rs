pub mod alert;
pub mod appointment;
pub mod enums;
pub mod health_metric;
pub mod medical_staff;
pub mod message;
pub mod patch;
pub mod patient;
pub mod prescription;
pub mod support_request;
pub mod update;
pub mod user;

pub use alert::*;
pub use appointment::*;
pub use enums::*;
pub use health_metric::*;
pub use medical_staff::*;
pub use message::*;
pub use patient::*;
pub use prescription::*;
pub use support_request::*;
pub use update::*;
pub use user::*;
