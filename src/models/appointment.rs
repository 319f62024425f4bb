use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;
use super::patch::{apply, blank_as_null};
use super::user::User;
use crate::db::DatabaseError;

pub const DEFAULT_APPOINTMENT_MINUTES: i32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    /// Medical staff id, not user id.
    pub doctor_id: i64,
    pub title: String,
    pub date_time: DateTime<Utc>,
    pub duration: i32,
    pub status: AppointmentStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub is_virtual: bool,
}

impl Appointment {
    /// Upcoming = still scheduled and not yet started. Everything else
    /// (completed, cancelled, or a scheduled slot already in the past)
    /// belongs to the history list.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status == AppointmentStatus::Scheduled && self.date_time >= now
    }
}

fn default_duration() -> i32 {
    DEFAULT_APPOINTMENT_MINUTES
}

fn default_status() -> AppointmentStatus {
    AppointmentStatus::Scheduled
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub title: String,
    pub date_time: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration: i32,
    #[serde(default = "default_status")]
    pub status: AppointmentStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_virtual: bool,
}

impl InsertAppointment {
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.title.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("title is required".into()));
        }
        if self.duration <= 0 {
            return Err(DatabaseError::ConstraintViolation(
                "duration must be a positive number of minutes".into(),
            ));
        }
        Ok(())
    }

    pub fn into_appointment(self, id: i64) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            title: self.title,
            date_time: self.date_time,
            duration: self.duration,
            status: self.status,
            location: self.location,
            notes: self.notes,
            is_virtual: self.is_virtual,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    pub doctor_id: Option<i64>,
    pub title: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub notes: Option<Option<String>>,
    pub is_virtual: Option<bool>,
}

impl AppointmentPatch {
    /// Validates the whole patch before touching the record, so a
    /// rejected patch leaves it unchanged.
    pub fn apply_to(self, appointment: &mut Appointment) -> Result<(), DatabaseError> {
        if let Some(next) = self.status {
            if !appointment.status.can_transition_to(next) {
                return Err(DatabaseError::InvalidTransition(format!(
                    "appointment {} cannot move from {} to {}",
                    appointment.id, appointment.status, next
                )));
            }
        }
        if matches!(self.duration, Some(d) if d <= 0) {
            return Err(DatabaseError::ConstraintViolation(
                "duration must be a positive number of minutes".into(),
            ));
        }
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err(DatabaseError::ConstraintViolation("title is required".into()));
        }

        apply(&mut appointment.doctor_id, self.doctor_id);
        apply(&mut appointment.title, self.title);
        apply(&mut appointment.date_time, self.date_time);
        apply(&mut appointment.duration, self.duration);
        apply(&mut appointment.status, self.status);
        apply(&mut appointment.location, self.location);
        apply(&mut appointment.notes, self.notes);
        apply(&mut appointment.is_virtual, self.is_virtual);
        Ok(())
    }
}

/// Appointment joined with the doctor's account (via medical staff).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentWithDoctor {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor: Option<User>,
    pub is_past: bool,
}

/// Which side of the upcoming/past split a listing wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentWindow {
    Upcoming,
    Past,
}

impl AppointmentWindow {
    pub fn includes(self, appointment: &Appointment, now: DateTime<Utc>) -> bool {
        match self {
            AppointmentWindow::Upcoming => appointment.is_upcoming(now),
            AppointmentWindow::Past => !appointment.is_upcoming(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(status: AppointmentStatus, offset_hours: i64) -> Appointment {
        Appointment {
            id: 7,
            patient_id: 1,
            doctor_id: 1,
            title: "Socket fitting".into(),
            date_time: Utc::now() + Duration::hours(offset_hours),
            duration: 45,
            status,
            location: None,
            notes: None,
            is_virtual: false,
        }
    }

    #[test]
    fn future_scheduled_is_upcoming() {
        let now = Utc::now();
        let appt = sample(AppointmentStatus::Scheduled, 24);
        assert!(AppointmentWindow::Upcoming.includes(&appt, now));
        assert!(!AppointmentWindow::Past.includes(&appt, now));
    }

    #[test]
    fn completed_future_appointment_is_past() {
        let now = Utc::now();
        let appt = sample(AppointmentStatus::Completed, 24);
        assert!(AppointmentWindow::Past.includes(&appt, now));
    }

    #[test]
    fn rejected_transition_leaves_record_unchanged() {
        let mut appt = sample(AppointmentStatus::Cancelled, 2);
        let patch: AppointmentPatch =
            serde_json::from_str(r#"{"status":"scheduled","title":"Moved"}"#).unwrap();
        assert!(patch.apply_to(&mut appt).is_err());
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
        assert_eq!(appt.title, "Socket fitting");
    }

    #[test]
    fn insert_defaults_to_scheduled_thirty_minutes() {
        let insert: InsertAppointment = serde_json::from_str(
            r#"{"patientId":1,"doctorId":1,"title":"Check-up","dateTime":"2026-11-02T15:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(insert.status, AppointmentStatus::Scheduled);
        assert_eq!(insert.duration, DEFAULT_APPOINTMENT_MINUTES);
        assert!(insert.validate().is_ok());
    }
}
