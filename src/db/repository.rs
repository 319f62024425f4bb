//! Repository interface over the portal's entities.
//!
//! One trait per entity, combined into [`Storage`]. Handlers depend on
//! `dyn Storage` only, so the in-memory store can be swapped for a
//! persistent one without touching call sites.
//!
//! Lookups return `Ok(None)` for a missing id; mutations of a missing id
//! return `DatabaseError::NotFound`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::DatabaseError;
use crate::models::*;

pub trait UserRepository {
    fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;
    /// Usernames are unique; a clash returns `DatabaseError::Duplicate`.
    fn create_user(&self, user: InsertUser) -> Result<User, DatabaseError>;
    fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, DatabaseError>;
}

pub trait MedicalStaffRepository {
    fn get_medical_staff(&self, id: i64) -> Result<Option<MedicalStaff>, DatabaseError>;
    fn get_medical_staff_by_user_id(&self, user_id: i64)
        -> Result<Option<MedicalStaff>, DatabaseError>;
    fn list_medical_staff(&self) -> Result<Vec<StaffWithUser>, DatabaseError>;
    fn create_medical_staff(&self, staff: InsertMedicalStaff) -> Result<MedicalStaff, DatabaseError>;
}

pub trait PatientRepository {
    fn get_patient(&self, id: i64) -> Result<Option<Patient>, DatabaseError>;
    fn get_patient_by_user_id(&self, user_id: i64) -> Result<Option<Patient>, DatabaseError>;
    fn list_patients(&self) -> Result<Vec<Patient>, DatabaseError>;
    fn create_patient(&self, patient: InsertPatient) -> Result<Patient, DatabaseError>;
    fn update_patient(&self, id: i64, patch: PatientPatch) -> Result<Patient, DatabaseError>;
}

pub trait AppointmentRepository {
    fn get_appointment(&self, id: i64) -> Result<Option<Appointment>, DatabaseError>;
    /// Sorted by `date_time`, earliest first.
    fn list_patient_appointments(&self, patient_id: i64) -> Result<Vec<Appointment>, DatabaseError>;
    /// `staff_id` is a medical staff id.
    fn list_doctor_appointments(&self, staff_id: i64) -> Result<Vec<Appointment>, DatabaseError>;
    fn create_appointment(&self, appointment: InsertAppointment)
        -> Result<Appointment, DatabaseError>;
    /// Enforces `scheduled → completed | cancelled`.
    fn update_appointment(&self, id: i64, patch: AppointmentPatch)
        -> Result<Appointment, DatabaseError>;
    fn delete_appointment(&self, id: i64) -> Result<(), DatabaseError>;
    /// Attach the doctor's account (appointment → medical staff → user).
    fn with_doctors(
        &self,
        appointments: Vec<Appointment>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AppointmentWithDoctor>, DatabaseError>;

    fn get_appointment_with_doctor(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<AppointmentWithDoctor>, DatabaseError> {
        match self.get_appointment(id)? {
            Some(appointment) => Ok(self.with_doctors(vec![appointment], now)?.pop()),
            None => Ok(None),
        }
    }
}

pub trait HealthMetricRepository {
    /// Sorted by `record_date`, newest first.
    fn list_patient_health_metrics(&self, patient_id: i64)
        -> Result<Vec<HealthMetric>, DatabaseError>;
    /// The metric with the greatest `record_date`.
    fn get_latest_patient_health_metric(&self, patient_id: i64)
        -> Result<Option<HealthMetric>, DatabaseError>;
    fn create_health_metric(&self, metric: InsertHealthMetric)
        -> Result<HealthMetric, DatabaseError>;
    fn update_health_metric(&self, id: i64, patch: HealthMetricPatch)
        -> Result<HealthMetric, DatabaseError>;
}

/// Result of a refill request: the annotated prescription and the
/// activity entry recorded for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefillOutcome {
    pub prescription: Prescription,
    pub update: Update,
}

pub trait PrescriptionRepository {
    fn get_prescription(&self, id: i64) -> Result<Option<Prescription>, DatabaseError>;
    /// Sorted by `start_date`, newest first.
    fn list_patient_prescriptions(&self, patient_id: i64)
        -> Result<Vec<Prescription>, DatabaseError>;
    fn list_active_patient_prescriptions(
        &self,
        patient_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Prescription>, DatabaseError>;
    fn create_prescription(&self, prescription: InsertPrescription)
        -> Result<Prescription, DatabaseError>;
    fn update_prescription(&self, id: i64, patch: PrescriptionPatch)
        -> Result<Prescription, DatabaseError>;
    /// Appends a dated note and a `prescription_change` update in one step.
    /// `refills_remaining` is left as is.
    fn request_refill(&self, id: i64, requested_by: &str) -> Result<RefillOutcome, DatabaseError>;
}

pub trait DeviceAlertRepository {
    fn get_device_alert(&self, id: i64) -> Result<Option<DeviceAlert>, DatabaseError>;
    /// Sorted by `timestamp`, newest first.
    fn list_patient_device_alerts(&self, patient_id: i64)
        -> Result<Vec<DeviceAlert>, DatabaseError>;
    fn list_unread_patient_device_alerts(&self, patient_id: i64)
        -> Result<Vec<DeviceAlert>, DatabaseError>;
    fn create_device_alert(&self, alert: InsertDeviceAlert) -> Result<DeviceAlert, DatabaseError>;
    fn mark_device_alert_read(&self, id: i64) -> Result<DeviceAlert, DatabaseError>;
    fn resolve_device_alert(&self, id: i64, notes: String) -> Result<DeviceAlert, DatabaseError>;
}

pub trait UpdateRepository {
    /// Sorted by `timestamp`, newest first.
    fn list_patient_updates(&self, patient_id: i64) -> Result<Vec<Update>, DatabaseError>;
    fn create_update(&self, update: InsertUpdate) -> Result<Update, DatabaseError>;
}

pub trait MessageRepository {
    fn get_message(&self, id: i64) -> Result<Option<Message>, DatabaseError>;
    /// Everything sent or received by the user, newest first.
    fn list_user_messages(&self, user_id: i64) -> Result<Vec<Message>, DatabaseError>;
    /// Both directions between `a` and `b`, oldest first.
    fn list_conversation(&self, a: i64, b: i64) -> Result<Vec<Message>, DatabaseError>;
    fn create_message(&self, message: InsertMessage) -> Result<Message, DatabaseError>;
    fn mark_message_read(&self, id: i64) -> Result<Message, DatabaseError>;
}

pub trait SupportRequestRepository {
    fn get_support_request(&self, id: i64) -> Result<Option<SupportRequest>, DatabaseError>;
    /// Sorted by `created_at`, newest first.
    fn list_patient_support_requests(&self, patient_id: i64)
        -> Result<Vec<SupportRequest>, DatabaseError>;
    fn create_support_request(&self, request: InsertSupportRequest)
        -> Result<SupportRequest, DatabaseError>;
    fn update_support_request_status(
        &self,
        id: i64,
        status: SupportStatus,
    ) -> Result<SupportRequest, DatabaseError>;
    /// `staff_id` must name an existing medical staff record.
    fn assign_support_request(&self, id: i64, staff_id: i64)
        -> Result<SupportRequest, DatabaseError>;
}

/// Everything the API layer needs from persistence.
pub trait Storage:
    UserRepository
    + MedicalStaffRepository
    + PatientRepository
    + AppointmentRepository
    + HealthMetricRepository
    + PrescriptionRepository
    + DeviceAlertRepository
    + UpdateRepository
    + MessageRepository
    + SupportRequestRepository
    + Send
    + Sync
{
}

impl<T> Storage for T where
    T: UserRepository
        + MedicalStaffRepository
        + PatientRepository
        + AppointmentRepository
        + HealthMetricRepository
        + PrescriptionRepository
        + DeviceAlertRepository
        + UpdateRepository
        + MessageRepository
        + SupportRequestRepository
        + Send
        + Sync
{
}
