//! Demo data: one doctor, one patient, and three months of history.
//!
//! Everything is laid out relative to a caller-supplied `now`, and metric
//! generation uses a fixed jitter table instead of randomness, so two
//! seeds with the same `now` produce identical records.

use chrono::{DateTime, Duration, Utc};

use super::repository::*;
use super::DatabaseError;
use crate::crypto::{self, CryptoError};
use crate::models::*;

pub const DEMO_DOCTOR_USERNAME: &str = "drsmith";
pub const DEMO_PATIENT_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "password";

/// Weeks of health metrics generated for the demo patient.
pub const SAMPLE_METRIC_WEEKS: u32 = 12;

/// Week-to-week wobble so the trend is not a straight line.
const JITTER: [i32; 6] = [0, 2, -1, 1, -2, 1];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Ids of the records other parts of the demo hang off.
#[derive(Debug, Clone, Copy)]
pub struct SeedSummary {
    pub doctor_user_id: i64,
    pub staff_id: i64,
    pub patient_user_id: i64,
    pub patient_id: i64,
}

/// Weekly metrics ending at `end`, oldest first, trending toward better
/// mobility and gait and less phantom pain.
pub fn generate_sample_metrics(
    patient_id: i64,
    end: DateTime<Utc>,
    weeks: u32,
) -> Vec<InsertHealthMetric> {
    let span = weeks.saturating_sub(1).max(1) as f64;

    (0..weeks)
        .map(|week| {
            let progress = week as f64 / span;
            let jitter = JITTER[week as usize % JITTER.len()];
            let weeks_back = i64::from(weeks - 1 - week);

            InsertHealthMetric {
                patient_id,
                record_date: Some(end - Duration::weeks(weeks_back)),
                mobility_score: (55.0 + 30.0 * progress).round() as i32 + jitter,
                phantom_pain_score: (7.0 - 4.0 * progress).round() as i32,
                sensor_sensitivity: (72 + 2 * week as i32).min(95),
                step_count: 3200 + 450 * week as i32 + 60 * jitter,
                gait_stability: (58.0 + 28.0 * progress).round() as i32 - jitter,
                notes: (week == weeks - 1).then(|| "Steady improvement since last fitting".to_string()),
            }
        })
        .map(|mut m| {
            m.mobility_score = m.mobility_score.clamp(0, 100);
            m.phantom_pain_score = m.phantom_pain_score.clamp(0, 10);
            m.gait_stability = m.gait_stability.clamp(0, 100);
            m
        })
        .collect()
}

/// Load the demo records into an empty store.
pub fn seed_demo_data(
    storage: &dyn Storage,
    password_iterations: u32,
    now: DateTime<Utc>,
) -> Result<SeedSummary, SeedError> {
    let password_hash = crypto::hash_password(DEMO_PASSWORD, password_iterations)?;

    // ── Accounts ────────────────────────────────────────────

    let doctor = storage.create_user(InsertUser {
        username: DEMO_DOCTOR_USERNAME.into(),
        password_hash: password_hash.clone(),
        first_name: "Sarah".into(),
        last_name: "Smith".into(),
        email: Some("sarah.smith@example.com".into()),
        role: UserRole::Doctor,
    })?;
    let staff = storage.create_medical_staff(InsertMedicalStaff {
        user_id: doctor.id,
        specialty: "Prosthetics & Orthotics".into(),
        title: Some("Certified Prosthetist".into()),
        department: Some("Limb Restoration".into()),
        phone: Some("555-0142".into()),
        bio: Some("Fits and calibrates lower-limb microprocessor prostheses.".into()),
    })?;

    let patient_user = storage.create_user(InsertUser {
        username: DEMO_PATIENT_USERNAME.into(),
        password_hash,
        first_name: "Alex".into(),
        last_name: "Rivera".into(),
        email: Some("alex.rivera@example.com".into()),
        role: UserRole::Patient,
    })?;
    let today = now.date_naive();
    let patient = storage.create_patient(InsertPatient {
        user_id: patient_user.id,
        date_of_birth: chrono::NaiveDate::from_ymd_opt(1986, 4, 12),
        gender: Some("Male".into()),
        phone: Some("555-0199".into()),
        address: Some("12 Harbor Lane, Portland, OR".into()),
        emergency_contact: Some("Maria Rivera, 555-0177".into()),
        prosthesis_type: Some("Transtibial".into()),
        prosthesis_model: Some("Adaptive Knee X3".into()),
        prosthesis_serial_number: Some("AKX3-2291-0457".into()),
        amputation_type: Some("Below knee, left".into()),
        amputation_date: Some(today - Duration::days(420)),
        fitting_date: Some(today - Duration::days(120)),
        last_calibration_date: Some(today - Duration::days(21)),
        insurance_provider: Some("Blue Harbor Health".into()),
    })?;

    // ── Health metrics ──────────────────────────────────────

    for metric in generate_sample_metrics(patient.id, now, SAMPLE_METRIC_WEEKS) {
        storage.create_health_metric(metric)?;
    }

    // ── Appointments ────────────────────────────────────────

    let appointments = [
        ("Initial socket fitting", -60, AppointmentStatus::Completed, false),
        ("Gait analysis", -21, AppointmentStatus::Completed, false),
        ("Alignment review", -10, AppointmentStatus::Cancelled, true),
        ("Quarterly calibration check", 5, AppointmentStatus::Scheduled, false),
        ("Virtual follow-up", 19, AppointmentStatus::Scheduled, true),
    ];
    for (title, days, status, is_virtual) in appointments {
        storage.create_appointment(InsertAppointment {
            patient_id: patient.id,
            doctor_id: staff.id,
            title: title.into(),
            date_time: now + Duration::days(days),
            duration: if is_virtual { 20 } else { 45 },
            status,
            location: (!is_virtual).then(|| "Clinic B, Room 204".to_string()),
            notes: None,
            is_virtual,
        })?;
    }

    // ── Prescriptions ───────────────────────────────────────

    storage.create_prescription(InsertPrescription {
        patient_id: patient.id,
        doctor_id: staff.id,
        medication_name: "Gabapentin".into(),
        dosage: "300mg".into(),
        frequency: "Three times daily".into(),
        instructions: Some("Take with food.".into()),
        start_date: Some(now - Duration::days(90)),
        end_date: None,
        refills_remaining: 3,
        is_active: true,
        notes: None,
    })?;
    storage.create_prescription(InsertPrescription {
        patient_id: patient.id,
        doctor_id: staff.id,
        medication_name: "Ibuprofen".into(),
        dosage: "400mg".into(),
        frequency: "As needed".into(),
        instructions: Some("No more than 3 doses a day.".into()),
        start_date: Some(now - Duration::days(30)),
        end_date: Some(now + Duration::days(60)),
        refills_remaining: 1,
        is_active: true,
        notes: None,
    })?;
    storage.create_prescription(InsertPrescription {
        patient_id: patient.id,
        doctor_id: staff.id,
        medication_name: "Tramadol".into(),
        dosage: "50mg".into(),
        frequency: "Every 6 hours".into(),
        instructions: None,
        start_date: Some(now - Duration::days(150)),
        end_date: Some(now - Duration::days(110)),
        refills_remaining: 0,
        is_active: false,
        notes: Some("Tapered off after fitting.".into()),
    })?;

    // ── Device alerts: one per lifecycle state ──────────────

    storage.create_device_alert(InsertDeviceAlert {
        patient_id: patient.id,
        alert_type: AlertType::Maintenance,
        severity: AlertSeverity::High,
        message: "Battery below 15%. Charge the knee unit tonight.".into(),
        timestamp: Some(now - Duration::hours(3)),
    })?;
    let drift = storage.create_device_alert(InsertDeviceAlert {
        patient_id: patient.id,
        alert_type: AlertType::Calibration,
        severity: AlertSeverity::Medium,
        message: "Sensor drift detected on stance phase.".into(),
        timestamp: Some(now - Duration::days(2)),
    })?;
    storage.mark_device_alert_read(drift.id)?;
    let dropout = storage.create_device_alert(InsertDeviceAlert {
        patient_id: patient.id,
        alert_type: AlertType::Error,
        severity: AlertSeverity::Low,
        message: "Bluetooth connection dropped during sync.".into(),
        timestamp: Some(now - Duration::days(9)),
    })?;
    storage.resolve_device_alert(dropout.id, "Re-paired the device; sync completed.".into())?;

    // ── Activity updates ────────────────────────────────────

    let updates = [
        (
            UpdateType::DoctorFeedback,
            "Gait analysis results",
            "Stride symmetry improved 12% since the fitting. Keep up the balance exercises.",
            -20,
            "doctor",
            doctor.full_name(),
        ),
        (
            UpdateType::Calibration,
            "Knee damping recalibrated",
            "Swing-phase resistance lowered for stair descent.",
            -21,
            "device",
            "Adaptive Knee X3".to_string(),
        ),
        (
            UpdateType::Achievement,
            "10,000 steps in a day",
            "First day over 10,000 steps with the new prosthesis.",
            -4,
            "system",
            "Activity tracker".to_string(),
        ),
    ];
    for (update_type, title, description, days, source_type, source_name) in updates {
        storage.create_update(InsertUpdate {
            patient_id: patient.id,
            update_type,
            title: title.into(),
            description: description.into(),
            timestamp: Some(now + Duration::days(days)),
            source_type: Some(source_type.into()),
            source_name: Some(source_name),
        })?;
    }

    // ── Messages and support ────────────────────────────────

    let question = storage.create_message(InsertMessage {
        sender_id: patient_user.id,
        receiver_id: doctor.id,
        content: "The socket feels loose by the evening. Is that expected?".into(),
    })?;
    storage.mark_message_read(question.id)?;
    storage.create_message(InsertMessage {
        sender_id: doctor.id,
        receiver_id: patient_user.id,
        content: "Some volume change is normal. Try an extra sock ply and we'll check at your calibration visit.".into(),
    })?;

    storage.create_support_request(InsertSupportRequest {
        patient_id: patient.id,
        subject: "App stopped syncing step counts".into(),
        description: "Step counts have not updated since Tuesday.".into(),
        category: Some("technical".into()),
        priority: SupportPriority::Medium,
    })?;

    tracing::info!(
        patient_id = patient.id,
        staff_id = staff.id,
        "Demo data seeded"
    );

    Ok(SeedSummary {
        doctor_user_id: doctor.id,
        staff_id: staff.id,
        patient_user_id: patient_user.id,
        patient_id: patient.id,
    })
}
