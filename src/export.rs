//! CSV export of one patient's record set.
//!
//! The file is a sequence of sections, one per collection. Each section is
//! a title row, a header row, the data rows and a blank separator line.
//! Text cells beginning with a formula trigger (`=`, `+`, `-`, `@`) are
//! prefixed with `'` so spreadsheet apps open them as text.

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::repository::*;
use crate::db::DatabaseError;
use crate::models::*;

/// Everything exported for one patient.
#[derive(Debug, Clone)]
pub struct PatientRecordSet {
    pub user: User,
    pub patient: Patient,
    pub health_metrics: Vec<HealthMetric>,
    pub appointments: Vec<Appointment>,
    pub prescriptions: Vec<Prescription>,
    pub device_alerts: Vec<DeviceAlert>,
    pub updates: Vec<Update>,
}

impl PatientRecordSet {
    /// `None` if the patient or its account does not exist.
    pub fn fetch(storage: &dyn Storage, patient_id: i64) -> Result<Option<Self>, DatabaseError> {
        let Some(patient) = storage.get_patient(patient_id)? else {
            return Ok(None);
        };
        let Some(user) = storage.get_user(patient.user_id)? else {
            return Ok(None);
        };

        Ok(Some(Self {
            health_metrics: storage.list_patient_health_metrics(patient_id)?,
            appointments: storage.list_patient_appointments(patient_id)?,
            prescriptions: storage.list_patient_prescriptions(patient_id)?,
            device_alerts: storage.list_patient_device_alerts(patient_id)?,
            updates: storage.list_patient_updates(patient_id)?,
            user,
            patient,
        }))
    }

    pub fn file_name(&self) -> String {
        format!("patient-{}-data.csv", self.patient.id)
    }
}

// ═══════════════════════════════════════════════════════════
// Cell encoding
// ═══════════════════════════════════════════════════════════

fn escape(cell: &str) -> String {
    let needs_quotes = cell.contains([',', '"', '\n', '\r']) || cell.trim() != cell;
    if needs_quotes {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Free text from users: neutralise formula triggers, then escape.
fn text(value: &str) -> String {
    if value.starts_with(['=', '+', '-', '@']) {
        escape(&format!("'{value}"))
    } else {
        escape(value)
    }
}

fn opt_text(value: &Option<String>) -> String {
    value.as_deref().map(text).unwrap_or_default()
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn opt_timestamp(value: &Option<DateTime<Utc>>) -> String {
    value.as_ref().map(timestamp).unwrap_or_default()
}

fn opt_date(value: &Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

struct CsvWriter {
    out: String,
}

impl CsvWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn row<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = String>,
    {
        let line: Vec<String> = cells.into_iter().collect();
        self.out.push_str(&line.join(","));
        self.out.push_str("\r\n");
    }

    fn section<T>(&mut self, title: &str, header: &[&str], rows: &[T], encode: impl Fn(&T) -> Vec<String>) {
        self.row([escape(title)]);
        self.row(header.iter().map(|h| h.to_string()));
        for row in rows {
            self.row(encode(row));
        }
        self.out.push_str("\r\n");
    }
}

// ═══════════════════════════════════════════════════════════
// Rendering
// ═══════════════════════════════════════════════════════════

pub fn render_patient_csv(records: &PatientRecordSet) -> String {
    let mut csv = CsvWriter::new();
    let (u, p) = (&records.user, &records.patient);

    csv.section(
        "Patient",
        &[
            "patientId", "firstName", "lastName", "email", "dateOfBirth", "gender", "phone",
            "address", "emergencyContact", "prosthesisType", "prosthesisModel",
            "prosthesisSerialNumber", "amputationType", "amputationDate", "fittingDate",
            "lastCalibrationDate", "insuranceProvider",
        ],
        std::slice::from_ref(p),
        |p| {
            vec![
                p.id.to_string(),
                text(&u.first_name),
                text(&u.last_name),
                opt_text(&u.email),
                opt_date(&p.date_of_birth),
                opt_text(&p.gender),
                opt_text(&p.phone),
                opt_text(&p.address),
                opt_text(&p.emergency_contact),
                opt_text(&p.prosthesis_type),
                opt_text(&p.prosthesis_model),
                opt_text(&p.prosthesis_serial_number),
                opt_text(&p.amputation_type),
                opt_date(&p.amputation_date),
                opt_date(&p.fitting_date),
                opt_date(&p.last_calibration_date),
                opt_text(&p.insurance_provider),
            ]
        },
    );

    csv.section(
        "Health Metrics",
        &[
            "id", "recordDate", "mobilityScore", "phantomPainScore", "sensorSensitivity",
            "stepCount", "gaitStability", "notes",
        ],
        &records.health_metrics,
        |m| {
            vec![
                m.id.to_string(),
                timestamp(&m.record_date),
                m.mobility_score.to_string(),
                m.phantom_pain_score.to_string(),
                m.sensor_sensitivity.to_string(),
                m.step_count.to_string(),
                m.gait_stability.to_string(),
                opt_text(&m.notes),
            ]
        },
    );

    csv.section(
        "Appointments",
        &["id", "title", "dateTime", "duration", "status", "location", "isVirtual", "notes"],
        &records.appointments,
        |a| {
            vec![
                a.id.to_string(),
                text(&a.title),
                timestamp(&a.date_time),
                a.duration.to_string(),
                a.status.to_string(),
                opt_text(&a.location),
                a.is_virtual.to_string(),
                opt_text(&a.notes),
            ]
        },
    );

    csv.section(
        "Prescriptions",
        &[
            "id", "medicationName", "dosage", "frequency", "instructions", "startDate",
            "endDate", "refillsRemaining", "isActive", "notes",
        ],
        &records.prescriptions,
        |rx| {
            vec![
                rx.id.to_string(),
                text(&rx.medication_name),
                text(&rx.dosage),
                text(&rx.frequency),
                opt_text(&rx.instructions),
                timestamp(&rx.start_date),
                opt_timestamp(&rx.end_date),
                rx.refills_remaining.to_string(),
                rx.is_active.to_string(),
                opt_text(&rx.notes),
            ]
        },
    );

    csv.section(
        "Device Alerts",
        &[
            "id", "timestamp", "alertType", "severity", "message", "isRead", "isResolved",
            "resolutionNotes", "resolvedAt",
        ],
        &records.device_alerts,
        |a| {
            vec![
                a.id.to_string(),
                timestamp(&a.timestamp),
                a.alert_type.to_string(),
                a.severity.to_string(),
                text(&a.message),
                a.is_read.to_string(),
                a.is_resolved.to_string(),
                opt_text(&a.resolution_notes),
                opt_timestamp(&a.resolved_at),
            ]
        },
    );

    csv.section(
        "Updates",
        &["id", "timestamp", "updateType", "title", "description", "sourceType", "sourceName"],
        &records.updates,
        |up| {
            vec![
                up.id.to_string(),
                timestamp(&up.timestamp),
                up.update_type.to_string(),
                text(&up.title),
                text(&up.description),
                opt_text(&up.source_type),
                opt_text(&up.source_name),
            ]
        },
    );

    csv.out
}
