use crate::db::repository::*;
use crate::db::DatabaseError;
use crate::models::*;

use super::types::*;

/// The five collections a patient timeline is built from.
#[derive(Debug, Clone, Default)]
pub struct TimelineSources {
    pub health_metrics: Vec<HealthMetric>,
    pub updates: Vec<Update>,
    pub appointments: Vec<Appointment>,
    pub prescriptions: Vec<Prescription>,
    pub device_alerts: Vec<DeviceAlert>,
}

impl TimelineSources {
    /// Each collection comes back in insertion (id) order, so equal-date
    /// items of one type list the older record first after the merge.
    pub fn fetch(storage: &dyn Storage, patient_id: i64) -> Result<Self, DatabaseError> {
        let mut health_metrics = storage.list_patient_health_metrics(patient_id)?;
        let mut updates = storage.list_patient_updates(patient_id)?;
        let mut appointments = storage.list_patient_appointments(patient_id)?;
        let mut prescriptions = storage.list_patient_prescriptions(patient_id)?;
        let mut device_alerts = storage.list_patient_device_alerts(patient_id)?;

        // Listings are newest first; the merge wants id order.
        health_metrics.sort_by_key(|m| m.id);
        updates.sort_by_key(|u| u.id);
        appointments.sort_by_key(|a| a.id);
        prescriptions.sort_by_key(|p| p.id);
        device_alerts.sort_by_key(|a| a.id);

        Ok(Self {
            health_metrics,
            updates,
            appointments,
            prescriptions,
            device_alerts,
        })
    }
}

fn item(
    event_type: EventType,
    source_id: i64,
    date: chrono::DateTime<chrono::Utc>,
    title: String,
    description: String,
) -> TimelineItem {
    TimelineItem {
        id: format!("{}-{source_id}", event_type.id_prefix()),
        source_id,
        date,
        event_type,
        title,
        description,
        icon: event_type.icon(),
    }
}

pub(super) fn metric_item(m: &HealthMetric) -> TimelineItem {
    item(
        EventType::HealthMetric,
        m.id,
        m.record_date,
        "Health metrics recorded".into(),
        format!(
            "Mobility {}, phantom pain {}/10, gait stability {}%, {} steps",
            m.mobility_score, m.phantom_pain_score, m.gait_stability, m.step_count
        ),
    )
}

pub(super) fn update_item(u: &Update) -> TimelineItem {
    item(
        EventType::Update,
        u.id,
        u.timestamp,
        u.title.clone(),
        u.description.clone(),
    )
}

pub(super) fn appointment_item(a: &Appointment) -> TimelineItem {
    let place = if a.is_virtual {
        "virtual".to_string()
    } else {
        a.location.clone().unwrap_or_else(|| "in person".into())
    };
    item(
        EventType::Appointment,
        a.id,
        a.date_time,
        a.title.clone(),
        format!("{}, {} min, {place}", capitalize(a.status.as_str()), a.duration),
    )
}

pub(super) fn prescription_item(p: &Prescription) -> TimelineItem {
    item(
        EventType::Prescription,
        p.id,
        p.start_date,
        format!("Prescribed {}", p.medication_name),
        format!("{}, {}", p.dosage, p.frequency),
    )
}

pub(super) fn alert_item(a: &DeviceAlert) -> TimelineItem {
    item(
        EventType::DeviceAlert,
        a.id,
        a.timestamp,
        format!("{} alert ({})", capitalize(a.alert_type.as_str()), a.severity),
        a.message.clone(),
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
