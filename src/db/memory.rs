//! In-memory `Storage` implementation.
//!
//! One `BTreeMap` per entity keyed by an auto-incrementing id, plus
//! secondary indexes by patient, doctor, user and username so per-patient
//! queries do not scan whole tables. All tables sit behind a single
//! `RwLock`: every repository call takes the lock once, so no caller can
//! observe a multi-step mutation (e.g. a refill) half-applied.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::repository::*;
use super::DatabaseError;
use crate::models::*;

// ═══════════════════════════════════════════════════════════
// Tables and indexes
// ═══════════════════════════════════════════════════════════

struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T: Clone> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn select(&self, ids: impl IntoIterator<Item = i64>) -> Vec<T> {
        ids.into_iter()
            .filter_map(|id| self.rows.get(&id).cloned())
            .collect()
    }

    fn values(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }
}

/// Secondary index: owner key → ids, ascending.
#[derive(Default)]
struct Index {
    buckets: HashMap<i64, BTreeSet<i64>>,
}

impl Index {
    fn insert(&mut self, key: i64, id: i64) {
        self.buckets.entry(key).or_default().insert(id);
    }

    fn remove(&mut self, key: i64, id: i64) {
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(&id);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    fn ids(&self, key: i64) -> Vec<i64> {
        self.buckets
            .get(&key)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    user_by_name: HashMap<String, i64>,
    staff: Table<MedicalStaff>,
    staff_by_user: HashMap<i64, i64>,
    patients: Table<Patient>,
    patient_by_user: HashMap<i64, i64>,
    appointments: Table<Appointment>,
    appointments_by_patient: Index,
    appointments_by_doctor: Index,
    metrics: Table<HealthMetric>,
    metrics_by_patient: Index,
    prescriptions: Table<Prescription>,
    prescriptions_by_patient: Index,
    alerts: Table<DeviceAlert>,
    alerts_by_patient: Index,
    updates: Table<Update>,
    updates_by_patient: Index,
    messages: Table<Message>,
    messages_by_user: Index,
    support: Table<SupportRequest>,
    support_by_patient: Index,
}

impl Tables {
    fn require_user(&self, id: i64) -> Result<(), DatabaseError> {
        if self.users.rows.contains_key(&id) {
            Ok(())
        } else {
            Err(DatabaseError::ConstraintViolation(format!("user {id} does not exist")))
        }
    }

    fn require_patient(&self, id: i64) -> Result<(), DatabaseError> {
        if self.patients.rows.contains_key(&id) {
            Ok(())
        } else {
            Err(DatabaseError::ConstraintViolation(format!("patient {id} does not exist")))
        }
    }

    fn require_staff(&self, id: i64) -> Result<(), DatabaseError> {
        if self.staff.rows.contains_key(&id) {
            Ok(())
        } else {
            Err(DatabaseError::ConstraintViolation(format!(
                "medical staff {id} does not exist"
            )))
        }
    }

    fn insert_update(&mut self, insert: InsertUpdate, now: DateTime<Utc>) -> Update {
        let id = self.updates.next_id();
        let update = insert.into_update(id, now);
        self.updates_by_patient.insert(update.patient_id, id);
        self.updates.rows.insert(id, update.clone());
        update
    }
}

fn username_key(username: &str) -> String {
    username.trim().to_lowercase()
}

// ═══════════════════════════════════════════════════════════
// MemoryStore
// ═══════════════════════════════════════════════════════════

/// Process-lifetime store. Contents vanish on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, DatabaseError> {
        self.tables.read().map_err(|_| DatabaseError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, DatabaseError> {
        self.tables.write().map_err(|_| DatabaseError::LockPoisoned)
    }
}

// ── Users ───────────────────────────────────────────────────

impl UserRepository for MemoryStore {
    fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.read()?.users.get(id))
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let t = self.read()?;
        Ok(t.user_by_name
            .get(&username_key(username))
            .and_then(|id| t.users.get(*id)))
    }

    fn create_user(&self, user: InsertUser) -> Result<User, DatabaseError> {
        let key = username_key(&user.username);
        if key.is_empty() {
            return Err(DatabaseError::ConstraintViolation("username is required".into()));
        }

        let mut t = self.write()?;
        if t.user_by_name.contains_key(&key) {
            return Err(DatabaseError::Duplicate {
                entity_type: "user".into(),
                key: user.username,
            });
        }

        let id = t.users.next_id();
        let created = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            created_at: Utc::now(),
        };
        t.user_by_name.insert(key, id);
        t.users.rows.insert(id, created.clone());
        Ok(created)
    }

    fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, DatabaseError> {
        let mut t = self.write()?;
        let user = t
            .users
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("user", id))?;

        if let Some(first) = patch.first_name {
            user.first_name = first;
        }
        if let Some(last) = patch.last_name {
            user.last_name = last;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        Ok(user.clone())
    }
}

// ── Medical staff ───────────────────────────────────────────

impl MedicalStaffRepository for MemoryStore {
    fn get_medical_staff(&self, id: i64) -> Result<Option<MedicalStaff>, DatabaseError> {
        Ok(self.read()?.staff.get(id))
    }

    fn get_medical_staff_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Option<MedicalStaff>, DatabaseError> {
        let t = self.read()?;
        Ok(t.staff_by_user.get(&user_id).and_then(|id| t.staff.get(*id)))
    }

    fn list_medical_staff(&self) -> Result<Vec<StaffWithUser>, DatabaseError> {
        let t = self.read()?;
        Ok(t.staff
            .values()
            .into_iter()
            .filter_map(|staff| {
                t.users
                    .get(staff.user_id)
                    .map(|user| StaffWithUser { staff, user })
            })
            .collect())
    }

    fn create_medical_staff(
        &self,
        staff: InsertMedicalStaff,
    ) -> Result<MedicalStaff, DatabaseError> {
        let mut t = self.write()?;
        t.require_user(staff.user_id)?;
        if t.staff_by_user.contains_key(&staff.user_id) {
            return Err(DatabaseError::Duplicate {
                entity_type: "medical staff profile".into(),
                key: format!("user {}", staff.user_id),
            });
        }

        let id = t.staff.next_id();
        let created = MedicalStaff {
            id,
            user_id: staff.user_id,
            specialty: staff.specialty,
            title: staff.title,
            department: staff.department,
            phone: staff.phone,
            bio: staff.bio,
        };
        t.staff_by_user.insert(created.user_id, id);
        t.staff.rows.insert(id, created.clone());
        Ok(created)
    }
}

// ── Patients ────────────────────────────────────────────────

impl PatientRepository for MemoryStore {
    fn get_patient(&self, id: i64) -> Result<Option<Patient>, DatabaseError> {
        Ok(self.read()?.patients.get(id))
    }

    fn get_patient_by_user_id(&self, user_id: i64) -> Result<Option<Patient>, DatabaseError> {
        let t = self.read()?;
        Ok(t.patient_by_user
            .get(&user_id)
            .and_then(|id| t.patients.get(*id)))
    }

    fn list_patients(&self) -> Result<Vec<Patient>, DatabaseError> {
        Ok(self.read()?.patients.values())
    }

    fn create_patient(&self, patient: InsertPatient) -> Result<Patient, DatabaseError> {
        let mut t = self.write()?;
        t.require_user(patient.user_id)?;
        if t.patient_by_user.contains_key(&patient.user_id) {
            return Err(DatabaseError::Duplicate {
                entity_type: "patient profile".into(),
                key: format!("user {}", patient.user_id),
            });
        }

        let id = t.patients.next_id();
        let created = patient.into_patient(id);
        t.patient_by_user.insert(created.user_id, id);
        t.patients.rows.insert(id, created.clone());
        Ok(created)
    }

    fn update_patient(&self, id: i64, patch: PatientPatch) -> Result<Patient, DatabaseError> {
        let mut t = self.write()?;
        let patient = t
            .patients
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("patient", id))?;
        patch.apply_to(patient);
        Ok(patient.clone())
    }
}

// ── Appointments ────────────────────────────────────────────

fn sort_by_start(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|a, b| a.date_time.cmp(&b.date_time).then(a.id.cmp(&b.id)));
    appointments
}

impl AppointmentRepository for MemoryStore {
    fn get_appointment(&self, id: i64) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self.read()?.appointments.get(id))
    }

    fn list_patient_appointments(
        &self,
        patient_id: i64,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let t = self.read()?;
        let ids = t.appointments_by_patient.ids(patient_id);
        Ok(sort_by_start(t.appointments.select(ids)))
    }

    fn list_doctor_appointments(&self, staff_id: i64) -> Result<Vec<Appointment>, DatabaseError> {
        let t = self.read()?;
        let ids = t.appointments_by_doctor.ids(staff_id);
        Ok(sort_by_start(t.appointments.select(ids)))
    }

    fn create_appointment(
        &self,
        appointment: InsertAppointment,
    ) -> Result<Appointment, DatabaseError> {
        appointment.validate()?;
        let mut t = self.write()?;
        t.require_patient(appointment.patient_id)?;
        t.require_staff(appointment.doctor_id)?;

        let id = t.appointments.next_id();
        let created = appointment.into_appointment(id);
        t.appointments_by_patient.insert(created.patient_id, id);
        t.appointments_by_doctor.insert(created.doctor_id, id);
        t.appointments.rows.insert(id, created.clone());
        Ok(created)
    }

    fn update_appointment(
        &self,
        id: i64,
        patch: AppointmentPatch,
    ) -> Result<Appointment, DatabaseError> {
        let mut t = self.write()?;
        if let Some(doctor_id) = patch.doctor_id {
            t.require_staff(doctor_id)?;
        }

        let mut updated = t
            .appointments
            .get(id)
            .ok_or_else(|| DatabaseError::not_found("appointment", id))?;
        let previous_doctor = updated.doctor_id;
        patch.apply_to(&mut updated)?;

        if updated.doctor_id != previous_doctor {
            t.appointments_by_doctor.remove(previous_doctor, id);
            t.appointments_by_doctor.insert(updated.doctor_id, id);
        }
        t.appointments.rows.insert(id, updated.clone());
        Ok(updated)
    }

    fn delete_appointment(&self, id: i64) -> Result<(), DatabaseError> {
        let mut t = self.write()?;
        let removed = t
            .appointments
            .rows
            .remove(&id)
            .ok_or_else(|| DatabaseError::not_found("appointment", id))?;
        t.appointments_by_patient.remove(removed.patient_id, id);
        t.appointments_by_doctor.remove(removed.doctor_id, id);
        Ok(())
    }

    fn with_doctors(
        &self,
        appointments: Vec<Appointment>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AppointmentWithDoctor>, DatabaseError> {
        let t = self.read()?;
        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let doctor = t
                    .staff
                    .rows
                    .get(&appointment.doctor_id)
                    .and_then(|staff| t.users.get(staff.user_id));
                let is_past = !appointment.is_upcoming(now);
                AppointmentWithDoctor {
                    appointment,
                    doctor,
                    is_past,
                }
            })
            .collect())
    }
}

// ── Health metrics ──────────────────────────────────────────

impl HealthMetricRepository for MemoryStore {
    fn list_patient_health_metrics(
        &self,
        patient_id: i64,
    ) -> Result<Vec<HealthMetric>, DatabaseError> {
        let t = self.read()?;
        let mut metrics = t.metrics.select(t.metrics_by_patient.ids(patient_id));
        metrics.sort_by(|a, b| b.record_date.cmp(&a.record_date).then(b.id.cmp(&a.id)));
        Ok(metrics)
    }

    fn get_latest_patient_health_metric(
        &self,
        patient_id: i64,
    ) -> Result<Option<HealthMetric>, DatabaseError> {
        let t = self.read()?;
        Ok(t.metrics
            .select(t.metrics_by_patient.ids(patient_id))
            .into_iter()
            .max_by_key(|m| (m.record_date, m.id)))
    }

    fn create_health_metric(
        &self,
        metric: InsertHealthMetric,
    ) -> Result<HealthMetric, DatabaseError> {
        metric.validate()?;
        let mut t = self.write()?;
        t.require_patient(metric.patient_id)?;

        let id = t.metrics.next_id();
        let created = metric.into_metric(id, Utc::now());
        t.metrics_by_patient.insert(created.patient_id, id);
        t.metrics.rows.insert(id, created.clone());
        Ok(created)
    }

    fn update_health_metric(
        &self,
        id: i64,
        patch: HealthMetricPatch,
    ) -> Result<HealthMetric, DatabaseError> {
        let mut t = self.write()?;
        let metric = t
            .metrics
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("health metric", id))?;
        patch.apply_to(metric)?;
        Ok(metric.clone())
    }
}

// ── Prescriptions ───────────────────────────────────────────

impl PrescriptionRepository for MemoryStore {
    fn get_prescription(&self, id: i64) -> Result<Option<Prescription>, DatabaseError> {
        Ok(self.read()?.prescriptions.get(id))
    }

    fn list_patient_prescriptions(
        &self,
        patient_id: i64,
    ) -> Result<Vec<Prescription>, DatabaseError> {
        let t = self.read()?;
        let mut list = t
            .prescriptions
            .select(t.prescriptions_by_patient.ids(patient_id));
        list.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    fn list_active_patient_prescriptions(
        &self,
        patient_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Prescription>, DatabaseError> {
        let mut list = self.list_patient_prescriptions(patient_id)?;
        list.retain(|p| p.is_active_at(now));
        Ok(list)
    }

    fn create_prescription(
        &self,
        prescription: InsertPrescription,
    ) -> Result<Prescription, DatabaseError> {
        prescription.validate()?;
        let mut t = self.write()?;
        t.require_patient(prescription.patient_id)?;
        t.require_staff(prescription.doctor_id)?;

        let id = t.prescriptions.next_id();
        let created = prescription.into_prescription(id, Utc::now());
        t.prescriptions_by_patient.insert(created.patient_id, id);
        t.prescriptions.rows.insert(id, created.clone());
        Ok(created)
    }

    fn update_prescription(
        &self,
        id: i64,
        patch: PrescriptionPatch,
    ) -> Result<Prescription, DatabaseError> {
        let mut t = self.write()?;
        let prescription = t
            .prescriptions
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("prescription", id))?;
        patch.apply_to(prescription)?;
        Ok(prescription.clone())
    }

    fn request_refill(&self, id: i64, requested_by: &str) -> Result<RefillOutcome, DatabaseError> {
        let now = Utc::now();
        let mut t = self.write()?;
        let prescription = t
            .prescriptions
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("prescription", id))?;

        if !prescription.is_active_at(now) {
            return Err(DatabaseError::ConstraintViolation(format!(
                "prescription {id} is not active"
            )));
        }
        if prescription.refills_remaining <= 0 {
            tracing::warn!(prescription_id = id, "Refill requested with no refills remaining");
        }

        // TODO: decrement refills_remaining once the pharmacy workflow
        // confirms whether a request or a fulfilment consumes a refill.
        prescription.append_note(&format!(
            "Refill requested on {} by {requested_by}",
            now.format("%Y-%m-%d")
        ));
        let prescription = prescription.clone();

        let update = t.insert_update(
            InsertUpdate {
                patient_id: prescription.patient_id,
                update_type: UpdateType::PrescriptionChange,
                title: format!("Refill requested: {}", prescription.medication_name),
                description: format!(
                    "{} {} ({}) refill request submitted.",
                    prescription.medication_name, prescription.dosage, prescription.frequency
                ),
                timestamp: Some(now),
                source_type: Some("patient".into()),
                source_name: Some(requested_by.to_string()),
            },
            now,
        );

        Ok(RefillOutcome { prescription, update })
    }
}

// ── Device alerts ───────────────────────────────────────────

impl DeviceAlertRepository for MemoryStore {
    fn get_device_alert(&self, id: i64) -> Result<Option<DeviceAlert>, DatabaseError> {
        Ok(self.read()?.alerts.get(id))
    }

    fn list_patient_device_alerts(
        &self,
        patient_id: i64,
    ) -> Result<Vec<DeviceAlert>, DatabaseError> {
        let t = self.read()?;
        let mut alerts = t.alerts.select(t.alerts_by_patient.ids(patient_id));
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(alerts)
    }

    fn list_unread_patient_device_alerts(
        &self,
        patient_id: i64,
    ) -> Result<Vec<DeviceAlert>, DatabaseError> {
        let mut alerts = self.list_patient_device_alerts(patient_id)?;
        alerts.retain(|a| a.state() == AlertState::Unread);
        Ok(alerts)
    }

    fn create_device_alert(&self, alert: InsertDeviceAlert) -> Result<DeviceAlert, DatabaseError> {
        alert.validate()?;
        let mut t = self.write()?;
        t.require_patient(alert.patient_id)?;

        let id = t.alerts.next_id();
        let created = alert.into_alert(id, Utc::now());
        t.alerts_by_patient.insert(created.patient_id, id);
        t.alerts.rows.insert(id, created.clone());
        Ok(created)
    }

    fn mark_device_alert_read(&self, id: i64) -> Result<DeviceAlert, DatabaseError> {
        let mut t = self.write()?;
        let alert = t
            .alerts
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("device alert", id))?;
        alert.mark_read();
        Ok(alert.clone())
    }

    fn resolve_device_alert(&self, id: i64, notes: String) -> Result<DeviceAlert, DatabaseError> {
        let mut t = self.write()?;
        let alert = t
            .alerts
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("device alert", id))?;
        alert.resolve(notes, Utc::now())?;
        Ok(alert.clone())
    }
}

// ── Updates ─────────────────────────────────────────────────

impl UpdateRepository for MemoryStore {
    fn list_patient_updates(&self, patient_id: i64) -> Result<Vec<Update>, DatabaseError> {
        let t = self.read()?;
        let mut updates = t.updates.select(t.updates_by_patient.ids(patient_id));
        updates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(updates)
    }

    fn create_update(&self, update: InsertUpdate) -> Result<Update, DatabaseError> {
        update.validate()?;
        let mut t = self.write()?;
        t.require_patient(update.patient_id)?;
        Ok(t.insert_update(update, Utc::now()))
    }
}

// ── Messages ────────────────────────────────────────────────

impl MessageRepository for MemoryStore {
    fn get_message(&self, id: i64) -> Result<Option<Message>, DatabaseError> {
        Ok(self.read()?.messages.get(id))
    }

    fn list_user_messages(&self, user_id: i64) -> Result<Vec<Message>, DatabaseError> {
        let t = self.read()?;
        let mut messages = t.messages.select(t.messages_by_user.ids(user_id));
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(messages)
    }

    fn list_conversation(&self, a: i64, b: i64) -> Result<Vec<Message>, DatabaseError> {
        let t = self.read()?;
        let mut messages: Vec<Message> = t
            .messages
            .select(t.messages_by_user.ids(a))
            .into_iter()
            .filter(|m| m.between(a, b))
            .collect();
        messages.sort_by(|x, y| x.timestamp.cmp(&y.timestamp).then(x.id.cmp(&y.id)));
        Ok(messages)
    }

    fn create_message(&self, message: InsertMessage) -> Result<Message, DatabaseError> {
        message.validate()?;
        let mut t = self.write()?;
        t.require_user(message.sender_id)?;
        t.require_user(message.receiver_id)?;

        let id = t.messages.next_id();
        let created = message.into_message(id, Utc::now());
        t.messages_by_user.insert(created.sender_id, id);
        t.messages_by_user.insert(created.receiver_id, id);
        t.messages.rows.insert(id, created.clone());
        Ok(created)
    }

    fn mark_message_read(&self, id: i64) -> Result<Message, DatabaseError> {
        let mut t = self.write()?;
        let message = t
            .messages
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("message", id))?;
        message.is_read = true;
        Ok(message.clone())
    }
}

// ── Support requests ────────────────────────────────────────

impl SupportRequestRepository for MemoryStore {
    fn get_support_request(&self, id: i64) -> Result<Option<SupportRequest>, DatabaseError> {
        Ok(self.read()?.support.get(id))
    }

    fn list_patient_support_requests(
        &self,
        patient_id: i64,
    ) -> Result<Vec<SupportRequest>, DatabaseError> {
        let t = self.read()?;
        let mut requests = t.support.select(t.support_by_patient.ids(patient_id));
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    fn create_support_request(
        &self,
        request: InsertSupportRequest,
    ) -> Result<SupportRequest, DatabaseError> {
        request.validate()?;
        let mut t = self.write()?;
        t.require_patient(request.patient_id)?;

        let id = t.support.next_id();
        let created = request.into_request(id, Utc::now());
        t.support_by_patient.insert(created.patient_id, id);
        t.support.rows.insert(id, created.clone());
        Ok(created)
    }

    fn update_support_request_status(
        &self,
        id: i64,
        status: SupportStatus,
    ) -> Result<SupportRequest, DatabaseError> {
        let mut t = self.write()?;
        let request = t
            .support
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("support request", id))?;
        request.status = status;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    fn assign_support_request(
        &self,
        id: i64,
        staff_id: i64,
    ) -> Result<SupportRequest, DatabaseError> {
        let mut t = self.write()?;
        t.require_staff(staff_id)?;
        let request = t
            .support
            .rows
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("support request", id))?;
        request.assigned_to = Some(staff_id);
        if request.status == SupportStatus::Open {
            request.status = SupportStatus::InProgress;
        }
        request.updated_at = Utc::now();
        Ok(request.clone())
    }
}
