//! Appointment endpoints.
//!
//! - `GET /api/appointments?when=upcoming|past`: session user's schedule
//! - `POST /api/appointments`: book
//! - `PATCH /api/appointments/:id`: reschedule, complete or cancel
//! - `DELETE /api/appointments/:id`
//!
//! Patients see their own appointments, doctors the ones booked with them.
//! Each item carries the doctor's user record and an `isPast` flag.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::db::{AppointmentRepository, MedicalStaffRepository, Storage};
use crate::models::{
    Appointment, AppointmentPatch, AppointmentWindow, AppointmentWithDoctor, InsertAppointment,
};

#[derive(Deserialize)]
pub struct AppointmentListQuery {
    pub when: Option<String>,
}

fn parse_window(when: Option<&str>) -> Result<Option<AppointmentWindow>, ApiError> {
    match when.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some("upcoming") => Ok(Some(AppointmentWindow::Upcoming)),
        Some("past") => Ok(Some(AppointmentWindow::Past)),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Invalid when filter '{other}' (expected upcoming or past)"
        ))),
    }
}

fn session_appointments(
    storage: &dyn Storage,
    auth: &AuthUser,
) -> Result<Vec<Appointment>, ApiError> {
    if auth.is_doctor() {
        match storage.get_medical_staff_by_user_id(auth.id())? {
            Some(staff) => Ok(storage.list_doctor_appointments(staff.id)?),
            None => Ok(Vec::new()),
        }
    } else {
        let patient = auth.own_patient(storage)?;
        Ok(storage.list_patient_appointments(patient.id)?)
    }
}

/// Load an appointment the caller may touch, or 404/403.
fn owned_appointment(
    storage: &dyn Storage,
    auth: &AuthUser,
    id: i64,
) -> Result<Appointment, ApiError> {
    let appointment = storage
        .get_appointment(id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".into()))?;
    auth.ensure_patient_access(storage, appointment.patient_id)?;
    Ok(appointment)
}

/// `GET /api/appointments`: soonest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<AppointmentListQuery>,
) -> Result<Json<Vec<AppointmentWithDoctor>>, ApiError> {
    let window = parse_window(query.when.as_deref())?;
    let now = Utc::now();

    let mut appointments = session_appointments(ctx.storage(), &auth)?;
    if let Some(window) = window {
        appointments.retain(|a| window.includes(a, now));
    }

    Ok(Json(ctx.storage().with_doctors(appointments, now)?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(insert): ApiJson<InsertAppointment>,
) -> Result<(StatusCode, Json<AppointmentWithDoctor>), ApiError> {
    auth.ensure_patient_access(ctx.storage(), insert.patient_id)?;

    let appointment = ctx.storage().create_appointment(insert)?;
    tracing::info!(
        appointment_id = appointment.id,
        patient_id = appointment.patient_id,
        "Appointment booked"
    );

    let created = ctx
        .storage()
        .get_appointment_with_doctor(appointment.id, Utc::now())?
        .ok_or_else(|| ApiError::Internal("appointment vanished after insert".into()))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<AppointmentPatch>,
) -> Result<Json<AppointmentWithDoctor>, ApiError> {
    owned_appointment(ctx.storage(), &auth, id)?;

    let appointment = ctx.storage().update_appointment(id, patch)?;
    let updated = ctx
        .storage()
        .with_doctors(vec![appointment], Utc::now())?
        .pop()
        .ok_or_else(|| ApiError::Internal("appointment join returned nothing".into()))?;
    Ok(Json(updated))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    owned_appointment(ctx.storage(), &auth, id)?;
    ctx.storage().delete_appointment(id)?;
    tracing::info!(appointment_id = id, user_id = auth.id(), "Appointment deleted");
    Ok(StatusCode::NO_CONTENT)
}
