//! Prescription endpoints.
//!
//! - `GET /api/prescriptions/patient/:id`: all, newest start first
//! - `GET /api/prescriptions/patient/:id/active`
//! - `POST /api/prescriptions`: doctor only
//! - `PATCH /api/prescriptions/:id`: doctor only
//! - `POST /api/prescriptions/:id/refill`: patient only, own prescriptions

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, AuthUser};
use crate::db::{PrescriptionRepository, RefillOutcome};
use crate::models::{InsertPrescription, Prescription, PrescriptionPatch};

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    Ok(Json(ctx.storage().list_patient_prescriptions(patient_id)?))
}

pub async fn active(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    Ok(Json(
        ctx.storage()
            .list_active_patient_prescriptions(patient_id, Utc::now())?,
    ))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(insert): ApiJson<InsertPrescription>,
) -> Result<(StatusCode, Json<Prescription>), ApiError> {
    let prescription = ctx.storage().create_prescription(insert)?;
    tracing::info!(
        prescription_id = prescription.id,
        patient_id = prescription.patient_id,
        prescribed_by = auth.id(),
        "Prescription created"
    );
    Ok((StatusCode::CREATED, Json(prescription)))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<PrescriptionPatch>,
) -> Result<Json<Prescription>, ApiError> {
    Ok(Json(ctx.storage().update_prescription(id, patch)?))
}

/// `POST /api/prescriptions/:id/refill`: records the request as a note
/// and a `prescription_change` update. The refill counter is untouched.
pub async fn refill(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<RefillOutcome>, ApiError> {
    let prescription = ctx
        .storage()
        .get_prescription(id)?
        .ok_or_else(|| ApiError::NotFound("Prescription not found".into()))?;
    auth.ensure_patient_access(ctx.storage(), prescription.patient_id)?;

    let outcome = ctx
        .storage()
        .request_refill(id, &auth.user.full_name())?;
    tracing::info!(prescription_id = id, user_id = auth.id(), "Refill requested");
    Ok(Json(outcome))
}
