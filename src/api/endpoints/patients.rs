//! Patient record endpoints.
//!
//! - `GET /api/patients`: doctor only, every patient
//! - `GET /api/patients/:id`: one record
//! - `PATCH /api/patients/:id`: partial update, blank strings clear a field
//! - `GET /api/patients/download-data?patientId=`: CSV of one patient's
//!   records; patients default to their own, doctors must name one

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::db::{PatientRepository, Storage};
use crate::export::{render_patient_csv, PatientRecordSet};
use crate::models::{Patient, PatientPatch};

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(ctx.storage().list_patients()?))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Patient>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    let patient = ctx
        .storage()
        .get_patient(patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;
    Ok(Json(patient))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<PatientPatch>,
) -> Result<Json<Patient>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    let patient = ctx.storage().update_patient(patient_id, patch)?;
    tracing::info!(patient_id, user_id = auth.id(), "Patient record updated");
    Ok(Json(patient))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub patient_id: Option<i64>,
}

/// Patient whose records an export covers.
fn export_target(
    auth: &AuthUser,
    storage: &dyn Storage,
    requested: Option<i64>,
) -> Result<i64, ApiError> {
    let patient_id = match requested {
        Some(id) => id,
        None if auth.is_doctor() => {
            return Err(ApiError::BadRequest("patientId is required".into()))
        }
        None => auth.own_patient(storage)?.id,
    };
    auth.ensure_patient_access(storage, patient_id)?;
    Ok(patient_id)
}

/// `GET /api/patients/download-data`: attachment with every section of
/// one patient's record.
pub async fn download_data(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<DownloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let patient_id = export_target(&auth, ctx.storage(), query.patient_id)?;
    let records = PatientRecordSet::fetch(ctx.storage(), patient_id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;

    let csv = render_patient_csv(&records);
    let disposition = format!("attachment; filename=\"{}\"", records.file_name());

    tracing::info!(patient_id, user_id = auth.id(), bytes = csv.len(), "Patient data exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
