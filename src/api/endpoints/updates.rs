//! Activity feed endpoints (append-only).
//!
//! - `GET /api/updates/patient/:id`: newest first
//! - `POST /api/updates`

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, AuthUser};
use crate::db::UpdateRepository;
use crate::models::{InsertUpdate, Update};

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Vec<Update>>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    Ok(Json(ctx.storage().list_patient_updates(patient_id)?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(insert): ApiJson<InsertUpdate>,
) -> Result<(StatusCode, Json<Update>), ApiError> {
    auth.ensure_patient_access(ctx.storage(), insert.patient_id)?;
    let update = ctx.storage().create_update(insert)?;
    Ok((StatusCode::CREATED, Json(update)))
}
