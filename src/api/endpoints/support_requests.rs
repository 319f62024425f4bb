//! Support ticket endpoints.
//!
//! - `GET /api/support-requests/patient/:id`
//! - `POST /api/support-requests`
//! - `PATCH /api/support-requests/:id/status`: doctor only
//! - `PATCH /api/support-requests/:id/assign`: doctor only

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, AuthUser};
use crate::db::SupportRequestRepository;
use crate::models::{InsertSupportRequest, SupportRequest, SupportStatus};

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: SupportStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub staff_id: i64,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Vec<SupportRequest>>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    Ok(Json(
        ctx.storage().list_patient_support_requests(patient_id)?,
    ))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(insert): ApiJson<InsertSupportRequest>,
) -> Result<(StatusCode, Json<SupportRequest>), ApiError> {
    auth.ensure_patient_access(ctx.storage(), insert.patient_id)?;
    let request = ctx.storage().create_support_request(insert)?;
    tracing::info!(
        request_id = request.id,
        patient_id = request.patient_id,
        priority = %request.priority,
        "Support request opened"
    );
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn update_status(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<SupportRequest>, ApiError> {
    Ok(Json(
        ctx.storage().update_support_request_status(id, req.status)?,
    ))
}

pub async fn assign(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<AssignRequest>,
) -> Result<Json<SupportRequest>, ApiError> {
    Ok(Json(
        ctx.storage().assign_support_request(id, req.staff_id)?,
    ))
}
