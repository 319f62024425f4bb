//! Device alert endpoints.
//!
//! - `GET /api/device-alerts/patient/:id`: all, newest first
//! - `GET /api/device-alerts/patient/:id/unread`
//! - `GET /api/device-alerts/patient/:id/unread-count`
//! - `POST /api/device-alerts`: raise an alert
//! - `PATCH /api/device-alerts/:id/read`
//! - `PATCH /api/device-alerts/:id/resolve`: terminal, a second resolve is a 409
//!
//! Unread views are recomputed from the alert list on every request.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, AuthUser};
use crate::db::{DeviceAlertRepository, Storage};
use crate::models::{DeviceAlert, InsertDeviceAlert};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub patient_id: i64,
    pub unread_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(default, alias = "notes")]
    pub resolution_notes: String,
}

fn accessible_alert(
    storage: &dyn Storage,
    auth: &AuthUser,
    id: i64,
) -> Result<DeviceAlert, ApiError> {
    let alert = storage
        .get_device_alert(id)?
        .ok_or_else(|| ApiError::NotFound("Device alert not found".into()))?;
    auth.ensure_patient_access(storage, alert.patient_id)?;
    Ok(alert)
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Vec<DeviceAlert>>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    Ok(Json(ctx.storage().list_patient_device_alerts(patient_id)?))
}

pub async fn unread(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Vec<DeviceAlert>>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    Ok(Json(
        ctx.storage().list_unread_patient_device_alerts(patient_id)?,
    ))
}

pub async fn unread_count(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    let unread_count = ctx
        .storage()
        .list_unread_patient_device_alerts(patient_id)?
        .len();
    Ok(Json(UnreadCountResponse {
        patient_id,
        unread_count,
    }))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(insert): ApiJson<InsertDeviceAlert>,
) -> Result<(StatusCode, Json<DeviceAlert>), ApiError> {
    auth.ensure_patient_access(ctx.storage(), insert.patient_id)?;
    let alert = ctx.storage().create_device_alert(insert)?;
    tracing::info!(
        alert_id = alert.id,
        patient_id = alert.patient_id,
        severity = %alert.severity,
        "Device alert raised"
    );
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeviceAlert>, ApiError> {
    accessible_alert(ctx.storage(), &auth, id)?;
    Ok(Json(ctx.storage().mark_device_alert_read(id)?))
}

pub async fn resolve(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ResolveRequest>,
) -> Result<Json<DeviceAlert>, ApiError> {
    accessible_alert(ctx.storage(), &auth, id)?;
    let alert = ctx
        .storage()
        .resolve_device_alert(id, req.resolution_notes)?;
    tracing::info!(alert_id = id, user_id = auth.id(), "Device alert resolved");
    Ok(Json(alert))
}
