//! Health metric endpoints.
//!
//! - `GET /api/health-metrics/patient/:id`: newest first
//! - `GET /api/health-metrics/patient/:id/latest`
//! - `GET /api/health-metrics/patient/:id/summary`: latest plus change since previous
//! - `POST /api/health-metrics`: record a reading

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, AuthUser};
use crate::db::HealthMetricRepository;
use crate::models::{HealthMetric, HealthMetricSummary, InsertHealthMetric};

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Vec<HealthMetric>>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    Ok(Json(ctx.storage().list_patient_health_metrics(patient_id)?))
}

pub async fn latest(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<HealthMetric>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    let metric = ctx
        .storage()
        .get_latest_patient_health_metric(patient_id)?
        .ok_or_else(|| ApiError::NotFound("No health metrics recorded".into()))?;
    Ok(Json(metric))
}

pub async fn summary(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<HealthMetricSummary>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    let metrics = ctx.storage().list_patient_health_metrics(patient_id)?;
    let summary = HealthMetricSummary::from_sorted(&metrics)
        .ok_or_else(|| ApiError::NotFound("No health metrics recorded".into()))?;
    Ok(Json(summary))
}

/// Scores outside their ranges are a 400.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(insert): ApiJson<InsertHealthMetric>,
) -> Result<(StatusCode, Json<HealthMetric>), ApiError> {
    auth.ensure_patient_access(ctx.storage(), insert.patient_id)?;
    let metric = ctx.storage().create_health_metric(insert)?;
    Ok((StatusCode::CREATED, Json(metric)))
}
