//! User account endpoints.
//!
//! - `GET /api/users/profile`: the session user plus their role record
//! - `PATCH /api/users/:id`: edit own name and email

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, AuthUser};
use crate::db::{MedicalStaffRepository, PatientRepository, UserRepository};
use crate::models::{MedicalStaff, Patient, User, UserPatch, UserRole};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_staff: Option<MedicalStaff>,
}

/// `GET /api/users/profile`: `{ user, patient }` or `{ user, medicalStaff }`.
pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let storage = ctx.storage();
    let (patient, medical_staff) = match auth.user.role {
        UserRole::Patient => (storage.get_patient_by_user_id(auth.id())?, None),
        UserRole::Doctor => (None, storage.get_medical_staff_by_user_id(auth.id())?),
    };

    if patient.is_none() && medical_staff.is_none() {
        return Err(ApiError::NotFound("Profile not found".into()));
    }

    Ok(Json(ProfileResponse {
        user: auth.user,
        patient,
        medical_staff,
    }))
}

/// `PATCH /api/users/:id`: only the account owner may edit it.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> Result<Json<User>, ApiError> {
    if user_id != auth.id() {
        return Err(ApiError::Forbidden("You can only edit your own account".into()));
    }
    if matches!(&patch.first_name, Some(n) if n.trim().is_empty())
        || matches!(&patch.last_name, Some(n) if n.trim().is_empty())
    {
        return Err(ApiError::BadRequest("Name cannot be empty".into()));
    }

    let user = ctx.storage().update_user(user_id, patch)?;
    Ok(Json(user))
}
