//! `GET /api/medical-staff`: care team directory.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::MedicalStaffRepository;
use crate::models::StaffWithUser;

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<StaffWithUser>>, ApiError> {
    Ok(Json(ctx.storage().list_medical_staff()?))
}
