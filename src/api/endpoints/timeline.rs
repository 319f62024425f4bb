//! Timeline endpoint.
//!
//! `GET /api/timeline/patient/:id?types=update,device_alert&limit=20`

use std::str::FromStr;

use axum::extract::State;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiPath, ApiQuery, AuthUser};
use crate::timeline::{self, EventType, TimelineFilter};

#[derive(Deserialize)]
pub struct TimelineQuery {
    /// Comma-separated event types.
    pub types: Option<String>,
    pub limit: Option<String>,
}

impl TimelineQuery {
    fn into_filter(self) -> Result<TimelineFilter, ApiError> {
        let event_types = match self.types.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(list) => Some(
                list.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(EventType::from_str)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                ApiError::BadRequest(format!("Invalid limit '{raw}' (expected a non-negative integer)"))
            })?),
        };

        Ok(TimelineFilter { event_types, limit })
    }
}

/// `GET /api/timeline/patient/:id`: merged activity, newest first.
pub async fn for_patient(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(patient_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<TimelineQuery>,
) -> Result<Json<timeline::TimelineData>, ApiError> {
    auth.ensure_patient_access(ctx.storage(), patient_id)?;
    let filter = query.into_filter()?;
    let data = timeline::get_timeline_data(ctx.storage(), patient_id, &filter)?;
    Ok(Json(data))
}
