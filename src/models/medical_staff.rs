use serde::{Deserialize, Serialize};

use super::user::User;

/// Clinical profile attached to a doctor account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalStaff {
    pub id: i64,
    pub user_id: i64,
    pub specialty: String,
    pub title: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertMedicalStaff {
    pub user_id: i64,
    pub specialty: String,
    pub title: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

/// Staff record joined with its account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffWithUser {
    #[serde(flatten)]
    pub staff: MedicalStaff,
    pub user: User,
}
