use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::patch::{apply, blank_as_null, blank_date_as_null};

/// Patient profile. Owns metrics, appointments, prescriptions, alerts,
/// updates and support requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub user_id: i64,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub prosthesis_type: Option<String>,
    pub prosthesis_model: Option<String>,
    pub prosthesis_serial_number: Option<String>,
    pub amputation_type: Option<String>,
    pub amputation_date: Option<NaiveDate>,
    pub fitting_date: Option<NaiveDate>,
    pub last_calibration_date: Option<NaiveDate>,
    pub insurance_provider: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertPatient {
    pub user_id: i64,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub prosthesis_type: Option<String>,
    pub prosthesis_model: Option<String>,
    pub prosthesis_serial_number: Option<String>,
    pub amputation_type: Option<String>,
    pub amputation_date: Option<NaiveDate>,
    pub fitting_date: Option<NaiveDate>,
    pub last_calibration_date: Option<NaiveDate>,
    pub insurance_provider: Option<String>,
}

impl InsertPatient {
    pub fn into_patient(self, id: i64) -> Patient {
        Patient {
            id,
            user_id: self.user_id,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            phone: self.phone,
            address: self.address,
            emergency_contact: self.emergency_contact,
            prosthesis_type: self.prosthesis_type,
            prosthesis_model: self.prosthesis_model,
            prosthesis_serial_number: self.prosthesis_serial_number,
            amputation_type: self.amputation_type,
            amputation_date: self.amputation_date,
            fitting_date: self.fitting_date,
            last_calibration_date: self.last_calibration_date,
            insurance_provider: self.insurance_provider,
        }
    }
}

/// Partial patient update. Only these fields can change; `id` and
/// `userId` are fixed, and unknown keys are dropped at parse time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPatch {
    #[serde(default, deserialize_with = "blank_date_as_null")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub emergency_contact: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub prosthesis_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub prosthesis_model: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub prosthesis_serial_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub amputation_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_date_as_null")]
    pub amputation_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "blank_date_as_null")]
    pub fitting_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "blank_date_as_null")]
    pub last_calibration_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub insurance_provider: Option<Option<String>>,
}

impl PatientPatch {
    pub fn apply_to(self, patient: &mut Patient) {
        apply(&mut patient.date_of_birth, self.date_of_birth);
        apply(&mut patient.gender, self.gender);
        apply(&mut patient.phone, self.phone);
        apply(&mut patient.address, self.address);
        apply(&mut patient.emergency_contact, self.emergency_contact);
        apply(&mut patient.prosthesis_type, self.prosthesis_type);
        apply(&mut patient.prosthesis_model, self.prosthesis_model);
        apply(&mut patient.prosthesis_serial_number, self.prosthesis_serial_number);
        apply(&mut patient.amputation_type, self.amputation_type);
        apply(&mut patient.amputation_date, self.amputation_date);
        apply(&mut patient.fitting_date, self.fitting_date);
        apply(&mut patient.last_calibration_date, self.last_calibration_date);
        apply(&mut patient.insurance_provider, self.insurance_provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_coerces_empty_phone_to_null() {
        let mut patient = Patient {
            id: 1,
            user_id: 2,
            phone: Some("555-0199".into()),
            address: Some("12 Elm St".into()),
            ..Default::default()
        };
        let patch: PatientPatch = serde_json::from_str(r#"{"phone":""}"#).unwrap();
        patch.apply_to(&mut patient);
        assert!(patient.phone.is_none());
        assert_eq!(patient.address.as_deref(), Some("12 Elm St"));
    }

    #[test]
    fn patch_cannot_rewrite_identity() {
        let mut patient = Patient { id: 1, user_id: 2, ..Default::default() };
        let patch: PatientPatch =
            serde_json::from_str(r#"{"id":99,"userId":42,"gender":"female"}"#).unwrap();
        patch.apply_to(&mut patient);
        assert_eq!(patient.id, 1);
        assert_eq!(patient.user_id, 2);
        assert_eq!(patient.gender.as_deref(), Some("female"));
    }
}
