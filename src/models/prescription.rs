use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patch::{apply, blank_as_null, nullable};
use crate::db::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    /// Medical staff id of the prescriber.
    pub doctor_id: i64,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub refills_remaining: i32,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl Prescription {
    /// Active = flagged active and not past its end date.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date.map_or(true, |end| end >= now)
    }

    /// Append a line to the free-text notes.
    pub fn append_note(&mut self, line: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line.to_string(),
        });
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertPrescription {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refills_remaining: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub notes: Option<String>,
}

impl InsertPrescription {
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.medication_name.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("medicationName is required".into()));
        }
        if self.refills_remaining < 0 {
            return Err(DatabaseError::ConstraintViolation(
                "refillsRemaining cannot be negative".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(DatabaseError::ConstraintViolation(
                    "endDate precedes startDate".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn into_prescription(self, id: i64, now: DateTime<Utc>) -> Prescription {
        Prescription {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            medication_name: self.medication_name,
            dosage: self.dosage,
            frequency: self.frequency,
            instructions: self.instructions,
            start_date: self.start_date.unwrap_or(now),
            end_date: self.end_date,
            refills_remaining: self.refills_remaining,
            is_active: self.is_active,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionPatch {
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub instructions: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub refills_remaining: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub notes: Option<Option<String>>,
}

impl PrescriptionPatch {
    pub fn apply_to(self, prescription: &mut Prescription) -> Result<(), DatabaseError> {
        if matches!(self.refills_remaining, Some(r) if r < 0) {
            return Err(DatabaseError::ConstraintViolation(
                "refillsRemaining cannot be negative".into(),
            ));
        }
        apply(&mut prescription.medication_name, self.medication_name);
        apply(&mut prescription.dosage, self.dosage);
        apply(&mut prescription.frequency, self.frequency);
        apply(&mut prescription.instructions, self.instructions);
        apply(&mut prescription.end_date, self.end_date);
        apply(&mut prescription.refills_remaining, self.refills_remaining);
        apply(&mut prescription.is_active, self.is_active);
        apply(&mut prescription.notes, self.notes);
        Ok(())
    }
}
