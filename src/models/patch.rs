//! Serde helpers for partial-update bodies.
//!
//! Patch fields are `Option<Option<T>>`: `None` leaves the stored value
//! alone, `Some(None)` clears it, `Some(Some(v))` sets it. Blank strings
//! clear, so a form that submits `"phone": ""` stores `null`.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Present-but-null becomes `Some(None)` instead of collapsing to `None`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn blank_as_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(Some(value.filter(|s| !s.trim().is_empty())))
}

/// Accepts `YYYY-MM-DD` or a longer ISO timestamp (date part is kept).
pub fn blank_date_as_null<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(Some(None)),
        Some(s) => parse_date(s)
            .map(|d| Some(Some(d)))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {s}"))),
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Apply one patch field to its stored counterpart.
pub fn apply<T>(target: &mut T, patch: Option<T>) {
    if let Some(value) = patch {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "blank_as_null")]
        phone: Option<Option<String>>,
        #[serde(default, deserialize_with = "blank_date_as_null")]
        born: Option<Option<NaiveDate>>,
    }

    #[test]
    fn absent_field_is_untouched() {
        let p: Probe = serde_json::from_str("{}").unwrap();
        assert!(p.phone.is_none());
        assert!(p.born.is_none());
    }

    #[test]
    fn empty_string_clears() {
        let p: Probe = serde_json::from_str(r#"{"phone":"","born":""}"#).unwrap();
        assert_eq!(p.phone, Some(None));
        assert_eq!(p.born, Some(None));
    }

    #[test]
    fn explicit_null_clears() {
        let p: Probe = serde_json::from_str(r#"{"phone":null}"#).unwrap();
        assert_eq!(p.phone, Some(None));
    }

    #[test]
    fn iso_timestamp_keeps_date_part() {
        let p: Probe = serde_json::from_str(r#"{"born":"1984-03-09T00:00:00.000Z"}"#).unwrap();
        assert_eq!(p.born, Some(NaiveDate::from_ymd_opt(1984, 3, 9)));
    }

    #[test]
    fn garbage_date_is_rejected() {
        assert!(serde_json::from_str::<Probe>(r#"{"born":"yesterday"}"#).is_err());
    }

    #[test]
    fn apply_only_overwrites_present_values() {
        let mut stored = Some("555-0100".to_string());
        apply(&mut stored, None);
        assert_eq!(stored.as_deref(), Some("555-0100"));
        apply(&mut stored, Some(None));
        assert!(stored.is_none());
    }
}
