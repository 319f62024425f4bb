use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patch::{apply, blank_as_null};
use crate::db::DatabaseError;

/// Timestamped snapshot of prosthesis and limb health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetric {
    pub id: i64,
    pub patient_id: i64,
    pub record_date: DateTime<Utc>,
    /// 0–100
    pub mobility_score: i32,
    /// 0–10
    pub phantom_pain_score: i32,
    /// Percentage.
    pub sensor_sensitivity: i32,
    pub step_count: i32,
    /// Percentage.
    pub gait_stability: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertHealthMetric {
    pub patient_id: i64,
    /// Defaults to the time of insertion.
    pub record_date: Option<DateTime<Utc>>,
    pub mobility_score: i32,
    pub phantom_pain_score: i32,
    pub sensor_sensitivity: i32,
    pub step_count: i32,
    pub gait_stability: i32,
    pub notes: Option<String>,
}

fn check_range(field: &str, value: i32, min: i32, max: i32) -> Result<(), DatabaseError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(DatabaseError::ConstraintViolation(format!(
            "{field} must be between {min} and {max}, got {value}"
        )))
    }
}

fn check_scores(
    mobility: i32,
    pain: i32,
    sensitivity: i32,
    steps: i32,
    gait: i32,
) -> Result<(), DatabaseError> {
    check_range("mobilityScore", mobility, 0, 100)?;
    check_range("phantomPainScore", pain, 0, 10)?;
    check_range("sensorSensitivity", sensitivity, 0, 100)?;
    check_range("stepCount", steps, 0, i32::MAX)?;
    check_range("gaitStability", gait, 0, 100)
}

impl InsertHealthMetric {
    pub fn validate(&self) -> Result<(), DatabaseError> {
        check_scores(
            self.mobility_score,
            self.phantom_pain_score,
            self.sensor_sensitivity,
            self.step_count,
            self.gait_stability,
        )
    }

    pub fn into_metric(self, id: i64, now: DateTime<Utc>) -> HealthMetric {
        HealthMetric {
            id,
            patient_id: self.patient_id,
            record_date: self.record_date.unwrap_or(now),
            mobility_score: self.mobility_score,
            phantom_pain_score: self.phantom_pain_score,
            sensor_sensitivity: self.sensor_sensitivity,
            step_count: self.step_count,
            gait_stability: self.gait_stability,
            notes: self.notes,
        }
    }
}

/// Correction of a recorded metric. Storage-level only; the HTTP
/// surface treats metrics as immutable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetricPatch {
    pub mobility_score: Option<i32>,
    pub phantom_pain_score: Option<i32>,
    pub sensor_sensitivity: Option<i32>,
    pub step_count: Option<i32>,
    pub gait_stability: Option<i32>,
    #[serde(default, deserialize_with = "blank_as_null")]
    pub notes: Option<Option<String>>,
}

impl HealthMetricPatch {
    pub fn apply_to(self, metric: &mut HealthMetric) -> Result<(), DatabaseError> {
        check_scores(
            self.mobility_score.unwrap_or(metric.mobility_score),
            self.phantom_pain_score.unwrap_or(metric.phantom_pain_score),
            self.sensor_sensitivity.unwrap_or(metric.sensor_sensitivity),
            self.step_count.unwrap_or(metric.step_count),
            self.gait_stability.unwrap_or(metric.gait_stability),
        )?;
        apply(&mut metric.mobility_score, self.mobility_score);
        apply(&mut metric.phantom_pain_score, self.phantom_pain_score);
        apply(&mut metric.sensor_sensitivity, self.sensor_sensitivity);
        apply(&mut metric.step_count, self.step_count);
        apply(&mut metric.gait_stability, self.gait_stability);
        apply(&mut metric.notes, self.notes);
        Ok(())
    }
}

/// Dashboard headline: latest reading and change since the one before.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetricSummary {
    pub latest: HealthMetric,
    pub previous: Option<HealthMetric>,
    pub mobility_change: Option<i32>,
    pub phantom_pain_change: Option<i32>,
    pub gait_stability_change: Option<i32>,
    pub record_count: usize,
}

impl HealthMetricSummary {
    /// `metrics` must be sorted newest first. Returns `None` when empty.
    pub fn from_sorted(metrics: &[HealthMetric]) -> Option<Self> {
        let latest = metrics.first()?.clone();
        let previous = metrics.get(1).cloned();
        let delta = |f: fn(&HealthMetric) -> i32| previous.as_ref().map(|p| f(&latest) - f(p));
        Some(Self {
            mobility_change: delta(|m| m.mobility_score),
            phantom_pain_change: delta(|m| m.phantom_pain_score),
            gait_stability_change: delta(|m| m.gait_stability),
            latest,
            previous,
            record_count: metrics.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn insert(mobility: i32, pain: i32) -> InsertHealthMetric {
        InsertHealthMetric {
            patient_id: 1,
            record_date: None,
            mobility_score: mobility,
            phantom_pain_score: pain,
            sensor_sensitivity: 80,
            step_count: 4200,
            gait_stability: 75,
            notes: None,
        }
    }

    #[test]
    fn out_of_range_scores_rejected() {
        assert!(insert(101, 3).validate().is_err());
        assert!(insert(50, 11).validate().is_err());
        assert!(insert(-1, 0).validate().is_err());
        assert!(insert(100, 10).validate().is_ok());
    }

    #[test]
    fn missing_record_date_uses_now() {
        let now = Utc::now();
        let metric = insert(60, 2).into_metric(3, now);
        assert_eq!(metric.record_date, now);
        assert_eq!(metric.id, 3);
    }

    #[test]
    fn summary_reports_change_since_previous() {
        let now = Utc::now();
        let newer = insert(72, 2).into_metric(2, now);
        let older = insert(65, 4).into_metric(1, now - Duration::days(7));
        let summary = HealthMetricSummary::from_sorted(&[newer, older]).unwrap();
        assert_eq!(summary.mobility_change, Some(7));
        assert_eq!(summary.phantom_pain_change, Some(-2));
        assert_eq!(summary.record_count, 2);
    }

    #[test]
    fn summary_of_nothing_is_none() {
        assert!(HealthMetricSummary::from_sorted(&[]).is_none());
    }

    #[test]
    fn patch_validates_merged_values() {
        let mut metric = insert(60, 2).into_metric(1, Utc::now());
        let bad = HealthMetricPatch { phantom_pain_score: Some(12), ..Default::default() };
        assert!(bad.apply_to(&mut metric).is_err());
        assert_eq!(metric.phantom_pain_score, 2);
    }
}
