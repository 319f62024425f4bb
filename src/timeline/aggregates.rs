use crate::db::{DatabaseError, Storage};

use super::fetch::*;
use super::types::*;

/// Concatenate all sources in collection order, then stable-sort newest
/// first. Ties keep collection order, then the order within a collection.
pub fn merge_timeline(sources: &TimelineSources) -> Vec<TimelineItem> {
    let mut events: Vec<TimelineItem> = Vec::with_capacity(
        sources.health_metrics.len()
            + sources.updates.len()
            + sources.appointments.len()
            + sources.prescriptions.len()
            + sources.device_alerts.len(),
    );

    events.extend(sources.health_metrics.iter().map(metric_item));
    events.extend(sources.updates.iter().map(update_item));
    events.extend(sources.appointments.iter().map(appointment_item));
    events.extend(sources.prescriptions.iter().map(prescription_item));
    events.extend(sources.device_alerts.iter().map(alert_item));

    // `sort_by` is stable
    events.sort_by(|a, b| b.date.cmp(&a.date));
    events
}

/// Type filter then limit, both after the merge.
pub fn apply_filter(mut events: Vec<TimelineItem>, filter: &TimelineFilter) -> Vec<TimelineItem> {
    if let Some(ref types) = filter.event_types {
        events.retain(|e| types.contains(&e.event_type));
    }
    if let Some(limit) = filter.limit {
        events.truncate(limit);
    }
    events
}

/// Unfiltered totals per source collection.
pub fn compute_event_counts(sources: &TimelineSources) -> EventCounts {
    let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    EventCounts {
        health_metrics: count(sources.health_metrics.len()),
        updates: count(sources.updates.len()),
        appointments: count(sources.appointments.len()),
        prescriptions: count(sources.prescriptions.len()),
        device_alerts: count(sources.device_alerts.len()),
    }
}

/// Builds the response from already-fetched sources.
pub fn build_timeline(sources: &TimelineSources, filter: &TimelineFilter) -> TimelineData {
    let events = apply_filter(merge_timeline(sources), filter);

    // Newest first, so the range runs last → first.
    let date_range = DateRange {
        earliest: events.last().map(|e| e.date),
        latest: events.first().map(|e| e.date),
    };

    TimelineData {
        events,
        date_range,
        event_counts: compute_event_counts(sources),
    }
}

/// Top-level assembly: assembles all timeline data in a single call.
pub fn get_timeline_data(
    storage: &dyn Storage,
    patient_id: i64,
    filter: &TimelineFilter,
) -> Result<TimelineData, DatabaseError> {
    let sources = TimelineSources::fetch(storage, patient_id)?;
    Ok(build_timeline(&sources, filter))
}
