//! Patient activity timeline.
//!
//! Projects a patient's health metrics, updates, appointments,
//! prescriptions and device alerts into one `Vec<TimelineItem>`, newest
//! first. Type filtering and the limit run after the merge, so counts and
//! ordering never depend on which types the caller asked for.

mod aggregates;
mod fetch;
mod types;

pub use aggregates::*;
pub use fetch::TimelineSources;
pub use types::*;

// ── Tests ──────────────────────────────────────────────────────────────────
