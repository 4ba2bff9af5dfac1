//! Elapsed-time signals for a client record (pure math, no store).

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::ClientRecord;

/// Whole days between `earlier` and `now`, floored.
///
/// Instants after `now` yield 0 rather than a negative count.
pub fn whole_days_since(earlier: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - earlier).num_days().max(0)
}

/// The instant `days` whole days before `now`, or `None` when it falls
/// outside the representable range.
pub fn days_before(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(days).and_then(|delta| now.checked_sub_signed(delta))
}

/// Time-derived inputs to scoring and follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedSignals {
    pub days_since_last_interaction: i64,
    pub days_as_client: i64,
}

impl ElapsedSignals {
    pub fn extract(record: &ClientRecord, now: DateTime<Utc>) -> Self {
        Self {
            days_since_last_interaction: whole_days_since(record.last_interaction_at, now),
            days_as_client: whole_days_since(record.created_at, now),
        }
    }
}
