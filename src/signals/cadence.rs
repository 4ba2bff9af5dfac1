//! Follow-up cadence and reminder queue.
//!
//! Recommended contact frequency comes from the client's current status, not
//! from its score. Clients at or past their cadence are queued, most overdue
//! first, ties broken by priority.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::signals::elapsed::whole_days_since;
use crate::types::{ClientRecord, ClientStatus, Priority};

/// How often a client should be contacted, and how urgently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCadence {
    pub frequency_days: i64,
    pub priority: Priority,
}

impl ContactCadence {
    pub fn for_status(status: ClientStatus) -> Self {
        match status {
            ClientStatus::Active => Self {
                frequency_days: 14,
                priority: Priority::High,
            },
            ClientStatus::Potential => Self {
                frequency_days: 7,
                priority: Priority::High,
            },
            ClientStatus::Inactive => Self {
                frequency_days: 60,
                priority: Priority::Low,
            },
        }
    }
}

impl Default for ContactCadence {
    /// Cadence for a client whose status is not known.
    fn default() -> Self {
        Self {
            frequency_days: 30,
            priority: Priority::Medium,
        }
    }
}

/// Coarse best-time-to-contact bucket keyed on the evaluation hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactWindow {
    Morning,
    Afternoon,
    MidMorning,
    BusinessHours,
}

impl ContactWindow {
    /// Buckets are tested top-down and the first match wins, so hours 10-11
    /// land in `Morning` and `MidMorning` is only reachable at 12.
    pub fn for_hour(hour: u32) -> Self {
        if (9..=11).contains(&hour) {
            ContactWindow::Morning
        } else if (14..=16).contains(&hour) {
            ContactWindow::Afternoon
        } else if (10..=12).contains(&hour) {
            ContactWindow::MidMorning
        } else {
            ContactWindow::BusinessHours
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            ContactWindow::Morning => "Morning (9-11h): phone calls",
            ContactWindow::Afternoon => "Afternoon (14-16h): emails",
            ContactWindow::MidMorning => "Mid-morning (10-12h): follow-ups",
            ContactWindow::BusinessHours => "Business hours (9-18h)",
        }
    }
}

/// Follow-up status of one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEntry {
    pub client_id: String,
    pub client_name: String,
    pub recommended_frequency_days: i64,
    pub days_since_last_interaction: i64,
    pub needs_follow_up: bool,
    pub days_overdue: i64,
    pub priority: Priority,
    pub best_time_to_contact: String,
}

/// Sorted reminders for every client that is due.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpQueue {
    pub reminders: Vec<ReminderEntry>,
    pub total_needing_follow_up: usize,
}

/// Evaluate a single client's follow-up status.
pub fn reminder_for(
    record: &ClientRecord,
    now: DateTime<Utc>,
    window: ContactWindow,
) -> ReminderEntry {
    let cadence = ContactCadence::for_status(record.status);
    let days_since = whole_days_since(record.last_interaction_at, now);

    ReminderEntry {
        client_id: record.id.clone(),
        client_name: record.name.clone(),
        recommended_frequency_days: cadence.frequency_days,
        days_since_last_interaction: days_since,
        needs_follow_up: days_since >= cadence.frequency_days,
        days_overdue: (days_since - cadence.frequency_days).max(0),
        priority: cadence.priority,
        best_time_to_contact: window.hint().to_string(),
    }
}

/// Build the reminder queue, reading the contact hour from `now` in UTC.
pub fn build_follow_up_queue(records: &[ClientRecord], now: DateTime<Utc>) -> FollowUpQueue {
    build_queue(records, now, ContactWindow::for_hour(now.hour()))
}

/// Build the reminder queue, reading the contact hour in the given timezone.
pub fn build_follow_up_queue_in(
    records: &[ClientRecord],
    now: DateTime<Utc>,
    tz: &Tz,
) -> FollowUpQueue {
    let local_hour = tz.from_utc_datetime(&now.naive_utc()).hour();
    build_queue(records, now, ContactWindow::for_hour(local_hour))
}

fn build_queue(
    records: &[ClientRecord],
    now: DateTime<Utc>,
    window: ContactWindow,
) -> FollowUpQueue {
    let mut reminders: Vec<ReminderEntry> = records
        .iter()
        .map(|record| reminder_for(record, now, window))
        .filter(|entry| entry.needs_follow_up)
        .collect();

    // sort_by is stable: equal keys keep input order
    reminders.sort_by(|a, b| {
        b.days_overdue
            .cmp(&a.days_overdue)
            .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
    });

    FollowUpQueue {
        total_needing_follow_up: reminders.len(),
        reminders,
    }
}
