//! List helpers for client views: search, status filter, sort, relative dates.

use chrono::{DateTime, Utc};

use crate::types::{ClientRecord, ClientStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Name ascending
    Name,
    /// Most recent interaction first
    LastInteraction,
    /// Newest client first
    CreatedAt,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "lastInteraction" | "last_interaction" => Ok(SortKey::LastInteraction),
            "createdAt" | "created_at" => Ok(SortKey::CreatedAt),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

/// Case-insensitive name match or phone substring, optionally narrowed by status.
pub fn filter_clients<'a>(
    records: &'a [ClientRecord],
    search: &str,
    status: Option<ClientStatus>,
) -> Vec<&'a ClientRecord> {
    let needle = search.to_lowercase();
    records
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle) || r.phone.contains(search))
        .filter(|r| status.map_or(true, |s| r.status == s))
        .collect()
}

/// Stable sort of a copy of `records`.
pub fn sort_clients(records: &[ClientRecord], key: SortKey) -> Vec<ClientRecord> {
    let mut sorted = records.to_vec();
    match key {
        SortKey::Name => sorted.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        SortKey::LastInteraction => {
            sorted.sort_by(|a, b| b.last_interaction_at.cmp(&a.last_interaction_at))
        }
        SortKey::CreatedAt => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    sorted
}

/// Coarse "how long ago" label.
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - then).num_days().abs();
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=7 => format!("{} days ago", days),
        8..=30 => format!("{} weeks ago", days / 7),
        31..=365 => format!("{} months ago", days / 30),
        _ => format!("{} years ago", days / 365),
    }
}
