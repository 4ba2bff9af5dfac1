//! Portfolio-level aggregates: status counts, recency buckets and
//! recommendation text. Full scans over an in-memory snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ClientRecord, ClientStatus};

const ATTENTION_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub active: usize,
    pub inactive: usize,
    pub potential: usize,
}

impl StatusBreakdown {
    pub fn count(records: &[ClientRecord]) -> Self {
        records
            .iter()
            .fold(Self::default(), |mut acc, record| {
                match record.status {
                    ClientStatus::Active => acc.active += 1,
                    ClientStatus::Inactive => acc.inactive += 1,
                    ClientStatus::Potential => acc.potential += 1,
                }
                acc
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_clients: usize,
    pub active_clients: usize,
    pub inactive_clients: usize,
    pub potential_clients: usize,
    /// Stale for more than 30 days and not already Inactive.
    pub clients_needing_attention: usize,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReport {
    pub total_clients: usize,
    pub active_last_7_days: usize,
    pub active_last_30_days: usize,
    pub inactive_over_30_days: usize,
    pub inactive_over_60_days: usize,
    pub status_breakdown: StatusBreakdown,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub potential: usize,
    /// Any status, no interaction for more than 30 days.
    pub without_interaction_30_days: usize,
}

fn elapsed(record: &ClientRecord, now: DateTime<Utc>) -> Duration {
    now - record.last_interaction_at
}

pub fn summarize_portfolio(records: &[ClientRecord], now: DateTime<Utc>) -> PortfolioSummary {
    let breakdown = StatusBreakdown::count(records);
    let window = Duration::days(ATTENTION_WINDOW_DAYS);
    let needing_attention = records
        .iter()
        .filter(|r| r.status != ClientStatus::Inactive && elapsed(r, now) > window)
        .count();

    PortfolioSummary {
        total_clients: records.len(),
        active_clients: breakdown.active,
        inactive_clients: breakdown.inactive,
        potential_clients: breakdown.potential,
        clients_needing_attention: needing_attention,
        recommendations: recommendations(needing_attention, &breakdown),
    }
}

fn recommendations(needing_attention: usize, breakdown: &StatusBreakdown) -> Vec<String> {
    [
        if needing_attention > 0 {
            format!("{} clients need immediate attention", needing_attention)
        } else {
            "All clients are up to date".to_string()
        },
        if breakdown.inactive > 0 {
            format!(
                "Review {} inactive clients for reactivation",
                breakdown.inactive
            )
        } else {
            "No inactive clients".to_string()
        },
        if breakdown.potential > 0 {
            format!("Develop {} potential clients", breakdown.potential)
        } else {
            "No pending potential clients".to_string()
        },
    ]
    .into()
}

/// Recency buckets are independent: one client can count in several.
pub fn activity_report(records: &[ClientRecord], now: DateTime<Utc>) -> ActivityReport {
    let within = |days: i64| {
        records
            .iter()
            .filter(|r| elapsed(r, now) <= Duration::days(days))
            .count()
    };
    let beyond = |days: i64| {
        records
            .iter()
            .filter(|r| elapsed(r, now) > Duration::days(days))
            .count()
    };

    ActivityReport {
        total_clients: records.len(),
        active_last_7_days: within(7),
        active_last_30_days: within(30),
        inactive_over_30_days: beyond(30),
        inactive_over_60_days: beyond(60),
        status_breakdown: StatusBreakdown::count(records),
        generated_at: now,
    }
}

pub fn dashboard_stats(records: &[ClientRecord], now: DateTime<Utc>) -> DashboardStats {
    let breakdown = StatusBreakdown::count(records);
    DashboardStats {
        total: records.len(),
        active: breakdown.active,
        inactive: breakdown.inactive,
        potential: breakdown.potential,
        without_interaction_30_days: records
            .iter()
            .filter(|r| elapsed(r, now) > Duration::days(ATTENTION_WINDOW_DAYS))
            .count(),
    }
}
