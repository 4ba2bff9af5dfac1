//! Read-only analysis of a single client for the assistant view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::signals::elapsed::whole_days_since;
use crate::signals::scoring::{score_client, ScoringResult};
use crate::types::{ClientRecord, Priority};

const VERY_LOW_ACTIVITY_DAYS: i64 = 90;
const MODERATE_ACTIVITY_DAYS: i64 = 30;
const FEW_INTERACTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAnalysis {
    pub client_id: String,
    pub analysis: String,
    pub priority: Priority,
    pub suggestion: String,
    pub days_since_last_interaction: i64,
    pub total_interactions: usize,
    pub scoring: ScoringResult,
}

pub fn analyze_client(record: &ClientRecord, now: DateTime<Utc>) -> ClientAnalysis {
    let days_since = whole_days_since(record.last_interaction_at, now);

    let (mut analysis, priority, mut suggestion) = if days_since > VERY_LOW_ACTIVITY_DAYS {
        (
            "Very low activity".to_string(),
            Priority::High,
            "No contact for more than 3 months. Mark as high priority and reach out immediately."
                .to_string(),
        )
    } else if days_since > MODERATE_ACTIVITY_DAYS {
        (
            "Moderate activity".to_string(),
            Priority::Medium,
            "No contact for more than a month. Consider scheduling a follow-up call.".to_string(),
        )
    } else {
        (
            "Active client".to_string(),
            Priority::Low,
            "Good recent activity. Keep up regular contact.".to_string(),
        )
    };

    if record.interactions.len() < FEW_INTERACTIONS {
        analysis.push_str(" - few recorded interactions");
        suggestion
            .push_str(" Consider increasing contact frequency to strengthen the relationship.");
    }

    ClientAnalysis {
        client_id: record.id.clone(),
        analysis,
        priority,
        suggestion,
        days_since_last_interaction: days_since,
        total_interactions: record.interactions.len(),
        scoring: score_client(record, now),
    }
}

/// Look a client up by id and analyze it.
pub fn analyze_client_by_id(
    records: &[ClientRecord],
    client_id: &str,
    now: DateTime<Utc>,
) -> Result<ClientAnalysis, EngineError> {
    records
        .iter()
        .find(|r| r.id == client_id)
        .map(|record| analyze_client(record, now))
        .ok_or_else(|| EngineError::NotFound(client_id.to_string()))
}
