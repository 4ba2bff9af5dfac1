//! Rule-based client scoring.
//!
//! Four additive factors, evaluated in a fixed order:
//! - Interaction frequency (-10 / +15 / +30): count of logged interactions
//! - Recency (-20 / -5 / +10 / +25): days since last interaction
//! - Tenure (-5 / +5 / +15): days since the client was created
//! - Current status (-15 / +5 / +20)
//!
//! The total maps onto a recommended status with a confidence and a reason.
//! The factor list keeps the evaluation order; callers render it as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signals::elapsed::ElapsedSignals;
use crate::types::{ClientRecord, ClientStatus, Confidence};

const HIGH_FREQUENCY_MIN_INTERACTIONS: usize = 5;
const MODERATE_FREQUENCY_MIN_INTERACTIONS: usize = 2;

const VERY_RECENT_MAX_DAYS: i64 = 7;
const RECENT_MAX_DAYS: i64 = 30;
const MODERATELY_STALE_MAX_DAYS: i64 = 60;

const ESTABLISHED_MIN_DAYS: i64 = 90;
const DEVELOPING_MIN_DAYS: i64 = 30;

/// Score at or above which a client is recommended Active.
pub const ACTIVE_SCORE_MIN: i32 = 50;
/// Score at or above which a client is recommended Potential.
pub const POTENTIAL_SCORE_MIN: i32 = 20;
/// Inactive recommendations at or below this score are High confidence.
pub const CONFIDENT_INACTIVE_SCORE_MAX: i32 = -20;

/// One contribution to a client's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringFactor {
    pub label: String,
    pub points: i32,
}

impl ScoringFactor {
    fn new(label: &str, points: i32) -> Self {
        Self {
            label: label.to_string(),
            points,
        }
    }
}

impl std::fmt::Display for ScoringFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:+})", self.label, self.points)
    }
}

/// Scoring outcome for a single client. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub recommended_status: ClientStatus,
    pub confidence: Confidence,
    pub reason: String,
    pub factors: Vec<ScoringFactor>,
    pub score: i32,
}

/// Score a client as of `now`.
pub fn score_client(record: &ClientRecord, now: DateTime<Utc>) -> ScoringResult {
    score_with_signals(record, &ElapsedSignals::extract(record, now))
}

/// Score a client from already-extracted elapsed signals.
pub fn score_with_signals(record: &ClientRecord, signals: &ElapsedSignals) -> ScoringResult {
    let factors = vec![
        frequency_factor(record.interactions.len()),
        recency_factor(signals.days_since_last_interaction),
        tenure_factor(signals.days_as_client),
        status_factor(record.status),
    ];

    let score: i32 = factors.iter().map(|f| f.points).sum();
    let (recommended_status, confidence, reason) = recommend(score);

    ScoringResult {
        recommended_status,
        confidence,
        reason: reason.to_string(),
        factors,
        score,
    }
}

fn frequency_factor(interaction_count: usize) -> ScoringFactor {
    if interaction_count >= HIGH_FREQUENCY_MIN_INTERACTIONS {
        ScoringFactor::new("high interaction frequency", 30)
    } else if interaction_count >= MODERATE_FREQUENCY_MIN_INTERACTIONS {
        ScoringFactor::new("moderate interaction frequency", 15)
    } else {
        ScoringFactor::new("low interaction frequency", -10)
    }
}

fn recency_factor(days_since_last_interaction: i64) -> ScoringFactor {
    match days_since_last_interaction {
        d if d <= VERY_RECENT_MAX_DAYS => ScoringFactor::new("very recent interaction", 25),
        d if d <= RECENT_MAX_DAYS => ScoringFactor::new("recent interaction", 10),
        d if d <= MODERATELY_STALE_MAX_DAYS => {
            ScoringFactor::new("moderately stale interaction", -5)
        }
        _ => ScoringFactor::new("very stale interaction", -20),
    }
}

fn tenure_factor(days_as_client: i64) -> ScoringFactor {
    if days_as_client >= ESTABLISHED_MIN_DAYS {
        ScoringFactor::new("established client", 15)
    } else if days_as_client >= DEVELOPING_MIN_DAYS {
        ScoringFactor::new("developing client", 5)
    } else {
        ScoringFactor::new("new client", -5)
    }
}

fn status_factor(status: ClientStatus) -> ScoringFactor {
    match status {
        ClientStatus::Active => ScoringFactor::new("current status: Active", 20),
        ClientStatus::Potential => ScoringFactor::new("current status: Potential", 5),
        ClientStatus::Inactive => ScoringFactor::new("current status: Inactive", -15),
    }
}

fn recommend(score: i32) -> (ClientStatus, Confidence, &'static str) {
    if score >= ACTIVE_SCORE_MIN {
        (
            ClientStatus::Active,
            Confidence::High,
            "high activity and engagement",
        )
    } else if score >= POTENTIAL_SCORE_MIN {
        (
            ClientStatus::Potential,
            Confidence::Medium,
            "potential for development",
        )
    } else {
        let confidence = if score <= CONFIDENT_INACTIVE_SCORE_MAX {
            Confidence::High
        } else {
            Confidence::Medium
        };
        (ClientStatus::Inactive, confidence, "low activity shown")
    }
}
