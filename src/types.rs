use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Client records
// =============================================================================

/// Relationship status of a client. Always exactly one of the three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientStatus {
    Active,
    Inactive,
    Potential,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "Active",
            ClientStatus::Inactive => "Inactive",
            ClientStatus::Potential => "Potential",
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ClientStatus::Active),
            "inactive" => Ok(ClientStatus::Inactive),
            "potential" => Ok(ClientStatus::Potential),
            _ => Err(format!("Unknown client status: {}", s)),
        }
    }
}

/// Channel an interaction happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Call,
    Email,
    Meeting,
    Other,
}

impl std::str::FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call" => Ok(InteractionKind::Call),
            "email" => Ok(InteractionKind::Email),
            "meeting" => Ok(InteractionKind::Meeting),
            "other" => Ok(InteractionKind::Other),
            _ => Err(format!("Unknown interaction type: {}", s)),
        }
    }
}

/// A single logged contact with a client. Appended only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub date: DateTime<Utc>,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
}

/// Snapshot of a client as held by the record store.
///
/// `interactions` is kept in recording order, which is not necessarily
/// sorted by `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub status: ClientStatus,
    /// Most recent interaction, or creation time when none was logged.
    pub last_interaction_at: DateTime<Utc>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update sent to the record store. `None` fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClientStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions: Option<Vec<Interaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction_at: Option<DateTime<Utc>>,
}

impl ClientPatch {
    pub fn status(status: ClientStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

// =============================================================================
// Engine vocabulary
// =============================================================================

/// Follow-up priority. Ordering follows `rank()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: High=3, Medium=2, Low=1.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

/// How sure the scoring engine is about a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

// =============================================================================
// Configuration
// =============================================================================

/// Engine configuration, read from `~/.clientpulse/config.json`.
///
/// Every field has a default so an empty `{}` file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "ScheduleEntry::default_automation")]
    pub automation: ScheduleEntry,
    /// Days without interaction before the sweep marks a client Inactive.
    #[serde(default = "default_days_threshold")]
    pub days_threshold: i64,
    /// Interactions older than this are pruned by hygiene runs.
    #[serde(default = "default_retention_days")]
    pub interaction_retention_days: i64,
    /// Timezone used for the best-time-to-contact hint.
    #[serde(default = "default_contact_timezone")]
    pub contact_timezone: String,
}

pub const DEFAULT_DAYS_THRESHOLD: i64 = 30;
pub const MIN_DAYS_THRESHOLD: i64 = 1;
pub const MAX_DAYS_THRESHOLD: i64 = 365;
pub const DEFAULT_RETENTION_DAYS: i64 = 365;

fn default_days_threshold() -> i64 {
    DEFAULT_DAYS_THRESHOLD
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

fn default_contact_timezone() -> String {
    "UTC".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            automation: ScheduleEntry::default_automation(),
            days_threshold: DEFAULT_DAYS_THRESHOLD,
            interaction_retention_days: DEFAULT_RETENTION_DAYS,
            contact_timezone: default_contact_timezone(),
        }
    }
}

/// A single schedule entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub enabled: bool,
    pub cron: String,
    pub timezone: String,
}

impl ScheduleEntry {
    /// Default schedule for the inactivity sweep: 9 AM daily
    pub fn default_automation() -> Self {
        Self {
            enabled: true,
            cron: "0 9 * * *".to_string(), // 9 AM daily
            timezone: "America/New_York".to_string(),
        }
    }
}

// =============================================================================
// Execution bookkeeping
// =============================================================================

/// What triggered an automation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionTrigger {
    Scheduled,
    Manual,
    Missed,
}

/// One completed (or failed) automation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub trigger: ExecutionTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub updated_clients: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
