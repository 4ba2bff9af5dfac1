//! Interaction retention.
//!
//! Drops interactions older than the retention window. Planning is pure;
//! `apply_interaction_pruning` patches each affected client once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::automation::persist_after;
use crate::db::ClientStore;
use crate::error::EngineError;
use crate::signals::elapsed::days_before;
use crate::state::AppState;
use crate::types::{ClientPatch, ClientRecord, Interaction, DEFAULT_RETENTION_DAYS};

/// Interactions to keep for one client that lost at least one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionPrune {
    pub client_id: String,
    pub kept: Vec<Interaction>,
    pub removed: usize,
}

/// Report from a retention pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HygieneReport {
    pub message: String,
    pub cleaned_clients: usize,
    pub removed_interactions: usize,
    pub cutoff: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    #[serde(skip)]
    pub prunes: Vec<InteractionPrune>,
}

/// Plan which interactions to drop. Only dates strictly after the cutoff survive.
///
/// A window reaching past the representable calendar drops nothing.
pub fn prune_interactions(
    records: &[ClientRecord],
    days_to_keep: i64,
    now: DateTime<Utc>,
) -> HygieneReport {
    let days = if days_to_keep > 0 {
        days_to_keep
    } else {
        DEFAULT_RETENTION_DAYS
    };
    let cutoff = days_before(now, days).unwrap_or(DateTime::<Utc>::MIN_UTC);

    let prunes: Vec<InteractionPrune> = records
        .iter()
        .filter_map(|record| {
            let kept: Vec<Interaction> = record
                .interactions
                .iter()
                .filter(|i| i.date > cutoff)
                .cloned()
                .collect();
            let removed = record.interactions.len() - kept.len();
            (removed > 0).then(|| InteractionPrune {
                client_id: record.id.clone(),
                kept,
                removed,
            })
        })
        .collect();

    HygieneReport {
        message: format!("Old interactions found on {} clients", prunes.len()),
        cleaned_clients: prunes.len(),
        removed_interactions: prunes.iter().map(|p| p.removed).sum(),
        cutoff,
        processed_at: now,
        prunes,
    }
}

pub fn apply_interaction_pruning(
    store: &dyn ClientStore,
    days_to_keep: i64,
    now: DateTime<Utc>,
) -> Result<HygieneReport, EngineError> {
    let records = store.get_all()?;
    let mut report = prune_interactions(&records, days_to_keep, now);

    for (done, prune) in report.prunes.iter().enumerate() {
        let patch = ClientPatch {
            interactions: Some(prune.kept.clone()),
            ..Default::default()
        };
        if let Err(e) = store.patch(&prune.client_id, patch) {
            let applied = report.prunes[..done]
                .iter()
                .map(|p| p.client_id.clone())
                .collect();
            return Err(EngineError::partially_applied(applied, e));
        }
    }

    report.message = format!(
        "Cleaned old interactions from {} clients",
        report.cleaned_clients
    );
    log::info!(
        "hygiene: {} ({} interactions removed)",
        report.message,
        report.removed_interactions
    );
    Ok(report)
}

/// Prune with the configured retention, under the automation run guard.
pub fn run_interaction_pruning(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<HygieneReport, EngineError> {
    let _guard = state
        .run_guard
        .try_lock()
        .ok_or(EngineError::AutomationBusy)?;

    let days_to_keep = state.config().interaction_retention_days;
    persist_after(
        state,
        apply_interaction_pruning(state.store.as_ref(), days_to_keep, now),
    )
}
