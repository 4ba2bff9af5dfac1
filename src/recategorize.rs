//! Score-driven recategorization.
//!
//! Runs the scoring engine over one or many records and keeps only those whose
//! recommended status differs from the current one. Building the change-set is
//! pure; `apply_changes` is the only step that writes, once per change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::automation::persist_after;
use crate::db::ClientStore;
use crate::error::EngineError;
use crate::signals::scoring::{score_client, ScoringFactor};
use crate::state::AppState;
use crate::types::{ClientPatch, ClientRecord, ClientStatus, Confidence};

/// A proposed status transition for one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub client_id: String,
    pub name: String,
    pub previous_status: ClientStatus,
    pub new_status: ClientStatus,
    pub reason: String,
    pub confidence: Confidence,
    pub factors: Vec<ScoringFactor>,
    pub score: i32,
    /// Set once the store has accepted the write.
    #[serde(default)]
    pub applied: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecategorizationOutcome {
    pub processed_count: usize,
    pub recategorized_count: usize,
    pub changes: Vec<StatusChange>,
}

/// Score one record and return a change only if the recommendation differs.
pub fn propose_change(record: &ClientRecord, now: DateTime<Utc>) -> Option<StatusChange> {
    let result = score_client(record, now);
    if result.recommended_status == record.status {
        return None;
    }

    Some(StatusChange {
        client_id: record.id.clone(),
        name: record.name.clone(),
        previous_status: record.status,
        new_status: result.recommended_status,
        reason: result.reason,
        confidence: result.confidence,
        factors: result.factors,
        score: result.score,
        applied: false,
    })
}

/// Recategorize the full record set. Zero records is not an error.
pub fn recategorize(records: &[ClientRecord], now: DateTime<Utc>) -> RecategorizationOutcome {
    let changes: Vec<StatusChange> = records
        .iter()
        .filter_map(|record| propose_change(record, now))
        .collect();

    RecategorizationOutcome {
        processed_count: records.len(),
        recategorized_count: changes.len(),
        changes,
    }
}

/// Recategorize a single client picked out of `records`.
pub fn recategorize_one(
    records: &[ClientRecord],
    client_id: &str,
    now: DateTime<Utc>,
) -> Result<RecategorizationOutcome, EngineError> {
    if records.is_empty() {
        return Err(EngineError::EmptyInput(format!(
            "requested client {} but the record set is empty",
            client_id
        )));
    }
    let record = records
        .iter()
        .find(|r| r.id == client_id)
        .ok_or_else(|| EngineError::NotFound(client_id.to_string()))?;

    Ok(recategorize(std::slice::from_ref(record), now))
}

/// Write each proposed change to the store, in order, and mark it applied.
///
/// Stops at the first failed write with `PartiallyApplied`; changes before it
/// stay applied and keep `applied = true`.
pub fn apply_changes(
    store: &dyn ClientStore,
    outcome: &mut RecategorizationOutcome,
) -> Result<usize, EngineError> {
    let mut applied = 0;
    for change in outcome.changes.iter_mut().filter(|c| !c.applied) {
        store.patch(&change.client_id, ClientPatch::status(change.new_status))?;
        change.applied = true;
        applied += 1;
        log::info!(
            "recategorize: {} {} -> {} (score {}, {:?} confidence)",
            change.client_id,
            change.previous_status,
            change.new_status,
            change.score,
            change.confidence,
        );
    }
    Ok(applied)
}

/// Load from the store, recategorize, and apply.
///
/// With `target` set only that client is processed: an empty store is
/// `EmptyInput`, a missing id `NotFound`. A failed write is reported as
/// `PartiallyApplied` with the ids written before it.
pub fn recategorize_store(
    store: &dyn ClientStore,
    target: Option<&str>,
    now: DateTime<Utc>,
) -> Result<RecategorizationOutcome, EngineError> {
    let records = store.get_all()?;
    let mut outcome = match target {
        Some(id) => recategorize_one(&records, id, now)?,
        None => recategorize(&records, now),
    };

    if let Err(e) = apply_changes(store, &mut outcome) {
        let applied = outcome
            .changes
            .iter()
            .filter(|c| c.applied)
            .map(|c| c.client_id.clone())
            .collect();
        return Err(EngineError::partially_applied(applied, e));
    }
    log::info!(
        "recategorize: processed {}, recategorized {}",
        outcome.processed_count,
        outcome.recategorized_count
    );
    Ok(outcome)
}

/// Recategorize against the shared store under the automation run guard, so
/// it never interleaves with a sweep. Fails with `AutomationBusy` while
/// another run holds the guard.
pub fn run_recategorization(
    state: &AppState,
    target: Option<&str>,
    now: DateTime<Utc>,
) -> Result<RecategorizationOutcome, EngineError> {
    let _guard = state
        .run_guard
        .try_lock()
        .ok_or(EngineError::AutomationBusy)?;

    persist_after(state, recategorize_store(state.store.as_ref(), target, now))
}
