//! Threshold-based inactivity sweep.
//!
//! The scheduled job: any client that has gone longer than `days_threshold`
//! without an interaction, and is not already Inactive, is marked Inactive.
//! Runs are serialized through `AppState::run_guard`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::ClientStore;
use crate::error::EngineError;
use crate::signals::elapsed::days_before;
use crate::state::AppState;
use crate::types::{
    ClientPatch, ClientRecord, ClientStatus, ExecutionRecord, ExecutionTrigger,
    DEFAULT_DAYS_THRESHOLD,
};

/// Non-positive thresholds fall back to the default.
pub fn effective_threshold(days_threshold: i64) -> i64 {
    if days_threshold > 0 {
        days_threshold
    } else {
        DEFAULT_DAYS_THRESHOLD
    }
}

/// True when the last interaction is strictly older than `now - threshold`.
///
/// A threshold reaching past the representable calendar selects nothing.
pub fn is_past_threshold(record: &ClientRecord, days_threshold: i64, now: DateTime<Utc>) -> bool {
    days_before(now, effective_threshold(days_threshold))
        .is_some_and(|cutoff| record.last_interaction_at < cutoff)
}

/// Clients past the threshold that are not already Inactive.
pub fn clients_needing_follow_up<'a>(
    records: &'a [ClientRecord],
    days_threshold: i64,
    now: DateTime<Utc>,
) -> Vec<&'a ClientRecord> {
    records
        .iter()
        .filter(|r| r.status != ClientStatus::Inactive)
        .filter(|r| is_past_threshold(r, days_threshold, now))
        .collect()
}

/// Result of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactivitySweep {
    pub message: String,
    /// Ids selected for the Inactive transition, in input order.
    pub client_ids: Vec<String>,
    pub updated_clients: usize,
    pub threshold: i64,
    pub processed_at: DateTime<Utc>,
}

/// Plan a sweep without writing anything.
pub fn mark_inactive(
    records: &[ClientRecord],
    days_threshold: i64,
    now: DateTime<Utc>,
) -> InactivitySweep {
    let threshold = effective_threshold(days_threshold);
    let client_ids: Vec<String> = clients_needing_follow_up(records, threshold, now)
        .into_iter()
        .map(|r| r.id.clone())
        .collect();

    InactivitySweep {
        message: format!("{} clients would be marked as inactive", client_ids.len()),
        client_ids,
        updated_clients: 0,
        threshold,
        processed_at: now,
    }
}

/// Plan a sweep over the store's records and apply it, one patch per client.
///
/// A failed write stops the sweep with `PartiallyApplied` naming the clients
/// already marked.
pub fn apply_inactivity_sweep(
    store: &dyn ClientStore,
    days_threshold: i64,
    now: DateTime<Utc>,
) -> Result<InactivitySweep, EngineError> {
    let records = store.get_all()?;
    let mut sweep = mark_inactive(&records, days_threshold, now);

    for id in &sweep.client_ids {
        if let Err(e) = store.patch(id, ClientPatch::status(ClientStatus::Inactive)) {
            let applied = sweep.client_ids[..sweep.updated_clients].to_vec();
            return Err(EngineError::partially_applied(applied, e));
        }
        sweep.updated_clients += 1;
    }

    sweep.message = format!("Marked {} clients as inactive", sweep.updated_clients);
    log::info!(
        "automation: {} (threshold {} days, {} records scanned)",
        sweep.message,
        sweep.threshold,
        records.len()
    );
    Ok(sweep)
}

/// Run the configured sweep once, recording the outcome in the execution
/// history. Fails with `AutomationBusy` while another run holds the guard.
pub fn run_automation(
    state: &AppState,
    trigger: ExecutionTrigger,
    now: DateTime<Utc>,
) -> Result<InactivitySweep, EngineError> {
    let _guard = state
        .run_guard
        .try_lock()
        .ok_or(EngineError::AutomationBusy)?;

    let threshold = state.config.read().days_threshold;
    let started_at = Utc::now();
    let result = persist_after(
        state,
        apply_inactivity_sweep(state.store.as_ref(), threshold, now),
    );

    let (success, updated_clients, error_message) = match &result {
        Ok(sweep) => (true, sweep.updated_clients, None),
        Err(e) => {
            log::error!("automation: sweep failed: {}", e);
            (false, e.applied_ids().len(), Some(e.to_string()))
        }
    };

    state.add_execution_record(ExecutionRecord {
        id: uuid::Uuid::new_v4().to_string(),
        trigger,
        started_at,
        finished_at: Utc::now(),
        success,
        updated_clients,
        error_message,
    });

    result
}

/// Flush the store after a run, whether or not every write landed. A flush
/// failure fails an otherwise successful run.
pub(crate) fn persist_after<T>(
    state: &AppState,
    result: Result<T, EngineError>,
) -> Result<T, EngineError> {
    match (state.store.persist(), result) {
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(run_err)) => {
            log::error!("Failed to persist after failed run: {}", e);
            Err(run_err)
        }
        (Ok(()), result) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::test_utils::{client, fixed_now, FailingStore};
    use crate::types::EngineConfig;
    use chrono::Duration;
    use std::sync::Arc;

    #[test]
    fn test_threshold_is_strict() {
        let now = fixed_now();
        let mut record = client("c", ClientStatus::Active, 1, 30, 100);
        assert!(!is_past_threshold(&record, 30, now));

        record.last_interaction_at = now - Duration::days(30) - Duration::seconds(1);
        assert!(is_past_threshold(&record, 30, now));
    }

    #[test]
    fn test_zero_threshold_uses_default() {
        assert_eq!(effective_threshold(0), 30);
        assert_eq!(effective_threshold(-3), 30);
        assert_eq!(effective_threshold(7), 7);
    }

    #[test]
    fn test_follow_up_selection_skips_inactive() {
        let records = vec![
            client("stale-active", ClientStatus::Active, 3, 45, 200),
            client("stale-inactive", ClientStatus::Inactive, 3, 90, 200),
            client("fresh", ClientStatus::Potential, 1, 5, 20),
        ];
        let ids: Vec<&str> = clients_needing_follow_up(&records, 30, fixed_now())
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["stale-active"]);
    }

    #[test]
    fn test_mark_inactive_is_a_plan() {
        let records = vec![
            client("a", ClientStatus::Active, 3, 45, 200),
            client("b", ClientStatus::Potential, 0, 31, 40),
        ];
        let sweep = mark_inactive(&records, 30, fixed_now());
        assert_eq!(sweep.client_ids, vec!["a", "b"]);
        assert_eq!(sweep.updated_clients, 0);
        assert_eq!(records[0].status, ClientStatus::Active);
    }

    #[test]
    fn test_apply_sweep_updates_store() {
        let store = MemoryStore::from_records(vec![
            client("a", ClientStatus::Active, 3, 45, 200),
            client("b", ClientStatus::Potential, 2, 10, 40),
        ]);
        let sweep = apply_inactivity_sweep(&store, 30, fixed_now()).unwrap();
        assert_eq!(sweep.updated_clients, 1);
        assert_eq!(sweep.message, "Marked 1 clients as inactive");
        assert_eq!(store.get("a").unwrap().unwrap().status, ClientStatus::Inactive);
        assert_eq!(store.get("b").unwrap().unwrap().status, ClientStatus::Potential);
    }

    #[test]
    fn test_run_automation_records_history() {
        let store = Arc::new(MemoryStore::from_records(vec![client(
            "a",
            ClientStatus::Active,
            3,
            45,
            200,
        )]));
        let state = AppState::new(EngineConfig::default(), store);
        let sweep = run_automation(&state, ExecutionTrigger::Manual, fixed_now()).unwrap();
        assert_eq!(sweep.updated_clients, 1);

        let history = state.get_execution_history(10);
        assert_eq!(history.len(), 1);
        assert!(history[0].success);
        assert_eq!(history[0].updated_clients, 1);
        assert_eq!(history[0].trigger, ExecutionTrigger::Manual);
    }

    #[test]
    fn test_overlapping_run_is_rejected() {
        let state = AppState::new(EngineConfig::default(), Arc::new(MemoryStore::new()));
        let _held = state.run_guard.lock();
        let err = run_automation(&state, ExecutionTrigger::Scheduled, fixed_now()).unwrap_err();
        assert!(matches!(err, EngineError::AutomationBusy));
        assert!(state.get_execution_history(10).is_empty());
    }

    #[test]
    fn test_huge_threshold_selects_nothing() {
        let store = MemoryStore::from_records(vec![client("a", ClientStatus::Active, 3, 45, 200)]);
        let sweep = apply_inactivity_sweep(&store, 200_000_000, fixed_now()).unwrap();
        assert_eq!(sweep.updated_clients, 0);
        assert!(sweep.client_ids.is_empty());
        assert!(!is_past_threshold(
            &client("b", ClientStatus::Active, 0, 5000, 6000),
            i64::MAX,
            fixed_now()
        ));
    }

    #[test]
    fn test_failed_write_reports_applied_clients() {
        let store = FailingStore::new(
            vec![
                client("a", ClientStatus::Active, 3, 45, 200),
                client("b", ClientStatus::Active, 3, 50, 200),
            ],
            1,
        );
        let err = apply_inactivity_sweep(&store, 30, fixed_now()).unwrap_err();
        assert_eq!(err.applied_ids(), ["a".to_string()]);
        match err {
            EngineError::PartiallyApplied { source, .. } => {
                assert!(matches!(*source, EngineError::Store(_)))
            }
            other => panic!("expected partial failure, got {:?}", other),
        }
    }

    #[test]
    fn test_history_counts_writes_before_failure() {
        let store = Arc::new(FailingStore::new(
            vec![
                client("a", ClientStatus::Active, 3, 45, 200),
                client("b", ClientStatus::Active, 3, 50, 200),
            ],
            1,
        ));
        let state = AppState::new(EngineConfig::default(), store.clone());
        assert!(run_automation(&state, ExecutionTrigger::Scheduled, fixed_now()).is_err());

        let history = state.get_execution_history(10);
        assert!(!history[0].success);
        assert_eq!(history[0].updated_clients, 1);
        assert_eq!(
            store.get("a").unwrap().unwrap().status,
            ClientStatus::Inactive
        );
    }

    #[test]
    fn test_run_persists_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clients.json");
        MemoryStore::from_records(vec![client("a", ClientStatus::Active, 3, 45, 200)])
            .save_snapshot(&path)
            .unwrap();

        let store = Arc::new(MemoryStore::load_snapshot(&path).unwrap());
        let state = AppState::new(EngineConfig::default(), store);
        run_automation(&state, ExecutionTrigger::Scheduled, fixed_now()).unwrap();

        let on_disk = MemoryStore::load_snapshot(&path).unwrap();
        assert_eq!(
            on_disk.get("a").unwrap().unwrap().status,
            ClientStatus::Inactive
        );
    }
}
