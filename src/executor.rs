//! Automation executor
//!
//! Consumes scheduler messages one at a time, so scheduled sweeps never
//! overlap each other. Manual triggers share the same run guard.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::automation::{run_automation, InactivitySweep};
use crate::error::EngineError;
use crate::scheduler::SchedulerMessage;
use crate::state::AppState;
use crate::types::ExecutionTrigger;

pub struct Executor {
    state: Arc<AppState>,
}

impl Executor {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Start the executor loop
    ///
    /// Returns when every sender has been dropped.
    pub async fn run(&self, mut receiver: mpsc::Receiver<SchedulerMessage>) {
        while let Some(msg) = receiver.recv().await {
            log::info!(
                "Executing inactivity sweep (trigger: {:?}, slot: {})",
                msg.trigger,
                msg.scheduled_for
            );

            if let Err(e) = self.execute(msg.trigger) {
                log::error!("Inactivity sweep failed: {}", e);
            }
        }
    }

    /// Run one sweep against the store as of the current instant.
    pub fn execute(&self, trigger: ExecutionTrigger) -> Result<InactivitySweep, EngineError> {
        run_automation(&self.state, trigger, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ClientStore, MemoryStore};
    use crate::types::{ClientRecord, ClientStatus, EngineConfig};
    use chrono::Duration;

    fn stale_active(id: &str) -> ClientRecord {
        let long_ago = Utc::now() - Duration::days(90);
        ClientRecord {
            id: id.to_string(),
            name: "Stale".to_string(),
            phone: "6001234567".to_string(),
            status: ClientStatus::Active,
            last_interaction_at: long_ago,
            interactions: Vec::new(),
            created_at: long_ago,
            updated_at: long_ago,
        }
    }

    #[tokio::test]
    async fn test_executor_processes_messages_until_closed() {
        let store = Arc::new(MemoryStore::from_records(vec![stale_active("c1")]));
        let state = Arc::new(AppState::new(EngineConfig::default(), store.clone()));
        let (tx, rx) = mpsc::channel(4);

        tx.send(SchedulerMessage {
            trigger: ExecutionTrigger::Scheduled,
            scheduled_for: Utc::now(),
        })
        .await
        .unwrap();
        tx.send(SchedulerMessage {
            trigger: ExecutionTrigger::Missed,
            scheduled_for: Utc::now(),
        })
        .await
        .unwrap();
        drop(tx);

        Executor::new(state.clone()).run(rx).await;

        assert_eq!(
            store.get("c1").unwrap().unwrap().status,
            ClientStatus::Inactive
        );
        let history = state.get_execution_history(10);
        assert_eq!(history.len(), 2);
        // Second run finds nothing left to update
        assert_eq!(history[0].updated_clients, 0);
        assert_eq!(history[1].updated_clients, 1);
    }
}
