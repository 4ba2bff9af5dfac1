//! Rule-based client scoring, recategorization and follow-up prioritization.
//!
//! The engine works on an in-memory snapshot of client records and an explicit
//! `now`. Persistence sits behind `db::ClientStore`; scheduled automation is
//! driven by `scheduler` + `executor` over a shared `state::AppState`.

pub mod analysis;
pub mod automation;
pub mod db;
pub mod error;
pub mod executor;
pub mod helpers;
pub mod hygiene;
pub mod portfolio;
pub mod recategorize;
pub mod scheduler;
pub mod signals;
pub mod state;
pub mod trigger;
pub mod types;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use portfolio::summarize_portfolio;
pub use recategorize::recategorize;
pub use signals::cadence::build_follow_up_queue;
pub use signals::scoring::score_client;

use std::sync::Arc;

use tokio::sync::mpsc;

use state::AppState;

/// Channel buffer size for scheduler messages
const SCHEDULER_CHANNEL_SIZE: usize = 32;

/// Spawn the scheduler and executor on the current tokio runtime.
///
/// Both tasks run until the runtime shuts down.
pub fn spawn_automation(state: Arc<AppState>) {
    let (scheduler_tx, scheduler_rx) = mpsc::channel(SCHEDULER_CHANNEL_SIZE);

    let scheduler_state = state.clone();
    tokio::spawn(async move {
        let scheduler = scheduler::Scheduler::new(scheduler_state, scheduler_tx);
        scheduler.run().await;
    });

    tokio::spawn(async move {
        let executor = executor::Executor::new(state);
        executor.run(scheduler_rx).await;
    });
}
