//! Scheduler for the cron-based inactivity sweep
//!
//! Handles:
//! - Cron expression parsing (5-field)
//! - Timezone-aware scheduling
//! - Sleep/wake detection via time-jump polling
//! - Missed run handling (runs if within grace period)

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::state::AppState;
use crate::types::{ExecutionTrigger, ScheduleEntry};

/// Grace period for missed runs (2 hours)
const MISSED_RUN_GRACE_PERIOD_SECS: i64 = 7200;

/// Time jump threshold to detect sleep/wake (5 minutes)
const TIME_JUMP_THRESHOLD_SECS: i64 = 300;

/// Poll interval for scheduler loop (1 minute)
const POLL_INTERVAL_SECS: u64 = 60;

/// A scheduled time counts as "now" within this window
const DUE_WINDOW_SECS: i64 = 120;

/// Message sent to trigger an automation run
#[derive(Debug, Clone)]
pub struct SchedulerMessage {
    pub trigger: ExecutionTrigger,
    pub scheduled_for: DateTime<Utc>,
}

pub struct Scheduler {
    state: Arc<AppState>,
    sender: mpsc::Sender<SchedulerMessage>,
}

impl Scheduler {
    pub fn new(state: Arc<AppState>, sender: mpsc::Sender<SchedulerMessage>) -> Self {
        Self { state, sender }
    }

    /// Start the scheduler loop
    ///
    /// Runs until the executor side of the channel is dropped.
    pub async fn run(&self) {
        let mut last_check = Utc::now();

        loop {
            tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;

            let now = Utc::now();

            // Detect sleep: time jumped more than 5 minutes
            let time_jump = (now - last_check).num_seconds();
            if time_jump > TIME_JUMP_THRESHOLD_SECS {
                log::info!(
                    "Detected system wake (time jumped {} seconds), checking for missed runs",
                    time_jump
                );
                if !self.check_missed_run(now).await {
                    return;
                }
            }

            if !self.check_and_run_due(now).await {
                return;
            }

            last_check = now;
        }
    }

    /// Returns false once the executor has gone away.
    async fn check_and_run_due(&self, now: DateTime<Utc>) -> bool {
        let entry = self.state.config.read().automation.clone();
        if !entry.enabled {
            return true;
        }

        match due_run(&entry, now, self.state.get_last_scheduled_run()) {
            Ok(Some(scheduled)) => self.trigger(ExecutionTrigger::Scheduled, scheduled).await,
            Ok(None) => true,
            Err(e) => {
                log::warn!("Scheduler: {}", e);
                true
            }
        }
    }

    async fn check_missed_run(&self, now: DateTime<Utc>) -> bool {
        let entry = self.state.config.read().automation.clone();
        if !entry.enabled {
            return true;
        }

        match find_missed_run(&entry, now, self.state.get_last_scheduled_run()) {
            Ok(Some(scheduled)) => {
                log::info!("Found missed inactivity sweep ({}), running now", scheduled);
                self.trigger(ExecutionTrigger::Missed, scheduled).await
            }
            Ok(None) => true,
            Err(e) => {
                log::warn!("Scheduler: {}", e);
                true
            }
        }
    }

    async fn trigger(&self, trigger: ExecutionTrigger, scheduled_for: DateTime<Utc>) -> bool {
        // Mark before sending so the next poll inside the due window does not
        // fire the same slot again.
        self.state.set_last_scheduled_run(scheduled_for);

        if self
            .sender
            .send(SchedulerMessage {
                trigger,
                scheduled_for,
            })
            .await
            .is_err()
        {
            log::error!("Failed to send scheduler message: executor stopped");
            return false;
        }
        true
    }
}

fn parse_timezone(entry: &ScheduleEntry) -> Result<Tz, EngineError> {
    entry.timezone.parse().map_err(|_| {
        EngineError::ConfigurationError(format!("Invalid timezone: {}", entry.timezone))
    })
}

/// The scheduled slot that is due at `now`, if it has not already run.
pub fn due_run(
    entry: &ScheduleEntry,
    now: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, EngineError> {
    let schedule = parse_cron(&entry.cron)?;
    let tz = parse_timezone(entry)?;

    let now_local = now.with_timezone(&tz);
    let mut upcoming = schedule.after(&(now_local - chrono::Duration::minutes(2)));

    if let Some(next_time) = upcoming.next() {
        let next_utc = next_time.with_timezone(&Utc);
        let diff = (now - next_utc).num_seconds().abs();

        if diff < DUE_WINDOW_SECS {
            if let Some(last) = last_run {
                if (last - next_utc).num_seconds().abs() < 60 {
                    return Ok(None); // Already ran
                }
            }
            return Ok(Some(next_utc));
        }
    }

    Ok(None)
}

/// The earliest slot inside the grace period that was never run.
pub fn find_missed_run(
    entry: &ScheduleEntry,
    now: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, EngineError> {
    let schedule = parse_cron(&entry.cron)?;
    let tz = parse_timezone(entry)?;

    let grace_start =
        now.with_timezone(&tz) - chrono::Duration::seconds(MISSED_RUN_GRACE_PERIOD_SECS);

    for scheduled in schedule.after(&grace_start) {
        let scheduled_utc = scheduled.with_timezone(&Utc);

        if scheduled_utc > now {
            break;
        }

        if let Some(last) = last_run {
            if last >= scheduled_utc {
                continue; // Already ran
            }
        }

        return Ok(Some(scheduled_utc));
    }

    Ok(None)
}

/// Parse a 5-field cron expression
pub fn parse_cron(expr: &str) -> Result<Schedule, EngineError> {
    // The cron crate expects 6 fields (with seconds), but we use 5-field format
    let full_expr = format!("0 {}", expr);

    full_expr.parse::<Schedule>().map_err(|e| {
        EngineError::ConfigurationError(format!("Invalid cron expression '{}': {}", expr, e))
    })
}

/// Next scheduled sweep after `now`
pub fn get_next_run_time(
    entry: &ScheduleEntry,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, EngineError> {
    let schedule = parse_cron(&entry.cron)?;
    let tz = parse_timezone(entry)?;

    let next = schedule
        .after(&now.with_timezone(&tz))
        .next()
        .ok_or_else(|| {
            EngineError::ConfigurationError("No upcoming scheduled time".to_string())
        })?;

    Ok(next.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn daily_nine_utc() -> ScheduleEntry {
        ScheduleEntry {
            enabled: true,
            cron: "0 9 * * *".to_string(),
            timezone: "UTC".to_string(),
        }
    }

    #[test]
    fn test_parse_cron_daily() {
        assert!(parse_cron("0 9 * * *").is_ok());
    }

    #[test]
    fn test_parse_cron_invalid() {
        assert!(parse_cron("not a cron").is_err());
    }

    #[test]
    fn test_due_within_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 30).unwrap();
        let due = due_run(&daily_nine_utc(), now, None).unwrap();
        assert_eq!(due, Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()));
    }

    #[test]
    fn test_not_due_outside_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap();
        assert_eq!(due_run(&daily_nine_utc(), now, None).unwrap(), None);
    }

    #[test]
    fn test_due_slot_not_repeated() {
        let slot = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let now = slot + chrono::Duration::seconds(70);
        assert_eq!(due_run(&daily_nine_utc(), now, Some(slot)).unwrap(), None);
    }

    #[test]
    fn test_missed_run_within_grace_period() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0).unwrap();
        let missed = find_missed_run(&daily_nine_utc(), now, None).unwrap();
        assert_eq!(
            missed,
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
        );

        let yesterday = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let already = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 5).unwrap();
        assert_eq!(
            find_missed_run(&daily_nine_utc(), now, Some(already)).unwrap(),
            None
        );
        assert!(find_missed_run(&daily_nine_utc(), now, Some(yesterday))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_missed_run_outside_grace_period() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        assert_eq!(find_missed_run(&daily_nine_utc(), now, None).unwrap(), None);
    }

    #[test]
    fn test_next_run_time_respects_timezone() {
        let entry = ScheduleEntry {
            enabled: true,
            cron: "0 9 * * *".to_string(),
            timezone: "America/New_York".to_string(),
        };
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let next = get_next_run_time(&entry, now).unwrap();
        // 09:00 EST == 14:00 UTC
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_timezone() {
        let mut entry = daily_nine_utc();
        entry.timezone = "Nowhere/Special".to_string();
        assert!(get_next_run_time(&entry, Utc::now()).is_err());
    }
}
