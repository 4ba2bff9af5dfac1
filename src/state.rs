use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::{Mutex, RwLock};

use crate::db::ClientStore;
use crate::error::EngineError;
use crate::scheduler::parse_cron;
use crate::types::{EngineConfig, ExecutionRecord, MAX_DAYS_THRESHOLD, MIN_DAYS_THRESHOLD};

const MAX_HISTORY_SIZE: usize = 100;

/// Shared state for the scheduler, executor and trigger boundary
pub struct AppState {
    pub config: RwLock<EngineConfig>,
    pub store: Arc<dyn ClientStore>,
    pub execution_history: Mutex<Vec<ExecutionRecord>>,
    pub last_scheduled_run: Mutex<Option<DateTime<Utc>>>,
    /// Held for the duration of an automation run. Overlapping runs are
    /// rejected rather than queued.
    pub run_guard: Mutex<()>,
}

impl AppState {
    pub fn new(config: EngineConfig, store: Arc<dyn ClientStore>) -> Self {
        Self {
            config: RwLock::new(config),
            store,
            execution_history: Mutex::new(Vec::new()),
            last_scheduled_run: Mutex::new(None),
            run_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config.read().clone()
    }

    /// Record a finished run, newest first
    pub fn add_execution_record(&self, record: ExecutionRecord) {
        let mut guard = self.execution_history.lock();
        guard.insert(0, record);

        if guard.len() > MAX_HISTORY_SIZE {
            guard.truncate(MAX_HISTORY_SIZE);
        }
    }

    /// Get execution history
    pub fn get_execution_history(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.execution_history
            .lock()
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get_last_scheduled_run(&self) -> Option<DateTime<Utc>> {
        *self.last_scheduled_run.lock()
    }

    pub fn set_last_scheduled_run(&self, at: DateTime<Utc>) {
        *self.last_scheduled_run.lock() = Some(at);
    }
}

/// Default config location: `~/.clientpulse/config.json`
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".clientpulse").join("config.json"))
}

/// Load config from the default location, falling back to defaults when the
/// file does not exist.
pub fn load_config() -> Result<EngineConfig, String> {
    let path = config_path()?;
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }
    load_config_from(&path)
}

/// Load and validate config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<EngineConfig, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    let config: EngineConfig =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    validate_config(&config).map_err(|e| e.to_string())?;
    Ok(config)
}

/// Reject thresholds outside 1..=365, bad cron expressions and unknown timezones.
pub fn validate_config(config: &EngineConfig) -> Result<(), EngineError> {
    if !(MIN_DAYS_THRESHOLD..=MAX_DAYS_THRESHOLD).contains(&config.days_threshold) {
        return Err(EngineError::ConfigurationError(format!(
            "daysThreshold must be between {} and {}, got {}",
            MIN_DAYS_THRESHOLD, MAX_DAYS_THRESHOLD, config.days_threshold
        )));
    }
    if config.interaction_retention_days < 1 {
        return Err(EngineError::ConfigurationError(format!(
            "interactionRetentionDays must be positive, got {}",
            config.interaction_retention_days
        )));
    }
    parse_cron(&config.automation.cron)?;
    for tz in [&config.automation.timezone, &config.contact_timezone] {
        tz.parse::<Tz>().map_err(|_| {
            EngineError::ConfigurationError(format!("Invalid timezone: {}", tz))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::types::ExecutionTrigger;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = write_config("{}");
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.days_threshold, 30);
        assert_eq!(config.automation.cron, "0 9 * * *");
    }

    #[test]
    fn test_config_overrides() {
        let file = write_config(
            r#"{"daysThreshold": 45, "contactTimezone": "Europe/Madrid",
                "automation": {"enabled": false, "cron": "30 7 * * 1-5", "timezone": "UTC"}}"#,
        );
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.days_threshold, 45);
        assert!(!config.automation.enabled);
        assert_eq!(config.contact_timezone, "Europe/Madrid");
    }

    #[test]
    fn test_config_rejects_out_of_range_threshold() {
        let file = write_config(r#"{"daysThreshold": 400}"#);
        let err = load_config_from(file.path()).unwrap_err();
        assert!(err.contains("daysThreshold"), "{}", err);
    }

    #[test]
    fn test_config_rejects_bad_cron_and_timezone() {
        let mut config = EngineConfig::default();
        config.automation.cron = "every morning".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = EngineConfig::default();
        config.contact_timezone = "Mars/Olympus".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_config_unparsable_json() {
        let file = write_config("{not json");
        let err = load_config_from(file.path()).unwrap_err();
        assert!(err.starts_with("Failed to parse config"));
    }

    #[test]
    fn test_history_newest_first_and_capped() {
        let state = AppState::new(EngineConfig::default(), Arc::new(MemoryStore::new()));
        let now = Utc::now();
        for i in 0..(MAX_HISTORY_SIZE + 5) {
            state.add_execution_record(ExecutionRecord {
                id: i.to_string(),
                trigger: ExecutionTrigger::Manual,
                started_at: now,
                finished_at: now,
                success: true,
                updated_clients: 0,
                error_message: None,
            });
        }
        let history = state.get_execution_history(usize::MAX);
        assert_eq!(history.len(), MAX_HISTORY_SIZE);
        assert_eq!(history[0].id, (MAX_HISTORY_SIZE + 4).to_string());
    }
}
