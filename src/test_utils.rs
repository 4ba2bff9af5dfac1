//! Record builders and store doubles shared by unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use crate::db::{ClientStore, MemoryStore};
use crate::error::EngineError;
use crate::types::{ClientPatch, ClientRecord, ClientStatus, Interaction, InteractionKind};

/// Fixed evaluation instant: 2026-03-02 15:30 UTC (a Monday afternoon).
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, 30, 0).unwrap()
}

/// Build a client relative to `fixed_now()`.
///
/// Interactions are spread back from the last interaction date, one per day.
pub fn client(
    id: &str,
    status: ClientStatus,
    interaction_count: usize,
    last_interaction_days_ago: i64,
    created_days_ago: i64,
) -> ClientRecord {
    let now = fixed_now();
    let last = now - Duration::days(last_interaction_days_ago);
    let interactions = (0..interaction_count)
        .map(|i| Interaction {
            id: format!("{}-i{}", id, i),
            date: last - Duration::days(i as i64),
            description: format!("Contact #{}", i + 1),
            kind: InteractionKind::Call,
        })
        .collect();

    ClientRecord {
        id: id.to_string(),
        name: format!("Client {}", id),
        phone: "+34 600 000 000".to_string(),
        status,
        last_interaction_at: last,
        interactions,
        created_at: now - Duration::days(created_days_ago),
        updated_at: last,
    }
}

/// Store that rejects every write after the first `allowed_writes`.
pub struct FailingStore {
    inner: MemoryStore,
    allowed_writes: Mutex<usize>,
}

impl FailingStore {
    pub fn new(records: Vec<ClientRecord>, allowed_writes: usize) -> Self {
        Self {
            inner: MemoryStore::from_records(records),
            allowed_writes: Mutex::new(allowed_writes),
        }
    }
}

impl ClientStore for FailingStore {
    fn get_all(&self) -> Result<Vec<ClientRecord>, EngineError> {
        self.inner.get_all()
    }

    fn get(&self, id: &str) -> Result<Option<ClientRecord>, EngineError> {
        self.inner.get(id)
    }

    fn patch(&self, id: &str, patch: ClientPatch) -> Result<(), EngineError> {
        let mut remaining = self.allowed_writes.lock();
        if *remaining == 0 {
            return Err(EngineError::Store("write rejected".to_string()));
        }
        *remaining -= 1;
        self.inner.patch(id, patch)
    }
}
