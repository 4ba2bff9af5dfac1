use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::ClientStore;
use crate::error::EngineError;
use crate::types::{ClientPatch, ClientRecord, ClientStatus, Interaction, InteractionKind};
use crate::validation::{validate_client_form, validate_interaction_form};

/// In-memory client store. Keeps insertion order for `get_all`.
///
/// A store loaded from a snapshot file writes back to it on `persist`.
#[derive(Default, Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Default, Debug)]
struct Inner {
    order: Vec<String>,
    records: HashMap<String, ClientRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ClientRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Load a JSON array of client records. `persist` writes back to `path`.
    pub fn load_snapshot(path: &Path) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::Store(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;
        let records: Vec<ClientRecord> = serde_json::from_str(&content).map_err(|e| {
            EngineError::Store(format!("Failed to parse snapshot {}: {}", path.display(), e))
        })?;
        log::info!(
            "Loaded {} client records from {}",
            records.len(),
            path.display()
        );

        let mut store = Self::from_records(records);
        store.snapshot_path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Write all records as a JSON array through a temp file and rename, so
    /// an interrupted write never truncates the existing snapshot.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), EngineError> {
        let records = self.snapshot();
        let content = serde_json::to_string_pretty(&records)
            .map_err(|e| EngineError::Store(format!("Failed to serialize snapshot: {}", e)))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            EngineError::Store(format!(
                "Failed to write temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;
        fs::rename(&temp_path, path).map_err(|e| {
            EngineError::Store(format!("Failed to replace {}: {}", path.display(), e))
        })
    }

    /// Insert or replace a record verbatim.
    pub fn insert(&self, record: ClientRecord) {
        let mut inner = self.inner.write();
        if !inner.records.contains_key(&record.id) {
            inner.order.push(record.id.clone());
        }
        inner.records.insert(record.id.clone(), record);
    }

    /// Create a validated client with no interactions.
    pub fn create_client(
        &self,
        name: &str,
        phone: &str,
        status: ClientStatus,
        now: DateTime<Utc>,
    ) -> Result<ClientRecord, EngineError> {
        validate_client_form(name, phone)?;
        let record = ClientRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            status,
            last_interaction_at: now,
            interactions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.insert(record.clone());
        Ok(record)
    }

    /// Append an interaction and move the client's last-interaction mark to `now`.
    pub fn add_interaction(
        &self,
        client_id: &str,
        description: &str,
        kind: InteractionKind,
        now: DateTime<Utc>,
    ) -> Result<Interaction, EngineError> {
        validate_interaction_form(description)?;

        let mut inner = self.inner.write();
        let record = inner
            .records
            .get_mut(client_id)
            .ok_or_else(|| EngineError::NotFound(client_id.to_string()))?;

        let interaction = Interaction {
            id: uuid::Uuid::new_v4().to_string(),
            date: now,
            description: description.trim().to_string(),
            kind,
        };
        record.interactions.push(interaction.clone());
        record.last_interaction_at = now;
        record.updated_at = now;
        Ok(interaction)
    }

    pub fn delete(&self, id: &str) -> Result<ClientRecord, EngineError> {
        let mut inner = self.inner.write();
        let removed = inner
            .records
            .remove(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        inner.order.retain(|existing| existing != id);
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<ClientRecord> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }
}

impl ClientStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<ClientRecord>, EngineError> {
        Ok(self.snapshot())
    }

    fn get(&self, id: &str) -> Result<Option<ClientRecord>, EngineError> {
        Ok(self.inner.read().records.get(id).cloned())
    }

    fn patch(&self, id: &str, patch: ClientPatch) -> Result<(), EngineError> {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(phone) = patch.phone {
            record.phone = phone;
        }
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(interactions) = patch.interactions {
            record.interactions = interactions;
        }
        if let Some(last) = patch.last_interaction_at {
            record.last_interaction_at = last;
        }
        record.updated_at = Utc::now();
        Ok(())
    }

    fn persist(&self) -> Result<(), EngineError> {
        match &self.snapshot_path {
            Some(path) => self.save_snapshot(path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{client, fixed_now};

    #[test]
    fn test_create_and_get_client() {
        let store = MemoryStore::new();
        let created = store
            .create_client("  Ana Torres ", "600 123 4567", ClientStatus::Potential, fixed_now())
            .unwrap();
        assert_eq!(created.name, "Ana Torres");
        assert_eq!(created.last_interaction_at, fixed_now());

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_create_client_rejects_invalid_form() {
        let store = MemoryStore::new();
        let err = store
            .create_client("A", "123", ClientStatus::Active, fixed_now())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_interaction_appends_and_bumps_last_interaction() {
        let store = MemoryStore::from_records(vec![client("c1", ClientStatus::Active, 2, 20, 100)]);
        let now = fixed_now();
        store
            .add_interaction("c1", "Renewal discussion", InteractionKind::Meeting, now)
            .unwrap();

        let record = store.get("c1").unwrap().unwrap();
        assert_eq!(record.interactions.len(), 3);
        assert_eq!(record.interactions[2].kind, InteractionKind::Meeting);
        assert_eq!(record.last_interaction_at, now);
    }

    #[test]
    fn test_add_interaction_unknown_client() {
        let store = MemoryStore::new();
        let err = store
            .add_interaction("missing", "Intro call", InteractionKind::Call, fixed_now())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(id) if id == "missing"));
    }

    #[test]
    fn test_patch_updates_only_given_fields() {
        let store = MemoryStore::from_records(vec![client("c1", ClientStatus::Active, 2, 20, 100)]);
        store
            .patch("c1", ClientPatch::status(ClientStatus::Inactive))
            .unwrap();
        let record = store.get("c1").unwrap().unwrap();
        assert_eq!(record.status, ClientStatus::Inactive);
        assert_eq!(record.interactions.len(), 2);
        assert_eq!(record.name, "Client c1");
    }

    #[test]
    fn test_get_all_keeps_insertion_order() {
        let store = MemoryStore::from_records(vec![
            client("b", ClientStatus::Active, 0, 1, 1),
            client("a", ClientStatus::Active, 0, 1, 1),
            client("c", ClientStatus::Active, 0, 1, 1),
        ]);
        store.delete("a").unwrap();
        let ids: Vec<String> = store.get_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_snapshot_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clients.json");
        let store = MemoryStore::from_records(vec![client("c1", ClientStatus::Potential, 1, 3, 9)]);
        store.save_snapshot(&path).unwrap();

        let loaded = MemoryStore::load_snapshot(&path).unwrap();
        assert_eq!(loaded.get_all().unwrap(), store.get_all().unwrap());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_persist_writes_back_to_loaded_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clients.json");
        MemoryStore::from_records(vec![client("c1", ClientStatus::Active, 1, 3, 9)])
            .save_snapshot(&path)
            .unwrap();

        let store = MemoryStore::load_snapshot(&path).unwrap();
        store
            .patch("c1", ClientPatch::status(ClientStatus::Inactive))
            .unwrap();
        store.persist().unwrap();

        let reloaded = MemoryStore::load_snapshot(&path).unwrap();
        assert_eq!(
            reloaded.get("c1").unwrap().unwrap().status,
            ClientStatus::Inactive
        );
    }

    #[test]
    fn test_persist_without_snapshot_is_noop() {
        assert!(MemoryStore::new().persist().is_ok());
    }

    #[test]
    fn test_load_missing_snapshot_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MemoryStore::load_snapshot(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
        assert!(err.is_retryable());
    }
}
