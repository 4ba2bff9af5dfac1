//! Record store collaborator.
//!
//! The engine never fetches or persists records itself. Orchestration code
//! that needs to apply proposals goes through `ClientStore`; hosts plug in
//! their own durable store. `MemoryStore` is the in-process implementation
//! used by the CLI and tests.

use crate::error::EngineError;
use crate::types::{ClientPatch, ClientRecord};

pub mod memory;
pub use memory::MemoryStore;

/// Minimal store contract the orchestrators rely on.
///
/// `patch` must bump `updated_at`. There is no compare-and-swap: concurrent
/// writers to the same record resolve last-write-wins.
pub trait ClientStore: Send + Sync {
    fn get_all(&self) -> Result<Vec<ClientRecord>, EngineError>;

    fn get(&self, id: &str) -> Result<Option<ClientRecord>, EngineError>;

    fn patch(&self, id: &str, patch: ClientPatch) -> Result<(), EngineError>;

    /// Flush buffered writes to durable storage. Write-through stores keep
    /// the default no-op.
    fn persist(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
