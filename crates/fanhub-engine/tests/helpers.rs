//! Shared test helpers for engine integration tests.

use std::sync::Arc;

use fanhub_core::config::engine::EngineConfig;
use fanhub_engine::Engine;
use fanhub_store::memory::MemoryStore;

/// Engine over a fresh in-memory store, with a handle on the store for
/// direct assertions.
pub fn make_engine() -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone(), EngineConfig::default());
    (engine, store)
}
