//! Single-process presence store for development and tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tracing::warn;

use fanhub_core::result::AppResult;
use fanhub_core::traits::store::{
    EvictionTransaction, PresenceStore, StoreEvent, StoreEventStream,
};

/// Capacity of the in-process pub/sub bus.
const BUS_CAPACITY: usize = 256;

/// In-memory presence store.
///
/// All state lives behind one mutex; pub/sub is a broadcast bus. The
/// guarded keys carry version counters so the eviction transaction can
/// model the shared store's conflict watch, which makes this backend a
/// faithful harness for engine-level tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    bus: broadcast::Sender<StoreEvent>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Client id → last-seen epoch seconds.
    clients: HashMap<String, f64>,
    /// Client id → subscribed channels.
    client_channels: HashMap<String, HashSet<String>>,
    /// Channel → subscribed client ids. Entries disappear when emptied.
    channel_clients: HashMap<String, HashSet<String>>,
    /// Last completed sweep stamp.
    last_sweep: Option<f64>,
    /// Bumped on every write to the client registry.
    clients_version: u64,
    /// Bumped on every write to the sweep stamp.
    sweep_version: u64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        let (bus, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            bus,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn record_ping(&self, client_id: &str, seen_at: f64) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.clients.insert(client_id.to_string(), seen_at);
        state.clients_version += 1;
        Ok(())
    }

    async fn presence_score(&self, client_id: &str) -> AppResult<Option<f64>> {
        let state = self.state.lock().await;
        Ok(state.clients.get(client_id).copied())
    }

    async fn remove_client(&self, client_id: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.clients.remove(client_id);
        state.clients_version += 1;

        let channels = state.client_channels.remove(client_id).unwrap_or_default();
        for channel in channels {
            if let Some(members) = state.channel_clients.get_mut(&channel) {
                members.remove(client_id);
                if members.is_empty() {
                    state.channel_clients.remove(&channel);
                }
            }
        }
        Ok(())
    }

    async fn add_subscription(&self, client_id: &str, channel: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .client_channels
            .entry(client_id.to_string())
            .or_default()
            .insert(channel.to_string());
        state
            .channel_clients
            .entry(channel.to_string())
            .or_default()
            .insert(client_id.to_string());
        Ok(())
    }

    async fn remove_subscription(&self, client_id: &str, channel: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(channels) = state.client_channels.get_mut(client_id) {
            channels.remove(channel);
            if channels.is_empty() {
                state.client_channels.remove(client_id);
            }
        }
        if let Some(members) = state.channel_clients.get_mut(channel) {
            members.remove(client_id);
            if members.is_empty() {
                state.channel_clients.remove(channel);
            }
        }
        Ok(())
    }

    async fn channel_subscribers(&self, channel: &str) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .channel_clients
            .get(channel)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn client_subscriptions(&self, client_id: &str) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .client_channels
            .get(client_id)
            .map(|channels| channels.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
        // No receivers is not an error, matching store pub/sub semantics.
        let _ = self.bus.send(StoreEvent {
            channel: channel.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    async fn last_sweep_at(&self) -> AppResult<Option<f64>> {
        let state = self.state.lock().await;
        Ok(state.last_sweep)
    }

    async fn mark_sweep(&self, swept_at: f64) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.last_sweep = Some(swept_at);
        state.sweep_version += 1;
        Ok(())
    }

    async fn begin_eviction(&self) -> AppResult<Box<dyn EvictionTransaction>> {
        let state = self.state.lock().await;
        Ok(Box::new(MemoryEvictionTransaction {
            state: self.state.clone(),
            clients_version: state.clients_version,
            sweep_version: state.sweep_version,
        }))
    }

    async fn listen(&self) -> AppResult<StoreEventStream> {
        let rx = self.bus.subscribe();
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "In-memory bus receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// Eviction transaction with version-counter conflict detection.
#[derive(Debug)]
struct MemoryEvictionTransaction {
    state: Arc<Mutex<MemoryState>>,
    /// Registry version observed at begin.
    clients_version: u64,
    /// Sweep stamp version observed at begin.
    sweep_version: u64,
}

#[async_trait]
impl EvictionTransaction for MemoryEvictionTransaction {
    async fn stale_clients(&mut self, cutoff: f64) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut stale: Vec<String> = state
            .clients
            .iter()
            .filter(|(_, score)| **score <= cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        stale.sort();
        Ok(stale)
    }

    async fn channels(&mut self) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state.channel_clients.keys().cloned().collect())
    }

    async fn commit(
        &mut self,
        candidates: &[String],
        channels: &[String],
        cutoff: f64,
        swept_at: f64,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if state.clients_version != self.clients_version
            || state.sweep_version != self.sweep_version
        {
            return Ok(false);
        }

        state.clients.retain(|_, score| *score > cutoff);
        for channel in channels {
            if let Some(members) = state.channel_clients.get_mut(channel) {
                for client_id in candidates {
                    members.remove(client_id);
                }
                if members.is_empty() {
                    state.channel_clients.remove(channel);
                }
            }
        }
        for client_id in candidates {
            state.client_channels.remove(client_id);
        }
        state.last_sweep = Some(swept_at);
        state.clients_version += 1;
        state.sweep_version += 1;
        Ok(true)
    }

    async fn abort(&mut self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn make_store() -> MemoryStore {
        MemoryStore::new()
    }

    #[tokio::test]
    async fn test_ping_records_score() {
        let store = make_store();
        store.record_ping("c1", 100.0).await.unwrap();
        assert_eq!(store.presence_score("c1").await.unwrap(), Some(100.0));
        assert_eq!(store.presence_score("c2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ping_upserts_score() {
        let store = make_store();
        store.record_ping("c1", 100.0).await.unwrap();
        store.record_ping("c1", 200.0).await.unwrap();
        assert_eq!(store.presence_score("c1").await.unwrap(), Some(200.0));
    }

    #[tokio::test]
    async fn test_subscription_updates_both_sides() {
        let store = make_store();
        store.add_subscription("c1", "/foo").await.unwrap();
        assert_eq!(store.channel_subscribers("/foo").await.unwrap(), vec!["c1"]);
        assert_eq!(
            store.client_subscriptions("c1").await.unwrap(),
            vec!["/foo"]
        );
    }

    #[tokio::test]
    async fn test_remove_subscription_restores_both_sides() {
        let store = make_store();
        store.add_subscription("c1", "/foo").await.unwrap();
        store.remove_subscription("c1", "/foo").await.unwrap();
        assert!(store.channel_subscribers("/foo").await.unwrap().is_empty());
        assert!(store.client_subscriptions("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_subscription_is_idempotent() {
        let store = make_store();
        store.remove_subscription("c1", "/foo").await.unwrap();
        assert!(store.client_subscriptions("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_client_cleans_channel_sets() {
        let store = make_store();
        store.record_ping("c1", 1.0).await.unwrap();
        store.add_subscription("c1", "/foo").await.unwrap();
        store.add_subscription("c1", "/bar").await.unwrap();

        store.remove_client("c1").await.unwrap();

        assert_eq!(store.presence_score("c1").await.unwrap(), None);
        assert!(store.channel_subscribers("/foo").await.unwrap().is_empty());
        assert!(store.channel_subscribers("/bar").await.unwrap().is_empty());
        assert!(store.client_subscriptions("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_reaches_listener() {
        let store = make_store();
        let mut stream = store.listen().await.unwrap();
        store.publish("/foo", r#"{"n":1}"#).await.unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event.channel, "/foo");
        assert_eq!(event.payload, r#"{"n":1}"#);
    }

    #[tokio::test]
    async fn test_publish_without_listeners_succeeds() {
        let store = make_store();
        store.publish("/foo", "payload").await.unwrap();
    }

    #[tokio::test]
    async fn test_eviction_commit_applies() {
        let store = make_store();
        store.record_ping("old", 10.0).await.unwrap();
        store.record_ping("fresh", 100.0).await.unwrap();
        store.add_subscription("old", "/foo").await.unwrap();
        store.add_subscription("fresh", "/foo").await.unwrap();

        let mut txn = store.begin_eviction().await.unwrap();
        let stale = txn.stale_clients(50.0).await.unwrap();
        assert_eq!(stale, vec!["old"]);
        let channels = txn.channels().await.unwrap();

        let committed = txn.commit(&stale, &channels, 50.0, 120.0).await.unwrap();
        assert!(committed);

        assert_eq!(store.presence_score("old").await.unwrap(), None);
        assert_eq!(store.presence_score("fresh").await.unwrap(), Some(100.0));
        assert_eq!(
            store.channel_subscribers("/foo").await.unwrap(),
            vec!["fresh"]
        );
        assert_eq!(store.last_sweep_at().await.unwrap(), Some(120.0));
    }

    #[tokio::test]
    async fn test_eviction_conflicts_on_concurrent_ping() {
        let store = make_store();
        store.record_ping("old", 10.0).await.unwrap();

        let mut txn = store.begin_eviction().await.unwrap();
        let stale = txn.stale_clients(50.0).await.unwrap();

        // Concurrent write to the guarded registry voids the transaction.
        store.record_ping("old", 60.0).await.unwrap();

        let committed = txn.commit(&stale, &[], 50.0, 120.0).await.unwrap();
        assert!(!committed);
        assert_eq!(store.presence_score("old").await.unwrap(), Some(60.0));
        assert_eq!(store.last_sweep_at().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_eviction_conflicts_on_concurrent_sweep() {
        let store = make_store();
        store.record_ping("old", 10.0).await.unwrap();

        let mut txn = store.begin_eviction().await.unwrap();
        let stale = txn.stale_clients(50.0).await.unwrap();

        store.mark_sweep(119.0).await.unwrap();

        let committed = txn.commit(&stale, &[], 50.0, 120.0).await.unwrap();
        assert!(!committed);
        assert_eq!(store.last_sweep_at().await.unwrap(), Some(119.0));
    }

    #[tokio::test]
    async fn test_abort_leaves_state_untouched() {
        let store = make_store();
        store.record_ping("c1", 10.0).await.unwrap();

        let mut txn = store.begin_eviction().await.unwrap();
        txn.abort().await.unwrap();

        assert_eq!(store.presence_score("c1").await.unwrap(), Some(10.0));
    }
}
