//! Top-level engine that ties together all subsystems.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use fanhub_core::config::AppConfig;
use fanhub_core::config::engine::EngineConfig;
use fanhub_core::ident::generate_client_id;
use fanhub_core::message::Envelope;
use fanhub_core::result::AppResult;
use fanhub_core::traits::engine::PresenceEngine;
use fanhub_core::traits::store::PresenceStore;
use fanhub_store::StoreManager;

use crate::channel;
use crate::delivery::{ClientSink, DeliveryTable};
use crate::listener::run_listener;
use crate::metrics::EngineMetrics;
use crate::subscriptions::SubscriptionIndex;
use crate::sweeper::run_sweeper;

/// Current time as fractional epoch seconds.
pub fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Central presence-and-fanout engine.
///
/// Owns the local subscription index, the delivery table, and the
/// background listener and sweeper tasks. All shared state lives in the
/// store; any number of engines on any number of processes may share
/// one store.
#[derive(Clone)]
pub struct Engine {
    /// Backing presence store.
    store: Arc<dyn PresenceStore>,
    /// Local subscription index.
    pub subscriptions: Arc<SubscriptionIndex>,
    /// Local delivery table.
    pub delivery: Arc<DeliveryTable>,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
    /// Engine configuration.
    config: EngineConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish()
    }
}

impl Engine {
    /// Creates a new engine over an existing store.
    pub fn new(store: Arc<dyn PresenceStore>, config: EngineConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let engine = Self {
            store,
            subscriptions: Arc::new(SubscriptionIndex::new()),
            delivery: Arc::new(DeliveryTable::new(config.sink_buffer_size)),
            metrics: Arc::new(EngineMetrics::new()),
            config,
            shutdown_tx,
        };

        info!("Presence engine initialized");
        engine
    }

    /// Creates a new engine from application configuration, connecting
    /// the configured store backend.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let store = StoreManager::new(&config.store).await?;
        Ok(Self::new(Arc::new(store), config.engine.clone()))
    }

    /// Spawns the background listener and sweeper tasks.
    pub fn start(&self) {
        let retry = Duration::from_millis(self.config.listener_retry_ms);
        tokio::spawn(run_listener(
            self.store.clone(),
            self.subscriptions.clone(),
            self.delivery.clone(),
            self.metrics.clone(),
            retry,
            self.shutdown_tx.subscribe(),
        ));
        tokio::spawn(run_sweeper(
            self.store.clone(),
            self.config.clone(),
            self.metrics.clone(),
            self.shutdown_tx.subscribe(),
        ));

        info!("Presence engine started");
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the background tasks.
    pub fn shutdown(&self) {
        info!("Shutting down presence engine");
        let _ = self.shutdown_tx.send(());
    }

    /// Attach a local delivery sink for a client. The caller owns the
    /// returned receiver and drains it onto its transport.
    pub fn attach_sink(&self, client_id: &str) -> (Arc<ClientSink>, mpsc::Receiver<Envelope>) {
        self.delivery.attach(client_id)
    }

    /// Detach a client's local delivery sink.
    pub fn detach_sink(&self, client_id: &str) {
        self.delivery.detach(client_id);
    }

    /// Check that the backing store is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.store.health_check().await
    }
}

#[async_trait]
impl PresenceEngine for Engine {
    async fn create_client(&self) -> AppResult<String> {
        loop {
            let client_id = generate_client_id();
            if self.store.presence_score(&client_id).await?.is_some() {
                debug!(client_id, "Generated id already registered, retrying");
                continue;
            }
            self.store.record_ping(&client_id, epoch_seconds()).await?;
            self.metrics.clients_created.fetch_add(1, Ordering::Relaxed);
            debug!(client_id, "Created client");
            return Ok(client_id);
        }
    }

    async fn destroy_client(&self, client_id: &str) -> AppResult<()> {
        self.store.remove_client(client_id).await?;
        self.subscriptions.remove_client(client_id);
        self.delivery.detach(client_id);
        self.metrics
            .clients_destroyed
            .fetch_add(1, Ordering::Relaxed);
        debug!(client_id, "Destroyed client");
        Ok(())
    }

    async fn client_exists(&self, client_id: &str) -> AppResult<bool> {
        let score = self.store.presence_score(client_id).await?;
        Ok(score.is_some())
    }

    async fn ping(&self, client_id: &str) -> AppResult<()> {
        self.store.record_ping(client_id, epoch_seconds()).await
    }

    async fn subscribe(&self, client_id: &str, channel: &str) -> AppResult<()> {
        channel::validate_subscribable(channel)?;
        self.store.add_subscription(client_id, channel).await?;
        self.subscriptions.add(client_id, channel);
        debug!(client_id, channel, "Subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, client_id: &str, channel: &str) -> AppResult<()> {
        channel::validate_subscribable(channel)?;
        self.store.remove_subscription(client_id, channel).await?;
        self.subscriptions.remove(client_id, channel);
        debug!(client_id, channel, "Unsubscribed");
        Ok(())
    }

    async fn publish(&self, envelope: &Envelope) -> AppResult<()> {
        channel::validate_publishable(&envelope.channel)?;
        let payload = serde_json::to_string(envelope)?;

        for expansion in channel::expand(&envelope.channel) {
            self.store.publish(&expansion, &payload).await?;
        }

        self.metrics
            .messages_published
            .fetch_add(1, Ordering::Relaxed);
        debug!(channel = %envelope.channel, "Published envelope");
        Ok(())
    }
}
