//! Presence store trait for pluggable backing stores.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::result::AppResult;

/// A notification received from the store's pub/sub side.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// Logical channel the payload was published on (namespace stripped).
    pub channel: String,
    /// Serialized envelope payload.
    pub payload: String,
}

/// Stream of pub/sub notifications from the store.
pub type StoreEventStream = BoxStream<'static, StoreEvent>;

/// Trait for presence store backends (Redis or in-memory).
///
/// The store holds three kinds of shared state: a time-scored presence
/// registry, bidirectional client/channel membership sets, and the last
/// completed sweep stamp. All timestamps are epoch seconds. The store is
/// shared by every cooperating server process and is never assumed
/// exclusively owned.
#[async_trait]
pub trait PresenceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Record that a client was seen at `seen_at`. Upserts the score,
    /// creating the registry entry when absent.
    async fn record_ping(&self, client_id: &str, seen_at: f64) -> AppResult<()>;

    /// Last-seen score for a client, or `None` when the client is not
    /// registered.
    async fn presence_score(&self, client_id: &str) -> AppResult<Option<f64>>;

    /// Remove a client entirely: its registry entry, its channel index
    /// set, and its membership in every channel set, in one atomic batch.
    async fn remove_client(&self, client_id: &str) -> AppResult<()>;

    /// Add a client/channel membership to both sides of the index in one
    /// atomic batch. Idempotent.
    async fn add_subscription(&self, client_id: &str, channel: &str) -> AppResult<()>;

    /// Remove a client/channel membership from both sides of the index in
    /// one atomic batch. Idempotent.
    async fn remove_subscription(&self, client_id: &str, channel: &str) -> AppResult<()>;

    /// All client ids subscribed to a channel.
    async fn channel_subscribers(&self, channel: &str) -> AppResult<Vec<String>>;

    /// All channels a client is subscribed to.
    async fn client_subscriptions(&self, client_id: &str) -> AppResult<Vec<String>>;

    /// Publish a payload on a channel topic, reaching the listener of
    /// every cooperating process.
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()>;

    /// Epoch seconds of the last completed sweep, or `None` when no sweep
    /// has run yet.
    async fn last_sweep_at(&self) -> AppResult<Option<f64>>;

    /// Record `swept_at` as the last completed sweep stamp,
    /// unconditionally.
    async fn mark_sweep(&self, swept_at: f64) -> AppResult<()>;

    /// Open an optimistic eviction transaction guarding the presence
    /// registry and the sweep stamp.
    async fn begin_eviction(&self) -> AppResult<Box<dyn EvictionTransaction>>;

    /// Open a long-lived subscription to every channel topic in the
    /// namespace. The stream ends when the underlying connection is lost;
    /// callers re-listen to resume.
    async fn listen(&self) -> AppResult<StoreEventStream>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// An optimistic transaction over the presence registry and sweep stamp.
///
/// Created by [`PresenceStore::begin_eviction`]. Reads performed through
/// the transaction happen under the store's conflict watch; `commit`
/// applies the eviction only if neither guarded key changed since `begin`,
/// reporting a lost race as `Ok(false)` rather than an error. Exactly one
/// of `commit` or `abort` must be called.
#[async_trait]
pub trait EvictionTransaction: Send {
    /// Client ids whose last-seen score is at or below `cutoff`.
    async fn stale_clients(&mut self, cutoff: f64) -> AppResult<Vec<String>>;

    /// Every channel that currently has at least one subscriber.
    async fn channels(&mut self) -> AppResult<Vec<String>>;

    /// Atomically evict every client scored at or below `cutoff`, remove
    /// the given candidates from the given channel sets and drop their
    /// index sets, and record `swept_at`. Returns `false` when a
    /// concurrent modification voided the transaction.
    async fn commit(
        &mut self,
        candidates: &[String],
        channels: &[String],
        cutoff: f64,
        swept_at: f64,
    ) -> AppResult<bool>;

    /// Discard the transaction without applying anything.
    async fn abort(&mut self) -> AppResult<()>;
}
