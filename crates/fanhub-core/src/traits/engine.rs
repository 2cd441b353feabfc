//! Engine contract the surrounding server codes against.

use async_trait::async_trait;

use crate::message::Envelope;
use crate::result::AppResult;

/// The presence-and-fanout engine operations.
///
/// The surrounding server (wire protocol, HTTP/WebSocket transport) calls
/// these; everything behind them is engine-internal.
#[async_trait]
pub trait PresenceEngine: Send + Sync + 'static {
    /// Register a brand-new client and return its id.
    async fn create_client(&self) -> AppResult<String>;

    /// Remove a client and all of its subscriptions.
    async fn destroy_client(&self, client_id: &str) -> AppResult<()>;

    /// Whether the client is currently registered. Staleness is resolved
    /// only by the reconciliation sweep, never here.
    async fn client_exists(&self, client_id: &str) -> AppResult<bool>;

    /// Refresh a client's last-seen time.
    async fn ping(&self, client_id: &str) -> AppResult<()>;

    /// Subscribe a client to a channel or channel pattern.
    async fn subscribe(&self, client_id: &str, channel: &str) -> AppResult<()>;

    /// Remove a client's subscription to a channel or channel pattern.
    async fn unsubscribe(&self, client_id: &str, channel: &str) -> AppResult<()>;

    /// Publish an envelope to every matching subscriber across all
    /// cooperating processes. Fire-and-forget: delivery is not awaited.
    async fn publish(&self, envelope: &Envelope) -> AppResult<()>;
}
