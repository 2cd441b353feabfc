//! Redis presence store implementation.

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use tracing::{debug, warn};

use fanhub_core::error::{AppError, ErrorKind};
use fanhub_core::result::AppResult;
use fanhub_core::traits::store::{
    EvictionTransaction, PresenceStore, StoreEvent, StoreEventStream,
};

use super::client::RedisClient;
use super::transaction::RedisEvictionTransaction;

/// Redis-backed presence store.
///
/// Request/response commands go through the shared connection manager.
/// `listen` and `begin_eviction` open dedicated connections because
/// pub/sub mode and WATCH state are per-connection in the Redis protocol.
#[derive(Debug, Clone)]
pub struct RedisPresenceStore {
    /// Redis client.
    client: RedisClient,
}

impl RedisPresenceStore {
    /// Create a new Redis presence store.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Store, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn record_ping(&self, client_id: &str, seen_at: f64) -> AppResult<()> {
        let key = self.client.keys().clients();
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .zadd(&key, client_id, seen_at)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn presence_score(&self, client_id: &str) -> AppResult<Option<f64>> {
        let key = self.client.keys().clients();
        let mut conn = self.client.conn_mut();
        let score: Option<f64> = conn.zscore(&key, client_id).await.map_err(Self::map_err)?;
        Ok(score)
    }

    async fn remove_client(&self, client_id: &str) -> AppResult<()> {
        let keys = self.client.keys();
        let mut conn = self.client.conn_mut();

        let channels: Vec<String> = conn
            .smembers(keys.client_channels(client_id))
            .await
            .map_err(Self::map_err)?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.zrem(keys.clients(), client_id).ignore();
        pipe.del(keys.client_channels(client_id)).ignore();
        for channel in &channels {
            pipe.srem(keys.channel(channel), client_id).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(Self::map_err)?;

        debug!(client_id, channels = channels.len(), "Removed client");
        Ok(())
    }

    async fn add_subscription(&self, client_id: &str, channel: &str) -> AppResult<()> {
        let keys = self.client.keys();
        let mut conn = self.client.conn_mut();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.sadd(keys.client_channels(client_id), channel).ignore();
        pipe.sadd(keys.channel(channel), client_id).ignore();
        let _: () = pipe.query_async(&mut conn).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn remove_subscription(&self, client_id: &str, channel: &str) -> AppResult<()> {
        let keys = self.client.keys();
        let mut conn = self.client.conn_mut();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.srem(keys.client_channels(client_id), channel).ignore();
        pipe.srem(keys.channel(channel), client_id).ignore();
        let _: () = pipe.query_async(&mut conn).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn channel_subscribers(&self, channel: &str) -> AppResult<Vec<String>> {
        let key = self.client.keys().channel(channel);
        let mut conn = self.client.conn_mut();
        let members: Vec<String> = conn.smembers(&key).await.map_err(Self::map_err)?;
        Ok(members)
    }

    async fn client_subscriptions(&self, client_id: &str) -> AppResult<Vec<String>> {
        let key = self.client.keys().client_channels(client_id);
        let mut conn = self.client.conn_mut();
        let members: Vec<String> = conn.smembers(&key).await.map_err(Self::map_err)?;
        Ok(members)
    }

    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
        let topic = self.client.keys().channel(channel);
        let mut conn = self.client.conn_mut();
        let _: i64 = conn.publish(&topic, payload).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn last_sweep_at(&self) -> AppResult<Option<f64>> {
        let key = self.client.keys().last_sweep();
        let mut conn = self.client.conn_mut();
        let stamp: Option<f64> = conn.get(&key).await.map_err(Self::map_err)?;
        Ok(stamp)
    }

    async fn mark_sweep(&self, swept_at: f64) -> AppResult<()> {
        let key = self.client.keys().last_sweep();
        let mut conn = self.client.conn_mut();
        let _: () = conn.set(&key, swept_at).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn begin_eviction(&self) -> AppResult<Box<dyn EvictionTransaction>> {
        // WATCH state lives on the connection, so the shared manager
        // cannot carry it.
        let mut conn = self
            .client
            .raw()
            .get_multiplexed_async_connection()
            .await
            .map_err(Self::map_err)?;

        let keys = self.client.keys();
        redis::cmd("WATCH")
            .arg(keys.clients())
            .arg(keys.last_sweep())
            .query_async::<()>(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(Box::new(RedisEvictionTransaction::new(conn, keys.clone())))
    }

    async fn listen(&self) -> AppResult<StoreEventStream> {
        let mut pubsub = self
            .client
            .raw()
            .get_async_pubsub()
            .await
            .map_err(Self::map_err)?;

        let pattern = self.client.keys().channel_pattern();
        pubsub.psubscribe(&pattern).await.map_err(Self::map_err)?;
        debug!(pattern, "Pattern subscription established");

        let keys = self.client.keys().clone();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let keys = keys.clone();
            async move {
                let channel = keys.logical_channel(msg.get_channel_name())?.to_string();
                match msg.get_payload::<String>() {
                    Ok(payload) => Some(StoreEvent { channel, payload }),
                    Err(e) => {
                        warn!(channel, error = %e, "Dropping undecodable pub/sub payload");
                        None
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
