//! Optimistic eviction transaction over WATCH/MULTI/EXEC.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use fanhub_core::error::{AppError, ErrorKind};
use fanhub_core::result::AppResult;
use fanhub_core::traits::store::EvictionTransaction;

use crate::keys::Keyspace;

/// Eviction transaction bound to a dedicated connection.
///
/// The connection was put in WATCH state on the presence registry and the
/// sweep stamp before this value was constructed. Reads issued here happen
/// under that watch; `commit` runs MULTI/EXEC on the same connection, and
/// a nil EXEC reply reports the lost race.
pub struct RedisEvictionTransaction {
    conn: MultiplexedConnection,
    keys: Keyspace,
}

impl RedisEvictionTransaction {
    /// Wrap a connection already holding the WATCH.
    pub fn new(conn: MultiplexedConnection, keys: Keyspace) -> Self {
        Self { conn, keys }
    }

    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Store, format!("Redis error: {e}"), e)
    }
}

impl std::fmt::Debug for RedisEvictionTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEvictionTransaction")
            .field("keys", &self.keys)
            .finish()
    }
}

#[async_trait]
impl EvictionTransaction for RedisEvictionTransaction {
    async fn stale_clients(&mut self, cutoff: f64) -> AppResult<Vec<String>> {
        let key = self.keys.clients();
        let clients: Vec<String> = self
            .conn
            .zrangebyscore(&key, 0f64, cutoff)
            .await
            .map_err(Self::map_err)?;
        Ok(clients)
    }

    async fn channels(&mut self) -> AppResult<Vec<String>> {
        let pattern = self.keys.channel_pattern();
        let channel_keys: Vec<String> = redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut self.conn)
            .await
            .map_err(Self::map_err)?;

        Ok(channel_keys
            .iter()
            .filter_map(|key| self.keys.logical_channel(key))
            .map(str::to_string)
            .collect())
    }

    async fn commit(
        &mut self,
        candidates: &[String],
        channels: &[String],
        cutoff: f64,
        swept_at: f64,
    ) -> AppResult<bool> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.zrembyscore(self.keys.clients(), 0f64, cutoff).ignore();
        for channel in channels {
            pipe.srem(self.keys.channel(channel), candidates).ignore();
        }
        for client_id in candidates {
            pipe.del(self.keys.client_channels(client_id)).ignore();
        }
        pipe.set(self.keys.last_sweep(), swept_at).ignore();

        // EXEC replies nil when a watched key changed.
        let result: Option<()> = pipe
            .query_async(&mut self.conn)
            .await
            .map_err(Self::map_err)?;
        Ok(result.is_some())
    }

    async fn abort(&mut self) -> AppResult<()> {
        redis::cmd("UNWATCH")
            .query_async::<()>(&mut self.conn)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
