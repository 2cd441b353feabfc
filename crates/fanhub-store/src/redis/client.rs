//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use fanhub_core::config::store::StoreConfig;
use fanhub_core::error::{AppError, ErrorKind};
use fanhub_core::result::AppResult;

use crate::keys::Keyspace;

/// Redis client wrapper with connection management.
///
/// Holds one shared [`ConnectionManager`] for request/response commands.
/// Pub/sub and WATCH state are connection-scoped in the Redis protocol, so
/// the listener and the eviction transaction open dedicated connections
/// through [`RedisClient::raw`].
#[derive(Debug, Clone)]
pub struct RedisClient {
    /// Underlying client, used to open dedicated connections.
    client: Client,
    /// Shared connection manager (pooled, reconnecting).
    conn: ConnectionManager,
    /// Namespaced key builder.
    keys: Keyspace,
}

impl RedisClient {
    /// Create a new Redis client from configuration.
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let url = config.redis.url();
        info!(url = %mask_redis_url(&url), "Connecting to Redis");

        let client = Client::open(url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Store, "Failed to create Redis client", e)
        })?;

        let conn = ConnectionManager::new(client.clone()).await.map_err(|e| {
            AppError::with_source(ErrorKind::Store, "Failed to connect to Redis", e)
        })?;

        info!("Successfully connected to Redis");
        Ok(Self {
            client,
            conn,
            keys: Keyspace::new(config.namespace.clone()),
        })
    }

    /// Get a mutable clone of the shared connection manager.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Get the underlying client for opening dedicated connections.
    pub fn raw(&self) -> &Client {
        &self.client
    }

    /// Get the namespaced key builder.
    pub fn keys(&self) -> &Keyspace {
        &self.keys
    }
}

/// Mask password in Redis URL for safe logging.
fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
