//! Store manager that dispatches to the configured backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use fanhub_core::config::store::StoreConfig;
use fanhub_core::error::AppError;
use fanhub_core::result::AppResult;
use fanhub_core::traits::store::{EvictionTransaction, PresenceStore, StoreEventStream};

/// Store manager that wraps the configured presence store backend.
///
/// The backend is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner presence store.
    inner: Arc<dyn PresenceStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn PresenceStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis presence store");
                let client = crate::redis::RedisClient::connect(config).await?;
                let store = crate::redis::RedisPresenceStore::new(client);
                Arc::new(store)
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory presence store");
                Arc::new(crate::memory::MemoryStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn PresenceStore>) -> Self {
        Self { inner: store }
    }

    /// Get a reference to the inner store.
    pub fn store(&self) -> &dyn PresenceStore {
        self.inner.as_ref()
    }
}

#[async_trait]
impl PresenceStore for StoreManager {
    async fn record_ping(&self, client_id: &str, seen_at: f64) -> AppResult<()> {
        self.inner.record_ping(client_id, seen_at).await
    }

    async fn presence_score(&self, client_id: &str) -> AppResult<Option<f64>> {
        self.inner.presence_score(client_id).await
    }

    async fn remove_client(&self, client_id: &str) -> AppResult<()> {
        self.inner.remove_client(client_id).await
    }

    async fn add_subscription(&self, client_id: &str, channel: &str) -> AppResult<()> {
        self.inner.add_subscription(client_id, channel).await
    }

    async fn remove_subscription(&self, client_id: &str, channel: &str) -> AppResult<()> {
        self.inner.remove_subscription(client_id, channel).await
    }

    async fn channel_subscribers(&self, channel: &str) -> AppResult<Vec<String>> {
        self.inner.channel_subscribers(channel).await
    }

    async fn client_subscriptions(&self, client_id: &str) -> AppResult<Vec<String>> {
        self.inner.client_subscriptions(client_id).await
    }

    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
        self.inner.publish(channel, payload).await
    }

    async fn last_sweep_at(&self) -> AppResult<Option<f64>> {
        self.inner.last_sweep_at().await
    }

    async fn mark_sweep(&self, swept_at: f64) -> AppResult<()> {
        self.inner.mark_sweep(swept_at).await
    }

    async fn begin_eviction(&self) -> AppResult<Box<dyn EvictionTransaction>> {
        self.inner.begin_eviction().await
    }

    async fn listen(&self) -> AppResult<StoreEventStream> {
        self.inner.listen().await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;

    fn memory_config() -> StoreConfig {
        StoreConfig {
            provider: "memory".to_string(),
            ..StoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_memory_provider_selected() {
        let manager = StoreManager::new(&memory_config()).await.unwrap();
        assert!(manager.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let config = StoreConfig {
            provider: "etcd".to_string(),
            ..StoreConfig::default()
        };
        let err = StoreManager::new(&config).await.unwrap_err();
        assert!(err.to_string().contains("Unknown store provider"));
    }

    #[tokio::test]
    async fn test_manager_delegates_to_inner() {
        let manager = StoreManager::new(&memory_config()).await.unwrap();
        manager.record_ping("abc", 10.0).await.unwrap();
        assert_eq!(manager.presence_score("abc").await.unwrap(), Some(10.0));
    }
}
