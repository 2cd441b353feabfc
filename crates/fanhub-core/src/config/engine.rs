//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Presence-and-fanout engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between reconciliation sweep attempts.
    #[serde(default = "default_gc_interval")]
    pub gc_interval_seconds: u64,
    /// Client liveness timeout in seconds, supplied by the surrounding
    /// server. Clients silent for more than twice this value are evicted.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Capacity of each client delivery sink buffer.
    #[serde(default = "default_sink_buffer")]
    pub sink_buffer_size: usize,
    /// Milliseconds to wait before re-establishing a lost listener stream.
    #[serde(default = "default_listener_retry")]
    pub listener_retry_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gc_interval_seconds: default_gc_interval(),
            timeout_seconds: default_timeout(),
            sink_buffer_size: default_sink_buffer(),
            listener_retry_ms: default_listener_retry(),
        }
    }
}

fn default_gc_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    60
}

fn default_sink_buffer() -> usize {
    64
}

fn default_listener_retry() -> u64 {
    1000
}
