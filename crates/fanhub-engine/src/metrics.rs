//! Engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug)]
pub struct EngineMetrics {
    /// Total clients registered
    pub clients_created: AtomicU64,
    /// Total clients explicitly destroyed
    pub clients_destroyed: AtomicU64,
    /// Total envelopes published
    pub messages_published: AtomicU64,
    /// Total envelopes handed to local sinks
    pub messages_delivered: AtomicU64,
    /// Total envelopes dropped (full or dead sinks)
    pub messages_dropped: AtomicU64,
    /// Total sweeps that evicted at least one client
    pub sweeps_completed: AtomicU64,
    /// Total sweeps lost to a concurrent writer
    pub sweeps_conflicted: AtomicU64,
    /// Total clients evicted by sweeps
    pub clients_evicted: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self {
            clients_created: AtomicU64::new(0),
            clients_destroyed: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            sweeps_completed: AtomicU64::new(0),
            sweeps_conflicted: AtomicU64::new(0),
            clients_evicted: AtomicU64::new(0),
        }
    }

    /// Increment the delivered counter
    pub fn inc_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the dropped counter
    pub fn inc_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            clients_created: self.clients_created.load(Ordering::Relaxed),
            clients_destroyed: self.clients_destroyed.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
            sweeps_conflicted: self.sweeps_conflicted.load(Ordering::Relaxed),
            clients_evicted: self.clients_evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total clients registered
    pub clients_created: u64,
    /// Total clients explicitly destroyed
    pub clients_destroyed: u64,
    /// Total envelopes published
    pub messages_published: u64,
    /// Total envelopes handed to local sinks
    pub messages_delivered: u64,
    /// Total envelopes dropped
    pub messages_dropped: u64,
    /// Total sweeps that evicted clients
    pub sweeps_completed: u64,
    /// Total sweeps lost to a concurrent writer
    pub sweeps_conflicted: u64,
    /// Total clients evicted by sweeps
    pub clients_evicted: u64,
}
