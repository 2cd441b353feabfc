//! Delivery table tracking all locally-attached client sinks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use fanhub_core::message::Envelope;

use super::sink::ClientSink;

/// Thread-safe table of delivery sinks indexed by client id.
#[derive(Debug)]
pub struct DeliveryTable {
    /// Client id → delivery sink.
    sinks: DashMap<String, Arc<ClientSink>>,
    /// Capacity of each sink's delivery queue.
    buffer_size: usize,
}

impl DeliveryTable {
    /// Creates a new empty delivery table.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            sinks: DashMap::new(),
            buffer_size,
        }
    }

    /// Attach a sink for a client, returning the sink and the receiver
    /// side of its delivery queue. An existing sink for the same client
    /// is replaced and marked dead.
    pub fn attach(&self, client_id: &str) -> (Arc<ClientSink>, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let sink = Arc::new(ClientSink::new(client_id, tx));
        if let Some(previous) = self.sinks.insert(client_id.to_string(), sink.clone()) {
            previous.mark_dead();
        }
        (sink, rx)
    }

    /// Detach a client's sink, marking it dead.
    pub fn detach(&self, client_id: &str) -> Option<Arc<ClientSink>> {
        let (_, sink) = self.sinks.remove(client_id)?;
        sink.mark_dead();
        Some(sink)
    }

    /// Look up the sink for a client.
    pub fn get(&self, client_id: &str) -> Option<Arc<ClientSink>> {
        self.sinks.get(client_id).map(|entry| entry.value().clone())
    }

    /// Number of attached sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no sinks are attached.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
