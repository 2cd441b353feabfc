//! Per-client delivery sink.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::warn;

use fanhub_core::message::Envelope;

/// A handle for pushing envelopes to one locally-connected client.
///
/// Holds the bounded sender side of the client's delivery queue plus a
/// liveness flag. The connection handler owns the receiver side and
/// drains it onto the wire.
#[derive(Debug)]
pub struct ClientSink {
    /// Client this sink delivers to.
    client_id: String,
    /// Sender for queued envelopes.
    sender: mpsc::Sender<Envelope>,
    /// Whether the receiving side is still attached.
    alive: AtomicBool,
}

impl ClientSink {
    /// Create a new sink around a delivery queue sender.
    pub fn new(client_id: impl Into<String>, sender: mpsc::Sender<Envelope>) -> Self {
        Self {
            client_id: client_id.into(),
            sender,
            alive: AtomicBool::new(true),
        }
    }

    /// Client id this sink belongs to.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Queue an envelope for delivery. Returns `false` when the envelope
    /// was dropped: full buffers drop the message, a closed receiver
    /// marks the sink dead.
    pub fn deliver(&self, envelope: Envelope) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(envelope) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    client_id = %self.client_id,
                    "Delivery buffer full, dropping envelope"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if the sink is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the sink as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deliver_reaches_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ClientSink::new("c1", tx);

        assert!(sink.deliver(Envelope::new("/foo", json!(1))));
        let received = rx.try_recv().unwrap();
        assert_eq!(received.channel, "/foo");
    }

    #[test]
    fn test_full_buffer_drops_without_killing_sink() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = ClientSink::new("c1", tx);

        assert!(sink.deliver(Envelope::new("/foo", json!(1))));
        assert!(!sink.deliver(Envelope::new("/foo", json!(2))));
        assert!(sink.is_alive());
    }

    #[test]
    fn test_closed_receiver_marks_dead() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = ClientSink::new("c1", tx);

        assert!(!sink.deliver(Envelope::new("/foo", json!(1))));
        assert!(!sink.is_alive());
    }
}
