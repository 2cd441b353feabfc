//! Fanout listener that relays store notifications to local sinks.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, warn};

use fanhub_core::message::Envelope;
use fanhub_core::traits::store::{PresenceStore, StoreEvent};

use crate::delivery::DeliveryTable;
use crate::metrics::EngineMetrics;
use crate::subscriptions::SubscriptionIndex;

/// Relay loop: consume the store's notification stream and push each
/// envelope to the local subscribers of its channel.
///
/// A terminated stream is re-established after a short backoff until the
/// shutdown broadcast fires. Remote subscribers are handled by their own
/// process's listener, so routing consults only the local index.
pub(crate) async fn run_listener(
    store: Arc<dyn PresenceStore>,
    subscriptions: Arc<SubscriptionIndex>,
    delivery: Arc<DeliveryTable>,
    metrics: Arc<EngineMetrics>,
    retry: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let mut stream = tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = store.listen() => match result {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "Failed to open notification stream, retrying");
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = time::sleep(retry) => continue,
                    }
                }
            },
        };

        debug!("Notification stream established");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                event = stream.next() => match event {
                    Some(event) => {
                        dispatch(&event, &subscriptions, &delivery, &metrics);
                    }
                    None => {
                        warn!("Notification stream ended, re-establishing");
                        break;
                    }
                },
            }
        }

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = time::sleep(retry) => {}
        }
    }

    debug!("Listener stopping");
}

/// Route one notification to every locally-subscribed client.
fn dispatch(
    event: &StoreEvent,
    subscriptions: &SubscriptionIndex,
    delivery: &DeliveryTable,
    metrics: &EngineMetrics,
) {
    let envelope: Envelope = match serde_json::from_str(&event.payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(channel = %event.channel, error = %e, "Dropping malformed envelope");
            return;
        }
    };

    for client_id in subscriptions.subscribers(&event.channel) {
        match delivery.get(&client_id) {
            Some(sink) => {
                if sink.deliver(envelope.clone()) {
                    metrics.inc_delivered();
                } else {
                    metrics.inc_dropped();
                }
            }
            // Subscribed but no sink attached right now.
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(channel: &str, payload: &str) -> StoreEvent {
        StoreEvent {
            channel: channel.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_dispatch_delivers_to_subscribed_sink() {
        let subscriptions = SubscriptionIndex::new();
        let delivery = DeliveryTable::new(4);
        let metrics = EngineMetrics::new();

        subscriptions.add("c1", "/foo");
        let (_sink, mut rx) = delivery.attach("c1");

        let payload = serde_json::to_string(&Envelope::new("/foo", json!({"n": 1}))).unwrap();
        dispatch(&event("/foo", &payload), &subscriptions, &delivery, &metrics);

        assert_eq!(rx.try_recv().unwrap().channel, "/foo");
        assert_eq!(metrics.snapshot().messages_delivered, 1);
    }

    #[test]
    fn test_dispatch_skips_unsubscribed_clients() {
        let subscriptions = SubscriptionIndex::new();
        let delivery = DeliveryTable::new(4);
        let metrics = EngineMetrics::new();

        subscriptions.add("c1", "/foo");
        let (_sink, mut rx) = delivery.attach("c1");

        let payload = serde_json::to_string(&Envelope::new("/bar", json!(1))).unwrap();
        dispatch(&event("/bar", &payload), &subscriptions, &delivery, &metrics);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dispatch_drops_malformed_payload() {
        let subscriptions = SubscriptionIndex::new();
        let delivery = DeliveryTable::new(4);
        let metrics = EngineMetrics::new();

        subscriptions.add("c1", "/foo");
        let (_sink, mut rx) = delivery.attach("c1");

        dispatch(
            &event("/foo", "{not json"),
            &subscriptions,
            &delivery,
            &metrics,
        );

        assert!(rx.try_recv().is_err());
        assert_eq!(metrics.snapshot().messages_delivered, 0);
    }

    #[test]
    fn test_dispatch_without_sink_is_silent() {
        let subscriptions = SubscriptionIndex::new();
        let delivery = DeliveryTable::new(4);
        let metrics = EngineMetrics::new();

        subscriptions.add("c1", "/foo");

        let payload = serde_json::to_string(&Envelope::new("/foo", json!(1))).unwrap();
        dispatch(&event("/foo", &payload), &subscriptions, &delivery, &metrics);

        assert_eq!(metrics.snapshot().messages_delivered, 0);
        assert_eq!(metrics.snapshot().messages_dropped, 0);
    }
}
