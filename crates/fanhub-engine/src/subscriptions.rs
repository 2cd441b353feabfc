//! Local subscription index.
//!
//! Mirrors the store-side membership sets for clients served by this
//! process. The listener consults only this index when routing a
//! notification, so remote subscribers never cause local lookups.

use std::collections::HashSet;

use dashmap::DashMap;

/// Bidirectional client/channel index for locally-served clients.
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    /// Channel name → subscribed client ids.
    channel_clients: DashMap<String, HashSet<String>>,
    /// Client id → subscribed channel names.
    client_channels: DashMap<String, HashSet<String>>,
}

impl SubscriptionIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            channel_clients: DashMap::new(),
            client_channels: DashMap::new(),
        }
    }

    /// Records a subscription on both sides. Idempotent.
    pub fn add(&self, client_id: &str, channel: &str) {
        self.channel_clients
            .entry(channel.to_string())
            .or_default()
            .insert(client_id.to_string());
        self.client_channels
            .entry(client_id.to_string())
            .or_default()
            .insert(channel.to_string());
    }

    /// Removes a subscription from both sides. Idempotent.
    pub fn remove(&self, client_id: &str, channel: &str) {
        if let Some(mut clients) = self.channel_clients.get_mut(channel) {
            clients.remove(client_id);
            if clients.is_empty() {
                drop(clients);
                self.channel_clients.remove(channel);
            }
        }
        if let Some(mut channels) = self.client_channels.get_mut(client_id) {
            channels.remove(channel);
            if channels.is_empty() {
                drop(channels);
                self.client_channels.remove(client_id);
            }
        }
    }

    /// Removes every subscription for a client, returning the channels it
    /// held.
    pub fn remove_client(&self, client_id: &str) -> HashSet<String> {
        let channels = self
            .client_channels
            .remove(client_id)
            .map(|(_, channels)| channels)
            .unwrap_or_default();

        for channel in &channels {
            if let Some(mut clients) = self.channel_clients.get_mut(channel) {
                clients.remove(client_id);
                if clients.is_empty() {
                    drop(clients);
                    self.channel_clients.remove(channel);
                }
            }
        }

        channels
    }

    /// All local client ids subscribed to a channel.
    pub fn subscribers(&self, channel: &str) -> Vec<String> {
        self.channel_clients
            .get(channel)
            .map(|entry| entry.value().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All channels a local client is subscribed to.
    pub fn channels_of(&self, client_id: &str) -> Vec<String> {
        self.client_channels
            .get(client_id)
            .map(|entry| entry.value().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of channels with at least one local subscriber.
    pub fn channel_count(&self) -> usize {
        self.channel_clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup_both_sides() {
        let index = SubscriptionIndex::new();
        index.add("c1", "/foo");
        index.add("c2", "/foo");
        index.add("c1", "/bar/*");

        let mut subs = index.subscribers("/foo");
        subs.sort();
        assert_eq!(subs, vec!["c1", "c2"]);

        let mut channels = index.channels_of("c1");
        channels.sort();
        assert_eq!(channels, vec!["/bar/*", "/foo"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let index = SubscriptionIndex::new();
        index.add("c1", "/foo");
        index.add("c1", "/foo");
        assert_eq!(index.subscribers("/foo").len(), 1);
    }

    #[test]
    fn test_remove_clears_empty_entries() {
        let index = SubscriptionIndex::new();
        index.add("c1", "/foo");
        index.remove("c1", "/foo");

        assert!(index.subscribers("/foo").is_empty());
        assert!(index.channels_of("c1").is_empty());
        assert_eq!(index.channel_count(), 0);
    }

    #[test]
    fn test_remove_client_clears_all_channels() {
        let index = SubscriptionIndex::new();
        index.add("c1", "/foo");
        index.add("c1", "/bar");
        index.add("c2", "/foo");

        let removed = index.remove_client("c1");
        assert_eq!(removed.len(), 2);
        assert_eq!(index.subscribers("/foo"), vec!["c2"]);
        assert!(index.subscribers("/bar").is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let index = SubscriptionIndex::new();
        index.remove("ghost", "/foo");
        assert!(index.remove_client("ghost").is_empty());
    }
}
