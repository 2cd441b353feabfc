//! Store key construction for all FanHub state.
//!
//! Centralising key construction prevents typos and makes it easy to find
//! every key the engine uses. Every key and pub/sub topic carries the
//! configured namespace so unrelated deployments can share one store.

/// Derives namespaced store keys and pub/sub topics.
#[derive(Debug, Clone)]
pub struct Keyspace {
    namespace: String,
}

impl Keyspace {
    /// Create a keyspace rooted at the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The configured namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Scored set of all registered clients (score = last-seen epoch
    /// seconds).
    pub fn clients(&self) -> String {
        format!("{}/clients", self.namespace)
    }

    /// Set of channels a client is subscribed to.
    pub fn client_channels(&self, client_id: &str) -> String {
        format!("{}/clients/{client_id}", self.namespace)
    }

    /// Set of client ids subscribed to a channel. Also the pub/sub topic
    /// for that channel.
    pub fn channel(&self, channel: &str) -> String {
        format!("{}/channels{channel}", self.namespace)
    }

    /// Scalar holding the epoch seconds of the last completed sweep.
    pub fn last_sweep(&self) -> String {
        format!("{}/last_gc", self.namespace)
    }

    /// Pattern matching every channel key and topic in the namespace.
    pub fn channel_pattern(&self) -> String {
        format!("{}/channels/*", self.namespace)
    }

    /// Recover the logical channel from a channel key or topic, or `None`
    /// when the name does not belong to this namespace.
    pub fn logical_channel<'a>(&self, key: &'a str) -> Option<&'a str> {
        let prefix = format!("{}/channels", self.namespace);
        match key.strip_prefix(prefix.as_str()) {
            Some(channel) if channel.starts_with('/') => Some(channel),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyspace() -> Keyspace {
        Keyspace::new("faye")
    }

    #[test]
    fn test_clients_key() {
        assert_eq!(keyspace().clients(), "faye/clients");
    }

    #[test]
    fn test_client_channels_key() {
        assert_eq!(
            keyspace().client_channels("abc123"),
            "faye/clients/abc123"
        );
    }

    #[test]
    fn test_channel_key() {
        assert_eq!(keyspace().channel("/foo/bar"), "faye/channels/foo/bar");
    }

    #[test]
    fn test_last_sweep_key() {
        assert_eq!(keyspace().last_sweep(), "faye/last_gc");
    }

    #[test]
    fn test_channel_pattern() {
        assert_eq!(keyspace().channel_pattern(), "faye/channels/*");
    }

    #[test]
    fn test_logical_channel_roundtrip() {
        let ks = keyspace();
        let key = ks.channel("/foo/bar");
        assert_eq!(ks.logical_channel(&key), Some("/foo/bar"));
    }

    #[test]
    fn test_logical_channel_rejects_foreign_namespace() {
        assert_eq!(keyspace().logical_channel("other/channels/foo"), None);
    }

    #[test]
    fn test_logical_channel_rejects_sibling_key() {
        assert_eq!(keyspace().logical_channel("faye/clients/abc"), None);
    }
}
