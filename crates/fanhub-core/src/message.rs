//! Message envelope published through the store and handed to delivery
//! sinks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A published message with its routing metadata.
///
/// Envelopes are serialized to JSON for the store pub/sub hop and
/// deserialized again by each process's listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Channel the message was published on.
    pub channel: String,
    /// Application payload.
    pub data: Value,
    /// Publishing client, when known.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "clientId")]
    pub client_id: Option<String>,
    /// Message id assigned by the publisher, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Envelope {
    /// Create an envelope for a channel publication.
    pub fn new(channel: impl Into<String>, data: Value) -> Self {
        Self {
            channel: channel.into(),
            data,
            client_id: None,
            id: None,
        }
    }

    /// Attach the publishing client id.
    pub fn from_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Attach a publisher-assigned message id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
