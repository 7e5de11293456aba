//! Gossip wire envelope
//!
//! Every gossip datagram is a JSON-encoded UTF-8 envelope carrying one
//! content payload and the topics it belongs to. Messages and
//! identity-registry events travel on the primary topic; contact records on
//! the contact-info topic.

use crate::contact::ContactInfoContent;
use hub_model::{HubError, IdRegistryEvent, Message};
use serde::{Deserialize, Serialize};

const NETWORK_TOPIC_PRIMARY: &str = "f_network_topic_primary";
const NETWORK_TOPIC_CONTACT: &str = "f_network_topic_contact";

/// Topic carrying user messages and identity-registry events.
pub fn primary_topic() -> &'static str {
    NETWORK_TOPIC_PRIMARY
}

/// Topic carrying contact records.
pub fn contact_info_topic() -> &'static str {
    NETWORK_TOPIC_CONTACT
}

/// Gossip protocol version tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipVersion {
    V1,
}

/// Payload of a gossip envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipContent {
    Message(Message),
    IdRegistryEvent(IdRegistryEvent),
    ContactInfo(ContactInfoContent),
}

/// One gossip datagram.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipMessage {
    pub content: GossipContent,
    pub topics: Vec<String>,
    pub version: GossipVersion,
}

impl GossipMessage {
    /// Wrap a contact record for the contact-info topic.
    pub fn contact_info(contact: ContactInfoContent) -> Self {
        Self {
            content: GossipContent::ContactInfo(contact),
            topics: vec![contact_info_topic().to_string()],
            version: GossipVersion::V1,
        }
    }

    /// Wrap a message for the primary topic.
    pub fn message(message: Message) -> Self {
        Self {
            content: GossipContent::Message(message),
            topics: vec![primary_topic().to_string()],
            version: GossipVersion::V1,
        }
    }

    /// Wrap an identity-registry event for the primary topic.
    pub fn id_registry_event(event: IdRegistryEvent) -> Self {
        Self {
            content: GossipContent::IdRegistryEvent(event),
            topics: vec![primary_topic().to_string()],
            version: GossipVersion::V1,
        }
    }

    /// Encode as UTF-8 JSON bytes.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("gossip envelope serialization cannot fail")
    }

    /// Decode from UTF-8 JSON bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, HubError> {
        serde_json::from_slice(bytes)
            .map_err(|e| HubError::BadInput(format!("invalid gossip envelope: {}", e)))
    }
}
