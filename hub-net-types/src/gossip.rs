//! Gossip layer abstraction
//!
//! Pure transport-level gossip: subscribe to topics and exchange raw bytes.
//! Envelope encoding/decoding and sync decisions live with the callers.

use tokio::sync::broadcast;

/// Error type for gossip operations.
#[derive(Debug, thiserror::Error)]
pub enum GossipError {
    #[error("Subscribe failed: {0}")]
    Subscribe(String),
    #[error("Broadcast failed: {0}")]
    Broadcast(String),
}

/// Pure transport-level gossip interface.
///
/// Implementations deal only with raw bytes and peer connectivity; they
/// never inspect envelopes.
#[async_trait::async_trait]
pub trait GossipLayer: Send + Sync + 'static {
    /// Subscribe to a gossip topic.
    /// Returns a receiver of (sender_peer_id, raw_message_bytes).
    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<broadcast::Receiver<(String, Vec<u8>)>, GossipError>;

    /// Broadcast raw bytes to all peers on a topic.
    async fn broadcast(&self, topic: &str, data: Vec<u8>) -> Result<(), GossipError>;

    /// Shut down the gossip layer.
    async fn shutdown(&self);
}
