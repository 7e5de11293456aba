//! SimGossip - in-memory GossipLayer implementation
//!
//! Uses `tokio::sync::broadcast` for per-topic raw-bytes propagation. A
//! shared [`SimGossipNetwork`] broker connects multiple [`SimGossip`]
//! instances, one per simulated hub. Subscribers never see their own
//! broadcasts.

use hub_net_types::{GossipError, GossipLayer};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Shared broker - routes raw bytes between SimGossip instances.
///
/// Each topic gets a broadcast channel; every node subscribed to that topic
/// shares it, simulating gossip propagation.
#[derive(Clone, Debug, Default)]
pub struct SimGossipNetwork {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<(String, Vec<u8>)>>>>,
}

impl SimGossipNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the broadcast channel for a topic.
    async fn get_or_create(&self, topic: &str) -> broadcast::Sender<(String, Vec<u8>)> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }
}

/// In-memory gossip layer belonging to one simulated hub.
pub struct SimGossip {
    peer_id: String,
    network: SimGossipNetwork,
    topic_tokens: Mutex<HashMap<String, tokio_util::sync::CancellationToken>>,
    topic_senders: Mutex<HashMap<String, broadcast::Sender<(String, Vec<u8>)>>>,
}

impl SimGossip {
    pub fn new(peer_id: &str, network: &SimGossipNetwork) -> Self {
        Self {
            peer_id: peer_id.to_string(),
            network: network.clone(),
            topic_tokens: Mutex::new(HashMap::new()),
            topic_senders: Mutex::new(HashMap::new()),
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }
}

#[async_trait::async_trait]
impl GossipLayer for SimGossip {
    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<broadcast::Receiver<(String, Vec<u8>)>, GossipError> {
        // Tear down an existing subscription for the topic, if any.
        if let Some(token) = self.topic_tokens.lock().await.remove(topic) {
            token.cancel();
        }

        let sender = self.network.get_or_create(topic).await;
        let mut receiver = sender.subscribe();
        let peer_id = self.peer_id.clone();

        let token = tokio_util::sync::CancellationToken::new();
        self.topic_tokens
            .lock()
            .await
            .insert(topic.to_string(), token.clone());
        self.topic_senders
            .lock()
            .await
            .insert(topic.to_string(), sender);

        // Inbound channel: route incoming bytes, skip our own messages.
        let (inbound_tx, inbound_rx) = broadcast::channel(256);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    result = receiver.recv() => {
                        match result {
                            Ok((sender_id, data)) => {
                                if sender_id == peer_id {
                                    continue;
                                }
                                let _ = inbound_tx.send((sender_id, data));
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!(lagged = n, "sim gossip receiver lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        });

        tracing::debug!(topic, peer = %self.peer_id, "sim gossip subscribed");
        Ok(inbound_rx)
    }

    async fn broadcast(&self, topic: &str, data: Vec<u8>) -> Result<(), GossipError> {
        let sender = match self.topic_senders.lock().await.get(topic) {
            Some(sender) => sender.clone(),
            // Broadcasting without a subscription still reaches the topic.
            None => self.network.get_or_create(topic).await,
        };
        let _ = sender.send((self.peer_id.clone(), data));
        Ok(())
    }

    async fn shutdown(&self) {
        let mut tokens = self.topic_tokens.lock().await;
        for (_, token) in tokens.drain() {
            token.cancel();
        }
        self.topic_senders.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_net_types::contact_info_topic;

    #[tokio::test]
    async fn test_broadcast_reaches_other_subscribers() {
        let network = SimGossipNetwork::new();
        let a = SimGossip::new("peer-a", &network);
        let b = SimGossip::new("peer-b", &network);

        let mut rx_b = b.subscribe(contact_info_topic()).await.unwrap();
        a.subscribe(contact_info_topic()).await.unwrap();

        a.broadcast(contact_info_topic(), b"hello".to_vec())
            .await
            .unwrap();

        let (sender, data) = rx_b.recv().await.unwrap();
        assert_eq!(sender, "peer-a");
        assert_eq!(data, b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_own_broadcasts_are_suppressed() {
        let network = SimGossipNetwork::new();
        let a = SimGossip::new("peer-a", &network);
        let b = SimGossip::new("peer-b", &network);

        let mut rx_a = a.subscribe(contact_info_topic()).await.unwrap();
        b.subscribe(contact_info_topic()).await.unwrap();

        a.broadcast(contact_info_topic(), b"mine".to_vec())
            .await
            .unwrap();
        b.broadcast(contact_info_topic(), b"theirs".to_vec())
            .await
            .unwrap();

        // Only b's message comes back to a.
        let (sender, data) = rx_a.recv().await.unwrap();
        assert_eq!(sender, "peer-b");
        assert_eq!(data, b"theirs".to_vec());
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let network = SimGossipNetwork::new();
        let a = SimGossip::new("peer-a", &network);
        let b = SimGossip::new("peer-b", &network);

        let mut rx_b = b.subscribe("topic-1").await.unwrap();
        a.subscribe("topic-2").await.unwrap();

        a.broadcast("topic-2", b"wrong topic".to_vec()).await.unwrap();
        assert!(rx_b.try_recv().is_err());
    }
}
