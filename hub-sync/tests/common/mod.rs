// Each integration test compiles as a separate binary that includes this module via `mod common;`.
// Not every test binary uses every helper, so Rust emits spurious dead_code warnings.
#![allow(dead_code)]
//! Shared test utilities for hub-sync integration tests.

use hub_mockstore::MemStorage;
use hub_model::{Fid, HubError, IdRegistryEvent, Message, MessageKind, MockClock, StorageEngine};
use hub_sync::{PeerClient, SyncEngine};
use hub_trie::NodeMetadata;
use std::sync::Arc;
use tokio::time::Duration;

/// One simulated hub: storage, clock, engine, and a running event task.
pub struct TestHub {
    pub storage: Arc<MemStorage>,
    pub clock: Arc<MockClock>,
    pub engine: Arc<SyncEngine>,
    pub event_task: tokio::task::JoinHandle<()>,
}

impl TestHub {
    /// Build a hub whose clock reads `now_seconds` (Farcaster seconds).
    pub async fn new(now_seconds: u32) -> Self {
        let storage = Arc::new(MemStorage::new());
        let clock = Arc::new(MockClock::new(now_seconds));
        let engine = Arc::new(SyncEngine::new(storage.clone(), clock.clone()));
        engine.initialize().await.expect("initialize engine");
        let event_task = engine.spawn_event_task();
        Self {
            storage,
            clock,
            engine,
            event_task,
        }
    }

    /// Register an FID: custody event plus one signer message.
    pub async fn register_fid(&self, fid: &Fid, signer_timestamp: u32) {
        self.storage
            .merge_id_registry_event(custody_event(fid), "test")
            .await
            .expect("merge custody event");
        self.storage
            .merge_message(signer_add(fid, signer_timestamp), "test")
            .await
            .expect("merge signer");
    }

    pub async fn merge(&self, message: Message) {
        self.storage
            .merge_message(message, "test")
            .await
            .expect("merge message");
    }

    /// Wait until the engine's trie holds exactly `expected` ids.
    pub async fn wait_for_items(&self, expected: usize) {
        for _ in 0..200 {
            if self.engine.trie_items().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "trie never reached {} items (at {})",
            expected,
            self.engine.trie_items().await
        );
    }
}

pub fn fid(n: u8) -> Fid {
    Fid(vec![n])
}

pub fn custody_event(fid: &Fid) -> IdRegistryEvent {
    IdRegistryEvent {
        fid: fid.clone(),
        custody_address: vec![0xcc, fid.0[0]],
        block_number: 1,
        transaction_hash: vec![0x11, fid.0[0]],
    }
}

pub fn signer_add(fid: &Fid, timestamp: u32) -> Message {
    Message {
        fid: fid.clone(),
        kind: MessageKind::SignerAdd,
        timestamp,
        hash: vec![0xf0, fid.0[0]],
        signer: vec![0xcc, fid.0[0]],
        body: vec![0x01, fid.0[0]],
    }
}

pub fn cast(fid: &Fid, timestamp: u32, seed: u8) -> Message {
    Message {
        fid: fid.clone(),
        kind: MessageKind::CastAdd,
        timestamp,
        hash: vec![0xca, fid.0[0], seed],
        signer: vec![0x01, fid.0[0]],
        body: vec![seed],
    }
}

/// PeerClient backed by another in-process hub, recording every call.
pub struct LocalPeerClient {
    engine: Arc<SyncEngine>,
    storage: Arc<MemStorage>,
    calls: std::sync::Mutex<Vec<String>>,
}

impl LocalPeerClient {
    pub fn new(remote: &TestHub) -> Self {
        Self {
            engine: remote.engine.clone(),
            storage: remote.storage.clone(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PeerClient for LocalPeerClient {
    async fn get_sync_metadata_by_prefix(&self, prefix: &[u8]) -> Result<NodeMetadata, HubError> {
        self.record(format!("metadata:{}", String::from_utf8_lossy(prefix)));
        self.engine
            .get_trie_node_metadata(prefix)
            .await
            .ok_or_else(|| {
                HubError::NotFound(format!(
                    "no trie node at prefix {}",
                    String::from_utf8_lossy(prefix)
                ))
            })
    }

    async fn get_sync_ids_by_prefix(&self, prefix: &[u8]) -> Result<Vec<String>, HubError> {
        self.record(format!("ids:{}", String::from_utf8_lossy(prefix)));
        Ok(self.engine.get_sync_ids_by_prefix(prefix).await)
    }

    async fn get_messages_by_hashes(&self, hashes: Vec<String>) -> Result<Vec<Message>, HubError> {
        self.record(format!("messages:{}", hashes.len()));
        let raw: Result<Vec<Vec<u8>>, HubError> = hashes
            .iter()
            .map(|h| {
                hex::decode(h.strip_prefix("0x").unwrap_or(h))
                    .map_err(|e| HubError::BadInput(format!("invalid hex: {}", e)))
            })
            .collect();
        self.storage.get_messages_by_hashes(raw?).await
    }

    async fn get_custody_event_by_fid(&self, fid: &Fid) -> Result<IdRegistryEvent, HubError> {
        self.record(format!("custody:{}", fid));
        self.storage.get_custody_event(fid).await
    }

    async fn get_all_signer_messages_by_fid(&self, fid: &Fid) -> Result<Vec<Message>, HubError> {
        self.record(format!("signers:{}", fid));
        self.storage.get_signer_messages(fid).await
    }
}

/// PeerClient whose every method fails with a network error.
pub struct UnreachablePeer;

#[async_trait::async_trait]
impl PeerClient for UnreachablePeer {
    async fn get_sync_metadata_by_prefix(&self, _prefix: &[u8]) -> Result<NodeMetadata, HubError> {
        Err(HubError::NetworkFailure("unreachable".to_string()))
    }

    async fn get_sync_ids_by_prefix(&self, _prefix: &[u8]) -> Result<Vec<String>, HubError> {
        Err(HubError::NetworkFailure("unreachable".to_string()))
    }

    async fn get_messages_by_hashes(&self, _hashes: Vec<String>) -> Result<Vec<Message>, HubError> {
        Err(HubError::NetworkFailure("unreachable".to_string()))
    }

    async fn get_custody_event_by_fid(&self, _fid: &Fid) -> Result<IdRegistryEvent, HubError> {
        Err(HubError::NetworkFailure("unreachable".to_string()))
    }

    async fn get_all_signer_messages_by_fid(&self, _fid: &Fid) -> Result<Vec<Message>, HubError> {
        Err(HubError::NetworkFailure("unreachable".to_string()))
    }
}
