//! SyncEngine - keeps the trie consistent with storage and drives
//! reconciliation rounds against peers
//!
//! One engine per process. The trie is rebuilt from storage at startup
//! (`initialize`), kept current by the storage event stream
//! (`spawn_event_task`), and compared against peers' gossiped snapshots
//! (`should_sync` / `perform_sync`). A round never raises: every failure is
//! logged and the timer-driven next round retries.

use crate::peer_client::PeerClient;
use hub_model::{Clock, HubError, Message, StorageEngine, StoreEvent};
use hub_net_types::{ContactInfoContent, GossipAddressInfo};
use hub_trie::{MerkleTrie, NodeMetadata, SyncId, TrieSnapshot, TIMESTAMP_LENGTH};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Messages older than this many seconds count as settled and are covered
/// by snapshots.
pub const SYNC_THRESHOLD_IN_SECONDS: u32 = 10;

/// Subtrees at or below this many messages are fetched as a flat id list
/// instead of being subdivided further.
pub const HASHES_PER_FETCH: usize = 50;

/// Source tag attached to merges issued by the engine.
pub const SYNC_SOURCE: &str = "sync-engine";

/// Clears the syncing flag on every exit path of a sync round.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The hub's anti-entropy engine.
pub struct SyncEngine {
    trie: Mutex<MerkleTrie>,
    storage: Arc<dyn StorageEngine>,
    clock: Arc<dyn Clock>,
    is_syncing: AtomicBool,
    initialized: AtomicBool,
}

impl SyncEngine {
    pub fn new(storage: Arc<dyn StorageEngine>, clock: Arc<dyn Clock>) -> Self {
        Self {
            trie: Mutex::new(MerkleTrie::new()),
            storage,
            clock,
            is_syncing: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
        }
    }

    // ==================== Initialization ====================

    /// Rebuild the trie by replaying every persisted message. May be run
    /// only once per process; returns the number of ids inserted.
    pub async fn initialize(&self) -> Result<usize, HubError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(HubError::BadInput(
                "sync engine already initialized".to_string(),
            ));
        }
        let mut stream = self.storage.all_messages();
        let mut count = 0usize;
        while let Some(next) = stream.next().await {
            let message = match next {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable message during trie rebuild");
                    continue;
                }
            };
            match SyncId::from_message(&message) {
                Ok(id) => {
                    self.trie.lock().await.insert(&id);
                    count += 1;
                    if count % 10_000 == 0 {
                        info!(count, "trie rebuild in progress");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "skipping message without sync id during trie rebuild");
                }
            }
        }
        info!(count, "trie rebuilt from storage");
        Ok(count)
    }

    /// Subscribe to storage mutations and keep the trie current.
    ///
    /// Inserts and deletes are idempotent, so replayed or reordered events
    /// converge to the same trie. A lagged receiver only logs: the next
    /// sync round re-converges whatever was missed.
    pub fn spawn_event_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        let mut rx = engine.storage.subscribe_events();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(StoreEvent::MessageMerged { message }) => {
                        engine.apply_insert(&message).await;
                    }
                    Ok(StoreEvent::MessageDeleted { message }) => {
                        engine.apply_delete(&message).await;
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(lagged = n, "store event receiver lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn apply_insert(&self, message: &Message) {
        match SyncId::from_message(message) {
            Ok(id) => {
                self.trie.lock().await.insert(&id);
            }
            Err(e) => debug!(error = %e, "merged message has no sync id"),
        }
    }

    async fn apply_delete(&self, message: &Message) {
        match SyncId::from_message(message) {
            Ok(id) => {
                self.trie.lock().await.delete(&id);
            }
            Err(e) => debug!(error = %e, "deleted message has no sync id"),
        }
    }

    // ==================== Snapshots ====================

    /// Current time floored to the sync threshold: the boundary below which
    /// messages are settled.
    pub fn snapshot_timestamp(&self) -> u32 {
        (self.clock.now_seconds() / SYNC_THRESHOLD_IN_SECONDS) * SYNC_THRESHOLD_IN_SECONDS
    }

    /// The timestamp path snapshots walk: the boundary with its final digit
    /// dropped, so the path aligns on the 10-second window.
    fn snapshot_prefix(&self) -> Vec<u8> {
        let boundary = self.snapshot_timestamp() / 10;
        format!("{:0width$}", boundary, width = TIMESTAMP_LENGTH - 1).into_bytes()
    }

    /// Snapshot of everything settled at the current boundary.
    pub async fn snapshot(&self) -> TrieSnapshot {
        self.trie.lock().await.get_snapshot(&self.snapshot_prefix())
    }

    /// Build the contact record this hub gossips.
    pub async fn contact_info(
        &self,
        peer_id: &str,
        gossip_address: Option<GossipAddressInfo>,
        rpc_address: Option<GossipAddressInfo>,
    ) -> ContactInfoContent {
        let trie = self.trie.lock().await;
        let snapshot = trie.get_snapshot(&self.snapshot_prefix());
        ContactInfoContent {
            peer_id: peer_id.to_string(),
            gossip_address,
            rpc_address,
            excluded_hashes: snapshot.excluded_hashes,
            count: trie.items() as u64,
        }
    }

    // ==================== Sync decisions ====================

    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }

    /// Whether a peer's snapshot warrants a sync round. Always false while
    /// a round is already running.
    pub async fn should_sync(&self, their_excluded_hashes: &[String]) -> bool {
        if self.is_syncing() {
            return false;
        }
        let ours = self.snapshot().await.excluded_hashes;
        ours.as_slice() != their_excluded_hashes
    }

    /// Run one reconciliation round against a peer. Never raises; every
    /// failure inside the pipeline is logged and the next scheduled round
    /// retries.
    pub async fn perform_sync(&self, their_excluded_hashes: &[String], peer: &dyn PeerClient) {
        if self.is_syncing.swap(true, Ordering::SeqCst) {
            debug!("sync already in progress, dropping round");
            return;
        }
        let _guard = SyncingGuard(&self.is_syncing);

        let snapshot = self.snapshot().await;
        let divergence = self
            .trie
            .lock()
            .await
            .get_divergence_prefix(&snapshot.prefix, their_excluded_hashes);
        debug!(
            prefix = %String::from_utf8_lossy(&divergence),
            "divergence prefix located"
        );

        let missing = self.fetch_missing_hashes_by_prefix(&divergence, peer).await;
        if missing.is_empty() {
            debug!("no missing sync ids under divergence prefix");
            return;
        }
        let merged = self.fetch_and_merge_messages(&missing, peer).await;
        info!(missing = missing.len(), merged, "sync round complete");
    }

    // ==================== Divergence walk ====================

    /// Compare our subtree at `prefix` against the peer's and collect the
    /// sync ids we are missing. A metadata failure ends this branch of the
    /// walk; siblings elsewhere continue.
    async fn fetch_missing_hashes_by_prefix(
        &self,
        prefix: &[u8],
        peer: &dyn PeerClient,
    ) -> Vec<String> {
        let our_node = self.trie.lock().await.get_trie_node_metadata(prefix);
        let their_node = match peer.get_sync_metadata_by_prefix(prefix).await {
            Ok(node) => node,
            Err(e) => {
                warn!(
                    prefix = %String::from_utf8_lossy(prefix),
                    error = %e,
                    "failed to fetch peer metadata"
                );
                return Vec::new();
            }
        };
        self.fetch_missing_hashes_by_node(their_node, our_node, peer)
            .await
    }

    /// The central recursion: small peer subtrees are fetched flat, larger
    /// ones are entered child by child wherever the digests disagree.
    /// Depth is bounded by the sync id length.
    fn fetch_missing_hashes_by_node<'a>(
        &'a self,
        their_node: NodeMetadata,
        our_node: Option<NodeMetadata>,
        peer: &'a dyn PeerClient,
    ) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>> {
        Box::pin(async move {
            if their_node.num_messages <= HASHES_PER_FETCH {
                // Fetch everything under the prefix; merge-time dedup
                // drops whatever we already hold.
                return match peer.get_sync_ids_by_prefix(&their_node.prefix).await {
                    Ok(ids) => ids,
                    Err(e) => {
                        warn!(
                            prefix = %String::from_utf8_lossy(&their_node.prefix),
                            error = %e,
                            "failed to fetch sync ids"
                        );
                        Vec::new()
                    }
                };
            }

            let mut missing = Vec::new();
            for (byte, their_child) in &their_node.children {
                let ours_matches = our_node
                    .as_ref()
                    .and_then(|node| node.children.get(byte))
                    .map(|our_child| our_child.hash == their_child.hash)
                    .unwrap_or(false);
                if !ours_matches {
                    missing.extend(
                        self.fetch_missing_hashes_by_prefix(&their_child.prefix, peer)
                            .await,
                    );
                }
            }
            missing
        })
    }

    // ==================== Fetch and merge ====================

    /// Fetch the messages behind a batch of sync ids and merge them
    /// sequentially (later messages may depend on earlier ones). Returns
    /// the number of successful merges.
    async fn fetch_and_merge_messages(&self, sync_ids: &[String], peer: &dyn PeerClient) -> usize {
        if sync_ids.is_empty() {
            return 0;
        }
        let hashes: Vec<String> = sync_ids
            .iter()
            .filter_map(|id| match sync_id_to_message_hash_hex(id) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    warn!(sync_id = %id, error = %e, "peer sent malformed sync id");
                    None
                }
            })
            .collect();

        let messages = match peer.get_messages_by_hashes(hashes).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "failed to fetch messages from peer");
                return 0;
            }
        };

        let mut merged = 0;
        for message in messages {
            match self.storage.merge_message(message.clone(), SYNC_SOURCE).await {
                Ok(()) => merged += 1,
                Err(HubError::UnknownFid(fid)) => {
                    debug!(%fid, "merge blocked on unknown fid, recovering dependencies");
                    match self.sync_fid_and_retry_message(message, peer).await {
                        Ok(()) => merged += 1,
                        Err(e) => warn!(%fid, error = %e, "dependency recovery failed"),
                    }
                }
                Err(e) => {
                    warn!(hash = %message.hash_hex(), error = %e, "failed to merge message");
                }
            }
        }
        merged
    }

    /// Recover an unknown FID's dependencies - custody event, then signer
    /// messages - and retry the original merge.
    async fn sync_fid_and_retry_message(
        &self,
        message: Message,
        peer: &dyn PeerClient,
    ) -> Result<(), HubError> {
        let fid = message.fid.clone();

        let custody = peer
            .get_custody_event_by_fid(&fid)
            .await
            .map_err(|e| HubError::NetworkFailure(format!("custody event fetch failed: {}", e)))?;
        self.storage
            .merge_id_registry_event(custody, SYNC_SOURCE)
            .await?;

        let signers = peer
            .get_all_signer_messages_by_fid(&fid)
            .await
            .map_err(|e| HubError::NetworkFailure(format!("signer fetch failed: {}", e)))?;
        let results = self.storage.merge_messages(signers, SYNC_SOURCE).await;
        if !results.is_empty() && results.iter().all(Result::is_err) {
            return Err(HubError::StorageFailure(format!(
                "all {} signer merges failed for fid {}",
                results.len(),
                fid
            )));
        }

        self.storage
            .merge_message(message, SYNC_SOURCE)
            .await
            .map_err(|e| HubError::StorageFailure(e.to_string()))
    }

    // ==================== Server read surface ====================

    /// One-level trie metadata, as served to peers.
    pub async fn get_trie_node_metadata(&self, prefix: &[u8]) -> Option<NodeMetadata> {
        self.trie.lock().await.get_trie_node_metadata(prefix)
    }

    /// Sync ids under a prefix, `0x`-hex encoded, as served to peers.
    pub async fn get_sync_ids_by_prefix(&self, prefix: &[u8]) -> Vec<String> {
        self.trie
            .lock()
            .await
            .get_sync_ids_by_prefix(prefix)
            .iter()
            .map(|id| to_wire_hex(id))
            .collect()
    }

    pub async fn root_hash(&self) -> hub_model::TrieHash {
        self.trie.lock().await.root_hash()
    }

    pub async fn trie_items(&self) -> usize {
        self.trie.lock().await.items()
    }

    pub async fn exists(&self, id: &SyncId) -> bool {
        self.trie.lock().await.exists(id)
    }
}

// ==================== Wire hex ====================

/// Hex strings carry a `0x` prefix on the wire.
pub(crate) fn to_wire_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub(crate) fn from_wire_hex(value: &str) -> Result<Vec<u8>, HubError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| HubError::BadInput(format!("invalid hex: {}", e)))
}

/// Convert a wire sync id to the wire hex of its message hash.
fn sync_id_to_message_hash_hex(wire_id: &str) -> Result<String, HubError> {
    let id = SyncId::try_from(from_wire_hex(wire_id)?)?;
    Ok(to_wire_hex(id.message_hash()))
}
