//! PeerClient - Object-safe trait for the sync engine's view of a peer
//!
//! The capability set the engine consumes during a sync round. Defined here
//! so transports (gRPC client, test doubles) implement it without the
//! engine depending on any wire stack. Hex parameters and results carry a
//! `0x` prefix on the wire; the engine adds and strips it at this boundary.
//!
//! Implementors map transport failures into
//! [`HubError::NetworkFailure`](hub_model::HubError::NetworkFailure).

use hub_model::{Fid, HubError, IdRegistryEvent, Message};
use hub_trie::NodeMetadata;

/// Object-safe trait for RPC operations against a remote hub.
#[async_trait::async_trait]
pub trait PeerClient: Send + Sync {
    /// One-level trie metadata for a prefix.
    async fn get_sync_metadata_by_prefix(&self, prefix: &[u8]) -> Result<NodeMetadata, HubError>;

    /// Every sync id under a prefix, `0x`-hex encoded.
    async fn get_sync_ids_by_prefix(&self, prefix: &[u8]) -> Result<Vec<String>, HubError>;

    /// Messages by `0x`-hex content hash. Unknown hashes are skipped.
    async fn get_messages_by_hashes(&self, hashes: Vec<String>) -> Result<Vec<Message>, HubError>;

    /// The custody event for an FID.
    async fn get_custody_event_by_fid(&self, fid: &Fid) -> Result<IdRegistryEvent, HubError>;

    /// All signer messages for an FID.
    async fn get_all_signer_messages_by_fid(&self, fid: &Fid) -> Result<Vec<Message>, HubError>;
}
