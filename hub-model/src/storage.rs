//! StorageEngine - Object-safe trait for the sync core's view of storage
//!
//! The storage engine owns message validation, persistence and conflict
//! resolution; the sync core only iterates, merges, and listens. Defined in
//! hub-model so both the engine (consumer) and storage backends
//! (implementors) can reference it without depending on each other.

use crate::error::HubError;
use crate::message::{Fid, IdRegistryEvent, Message};
use futures_core::Stream;
use std::pin::Pin;
use tokio::sync::broadcast;

/// A mutation the storage engine committed, broadcast to subscribers in
/// transaction-commit order.
#[derive(Clone, Debug)]
pub enum StoreEvent {
    /// A message was merged into the store.
    MessageMerged { message: Message },
    /// A message was displaced from the store (e.g. a remove-message
    /// superseded its add-message). Advisory: the underlying transaction
    /// may still have failed; the trie re-converges on the next sync round.
    MessageDeleted { message: Message },
}

/// Object-safe trait for sync operations on the local message store.
#[async_trait::async_trait]
pub trait StorageEngine: Send + Sync {
    /// Stream every persisted message, in arbitrary order.
    fn all_messages(&self) -> Pin<Box<dyn Stream<Item = Result<Message, HubError>> + Send + '_>>;

    /// Merge a single message. Idempotent: merging a message already in the
    /// store succeeds without re-emitting events. Fails with
    /// [`HubError::UnknownFid`] when the message's FID has no known custody
    /// event (or, for non-signer messages, no known signer).
    async fn merge_message(&self, message: Message, source: &str) -> Result<(), HubError>;

    /// Merge a batch of messages, returning per-message results in input
    /// order. Implementations may merge concurrently.
    async fn merge_messages(&self, messages: Vec<Message>, source: &str)
        -> Vec<Result<(), HubError>>;

    /// Merge an identity-registry event.
    async fn merge_id_registry_event(
        &self,
        event: IdRegistryEvent,
        source: &str,
    ) -> Result<(), HubError>;

    /// Fetch messages by content hash. Unknown hashes are skipped.
    async fn get_messages_by_hashes(&self, hashes: Vec<Vec<u8>>) -> Result<Vec<Message>, HubError>;

    /// Fetch the custody event for an FID.
    async fn get_custody_event(&self, fid: &Fid) -> Result<IdRegistryEvent, HubError>;

    /// Fetch all signer messages for an FID.
    async fn get_signer_messages(&self, fid: &Fid) -> Result<Vec<Message>, HubError>;

    /// Subscribe to committed mutations.
    fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent>;
}
