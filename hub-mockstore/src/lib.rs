//! Mock storage engine for testing the sync core without real persistence.
//!
//! `MemStorage` keeps every merged message in memory and reproduces the two
//! storage behaviors the sync engine depends on:
//!
//! - the unknown-FID rule: a message whose FID has no custody event (or, for
//!   non-signer messages, no signer) is rejected with `UnknownFid`, and
//! - supersession: merging a remove-message displaces the matching
//!   add-message and emits `MessageDeleted` for it.

use hub_model::{
    Fid, HubError, IdRegistryEvent, Message, MessageKind, StorageEngine, StoreEvent,
};
use futures_core::Stream;
use std::collections::{BTreeMap, HashMap};
use std::pin::Pin;
use std::sync::RwLock;
use tokio::sync::broadcast;

#[derive(Default)]
struct Inner {
    /// Merged messages keyed by content hash.
    messages: BTreeMap<Vec<u8>, Message>,
    /// Custody events keyed by FID.
    custody: HashMap<Fid, IdRegistryEvent>,
    /// SignerAdd messages keyed by FID.
    signers: HashMap<Fid, Vec<Message>>,
}

/// In-memory [`StorageEngine`] implementation.
pub struct MemStorage {
    inner: RwLock<Inner>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStorage {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            inner: RwLock::new(Inner::default()),
            event_tx,
        }
    }

    /// Number of messages currently held.
    pub fn len(&self) -> usize {
        self.inner.read().expect("storage lock poisoned").messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a message with this hash is held.
    pub fn contains(&self, hash: &[u8]) -> bool {
        self.inner
            .read()
            .expect("storage lock poisoned")
            .messages
            .contains_key(hash)
    }

    fn merge_locked(&self, message: Message) -> Result<Option<StoreEvent>, HubError> {
        if message.hash.is_empty() {
            return Err(HubError::BadInput("message has no hash".to_string()));
        }

        let mut inner = self.inner.write().expect("storage lock poisoned");

        // Idempotent: a duplicate merge succeeds without a new event.
        if inner.messages.contains_key(&message.hash) {
            return Ok(None);
        }

        // Unknown-FID rule: every message needs a custody event; non-signer
        // messages additionally need at least one known signer.
        if !inner.custody.contains_key(&message.fid) {
            return Err(HubError::UnknownFid(message.fid.clone()));
        }
        if message.kind != MessageKind::SignerAdd
            && inner.signers.get(&message.fid).map_or(true, Vec::is_empty)
        {
            return Err(HubError::UnknownFid(message.fid.clone()));
        }

        // Supersession: a remove-message displaces the matching add-message
        // (same FID, removed kind, matching body target).
        let mut deleted = None;
        if let Some(removed_kind) = message.kind.removes() {
            let displaced = inner
                .messages
                .values()
                .find(|m| {
                    m.fid == message.fid && m.kind == removed_kind && m.body == message.body
                })
                .cloned();
            if let Some(old) = displaced {
                inner.messages.remove(&old.hash);
                if removed_kind == MessageKind::SignerAdd {
                    if let Some(signers) = inner.signers.get_mut(&message.fid) {
                        signers.retain(|s| s.hash != old.hash);
                    }
                }
                deleted = Some(old);
            }
        }

        if message.kind == MessageKind::SignerAdd {
            inner
                .signers
                .entry(message.fid.clone())
                .or_default()
                .push(message.clone());
        }
        inner.messages.insert(message.hash.clone(), message.clone());
        drop(inner);

        if let Some(old) = deleted {
            let _ = self.event_tx.send(StoreEvent::MessageDeleted { message: old });
        }
        Ok(Some(StoreEvent::MessageMerged { message }))
    }
}

#[async_trait::async_trait]
impl StorageEngine for MemStorage {
    fn all_messages(&self) -> Pin<Box<dyn Stream<Item = Result<Message, HubError>> + Send + '_>> {
        let messages: Vec<Message> = self
            .inner
            .read()
            .expect("storage lock poisoned")
            .messages
            .values()
            .cloned()
            .collect();
        Box::pin(futures_util::stream::iter(messages.into_iter().map(Ok)))
    }

    async fn merge_message(&self, message: Message, _source: &str) -> Result<(), HubError> {
        if let Some(event) = self.merge_locked(message)? {
            let _ = self.event_tx.send(event);
        }
        Ok(())
    }

    async fn merge_messages(
        &self,
        messages: Vec<Message>,
        source: &str,
    ) -> Vec<Result<(), HubError>> {
        let merges = messages
            .into_iter()
            .map(|message| self.merge_message(message, source));
        futures_util::future::join_all(merges).await
    }

    async fn merge_id_registry_event(
        &self,
        event: IdRegistryEvent,
        _source: &str,
    ) -> Result<(), HubError> {
        let mut inner = self.inner.write().expect("storage lock poisoned");
        inner.custody.insert(event.fid.clone(), event);
        Ok(())
    }

    async fn get_messages_by_hashes(&self, hashes: Vec<Vec<u8>>) -> Result<Vec<Message>, HubError> {
        let inner = self.inner.read().expect("storage lock poisoned");
        Ok(hashes
            .iter()
            .filter_map(|hash| inner.messages.get(hash).cloned())
            .collect())
    }

    async fn get_custody_event(&self, fid: &Fid) -> Result<IdRegistryEvent, HubError> {
        let inner = self.inner.read().expect("storage lock poisoned");
        inner
            .custody
            .get(fid)
            .cloned()
            .ok_or_else(|| HubError::NotFound(format!("no custody event for fid {}", fid)))
    }

    async fn get_signer_messages(&self, fid: &Fid) -> Result<Vec<Message>, HubError> {
        let inner = self.inner.read().expect("storage lock poisoned");
        Ok(inner.signers.get(fid).cloned().unwrap_or_default())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn fid() -> Fid {
        Fid(vec![1])
    }

    fn custody_event(fid: &Fid) -> IdRegistryEvent {
        IdRegistryEvent {
            fid: fid.clone(),
            custody_address: vec![0xcc],
            block_number: 1,
            transaction_hash: vec![0x11],
        }
    }

    fn signer_add(fid: &Fid, key: u8) -> Message {
        Message {
            fid: fid.clone(),
            kind: MessageKind::SignerAdd,
            timestamp: 100,
            hash: vec![0xf0, key],
            signer: vec![0xcc],
            body: vec![key],
        }
    }

    fn cast(fid: &Fid, timestamp: u32, seed: u8) -> Message {
        Message {
            fid: fid.clone(),
            kind: MessageKind::CastAdd,
            timestamp,
            hash: vec![0xca, seed],
            signer: vec![1],
            body: vec![seed],
        }
    }

    async fn registered(storage: &MemStorage, fid: &Fid) {
        storage
            .merge_id_registry_event(custody_event(fid), "test")
            .await
            .unwrap();
        storage
            .merge_message(signer_add(fid, 1), "test")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_merge_without_custody_is_unknown_fid() {
        let storage = MemStorage::new();
        let err = storage
            .merge_message(cast(&fid(), 1000, 1), "test")
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::UnknownFid(_)));
        assert_eq!(err.status(), 412);
    }

    #[tokio::test]
    async fn test_signer_add_needs_only_custody() {
        let storage = MemStorage::new();
        let user = fid();
        storage
            .merge_id_registry_event(custody_event(&user), "test")
            .await
            .unwrap();
        storage
            .merge_message(signer_add(&user, 1), "test")
            .await
            .unwrap();
        // Now the cast goes through too.
        storage
            .merge_message(cast(&user, 1000, 1), "test")
            .await
            .unwrap();
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_merge_emits_no_event() {
        let storage = MemStorage::new();
        let user = fid();
        registered(&storage, &user).await;

        let mut events = storage.subscribe_events();
        let message = cast(&user, 1000, 1);
        storage.merge_message(message.clone(), "test").await.unwrap();
        storage.merge_message(message, "test").await.unwrap();

        assert!(matches!(
            events.try_recv(),
            Ok(StoreEvent::MessageMerged { .. })
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_displaces_add_and_emits_delete() {
        let storage = MemStorage::new();
        let user = fid();
        registered(&storage, &user).await;

        let add = cast(&user, 1000, 7);
        storage.merge_message(add.clone(), "test").await.unwrap();

        let mut events = storage.subscribe_events();
        let remove = Message {
            kind: MessageKind::CastRemove,
            timestamp: 1010,
            hash: vec![0xcb, 7],
            ..add.clone()
        };
        storage.merge_message(remove.clone(), "test").await.unwrap();

        assert!(!storage.contains(&add.hash));
        assert!(storage.contains(&remove.hash));
        match events.try_recv().unwrap() {
            StoreEvent::MessageDeleted { message } => assert_eq!(message.hash, add.hash),
            other => panic!("expected delete event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_messages_streams_everything() {
        let storage = MemStorage::new();
        let user = fid();
        registered(&storage, &user).await;
        storage.merge_message(cast(&user, 1000, 1), "test").await.unwrap();
        storage.merge_message(cast(&user, 1001, 2), "test").await.unwrap();

        let streamed: Vec<Message> = storage
            .all_messages()
            .map(|m| m.unwrap())
            .collect()
            .await;
        assert_eq!(streamed.len(), 3); // signer + two casts
    }

    #[tokio::test]
    async fn test_get_messages_by_hashes_skips_unknown() {
        let storage = MemStorage::new();
        let user = fid();
        registered(&storage, &user).await;
        let message = cast(&user, 1000, 1);
        storage.merge_message(message.clone(), "test").await.unwrap();

        let found = storage
            .get_messages_by_hashes(vec![message.hash.clone(), vec![0xde, 0xad]])
            .await
            .unwrap();
        assert_eq!(found, vec![message]);
    }
}
