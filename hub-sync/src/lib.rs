//! Hub Sync
//!
//! Anti-entropy reconciliation between hubs. The [`SyncEngine`] keeps the
//! local Merkle trie consistent with the storage engine (initial replay plus
//! merge/delete events) and, when a peer's gossiped snapshot disagrees with
//! ours, walks the trie from the divergence prefix, pulls the sync ids we
//! are missing, and merges the underlying messages - recovering unknown-FID
//! dependencies (custody event, signers) on the way.

pub mod engine;
pub mod peer_client;

pub use engine::{SyncEngine, HASHES_PER_FETCH, SYNC_SOURCE, SYNC_THRESHOLD_IN_SECONDS};
pub use peer_client::PeerClient;
