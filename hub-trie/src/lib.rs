//! Timestamp-Prefixed Merkle Trie
//!
//! Content-addressed ordered index over every message a hub knows about.
//! Each message is keyed by a [`SyncId`] (decimal timestamp prefix followed
//! by the message hash), so ids sort in (timestamp, hash) order and a trie
//! prefix is a timestamp boundary. Every node carries a running 160-bit
//! digest of its subtree; two hubs compare digests along a timestamp path
//! to find the shortest prefix under which their message sets disagree.
//!
//! ## Reconciliation walk
//!
//! 1. Exchange snapshots (sibling digests along the settled-timestamp path)
//! 2. If the excluded-hash lists match → sets are equal outside the
//!    unsettled window, done
//! 3. Otherwise descend from the divergence prefix, comparing child digests
//! 4. Under a small enough subtree → exchange the actual sync ids

pub mod node;
pub mod sync_id;
pub mod trie;

pub use node::TrieNode;
pub use sync_id::{SyncId, TIMESTAMP_LENGTH};
pub use trie::{MerkleTrie, NodeMetadata, TrieSnapshot};
