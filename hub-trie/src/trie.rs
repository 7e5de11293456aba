//! MerkleTrie - the hub's sync index
//!
//! Owns the root [`TrieNode`] and exposes the read surface the sync engine
//! and its peers use: metadata by prefix, snapshots along a timestamp path,
//! and divergence-prefix computation against a peer's snapshot. All reads
//! are total; an unknown prefix yields an absent value, never an error.

use crate::node::TrieNode;
use crate::sync_id::SyncId;
use hub_model::TrieHash;
use std::collections::BTreeMap;

/// Wire-visible projection of a trie node: its own digest plus a one-level
/// view of its children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMetadata {
    pub prefix: Vec<u8>,
    pub num_messages: usize,
    pub hash: TrieHash,
    pub children: BTreeMap<u8, NodeMetadata>,
}

/// Immutable commitment to the trie below a timestamp boundary.
///
/// `excluded_hashes[i]` digests the siblings of the path at depth `i`;
/// equality of the whole list across two hubs proves their message sets
/// are equal outside the unsettled window under `prefix`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrieSnapshot {
    pub prefix: Vec<u8>,
    pub num_messages: usize,
    pub excluded_hashes: Vec<String>,
}

/// The hub's Merkle trie over sync ids.
#[derive(Debug, Default)]
pub struct MerkleTrie {
    root: TrieNode,
}

impl MerkleTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sync id. Returns true when it was new.
    pub fn insert(&mut self, id: &SyncId) -> bool {
        self.root.insert(id.as_bytes(), 0)
    }

    /// Delete a sync id. Returns true when it was present.
    pub fn delete(&mut self, id: &SyncId) -> bool {
        self.root.delete(id.as_bytes(), 0)
    }

    pub fn exists(&self, id: &SyncId) -> bool {
        self.root.exists(id.as_bytes(), 0)
    }

    /// Digest of the whole trie.
    pub fn root_hash(&self) -> TrieHash {
        self.root.hash()
    }

    /// Total number of sync ids.
    pub fn items(&self) -> usize {
        self.root.items()
    }

    /// Every sync id under `prefix`, ascending.
    pub fn get_sync_ids_by_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        self.root
            .get_node(prefix)
            .map(|node| node.get_all_values())
            .unwrap_or_default()
    }

    /// One-level metadata for the node at `prefix`, or None when no sync id
    /// starts with it.
    pub fn get_trie_node_metadata(&self, prefix: &[u8]) -> Option<NodeMetadata> {
        let node = self.root.get_node(prefix)?;
        let children = node
            .children()
            .map(|(byte, child)| {
                let mut child_prefix = prefix.to_vec();
                child_prefix.push(byte);
                (
                    byte,
                    NodeMetadata {
                        prefix: child_prefix,
                        num_messages: child.items(),
                        hash: child.hash(),
                        children: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Some(NodeMetadata {
            prefix: prefix.to_vec(),
            num_messages: node.items(),
            hash: node.hash(),
            children,
        })
    }

    /// Snapshot the trie along a timestamp path.
    ///
    /// At each step the current node's sibling digest (on-path child
    /// omitted) is recorded; once the path leaves the trie the remaining
    /// entries are the empty digest, so the list length always equals
    /// `|prefix|`. `num_messages` counts the ids extending the full prefix.
    pub fn get_snapshot(&self, prefix: &[u8]) -> TrieSnapshot {
        let mut excluded_hashes = Vec::with_capacity(prefix.len());
        let mut node = Some(&self.root);
        for byte in prefix {
            match node {
                Some(current) => {
                    excluded_hashes.push(current.excluded_hash(*byte).to_string());
                    node = current.child(*byte);
                }
                None => excluded_hashes.push(TrieHash::ZERO.to_string()),
            }
        }
        TrieSnapshot {
            prefix: prefix.to_vec(),
            num_messages: node.map(|n| n.items()).unwrap_or(0),
            excluded_hashes,
        }
    }

    /// The longest prefix of `our_prefix` under which we still agree with a
    /// peer's snapshot: excluded hashes are compared element-wise (over the
    /// shorter of the two lists) and the walk stops at the first mismatch.
    pub fn get_divergence_prefix(&self, our_prefix: &[u8], their_excluded: &[String]) -> Vec<u8> {
        let ours = self.get_snapshot(our_prefix).excluded_hashes;
        let len = ours.len().min(their_excluded.len());
        let mut shared = 0;
        while shared < len && ours[shared] == their_excluded[shared] {
            shared += 1;
        }
        our_prefix[..shared].to_vec()
    }
}
