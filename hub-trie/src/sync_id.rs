//! SyncId - timestamp-prefixed content address of a message
//!
//! The trie key. Ten zero-padded decimal ASCII digits of the message
//! timestamp followed by the raw message hash, so ids sort
//! lexicographically in (timestamp, hash) order and a shared byte prefix is
//! a shared timestamp range.

use hub_model::{HubError, Message};
use std::fmt;

/// Number of leading bytes holding the decimal timestamp.
pub const TIMESTAMP_LENGTH: usize = 10;

/// Timestamp-prefixed content address of a message.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncId(Vec<u8>);

impl SyncId {
    /// Build the sync id for a message.
    pub fn from_message(message: &Message) -> Result<Self, HubError> {
        Self::from_parts(message.timestamp, &message.hash)
    }

    /// Build a sync id from a timestamp and a message hash.
    pub fn from_parts(timestamp: u32, hash: &[u8]) -> Result<Self, HubError> {
        if hash.is_empty() {
            return Err(HubError::BadInput("message has no hash".to_string()));
        }
        let mut bytes = format!("{:0width$}", timestamp, width = TIMESTAMP_LENGTH).into_bytes();
        bytes.extend_from_slice(hash);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The first `n` bytes of the id (clamped to its length).
    pub fn timestamp_prefix(&self, n: usize) -> &[u8] {
        &self.0[..n.min(self.0.len())]
    }

    /// The message hash portion (everything past the timestamp).
    pub fn message_hash(&self) -> &[u8] {
        &self.0[TIMESTAMP_LENGTH..]
    }
}

impl TryFrom<Vec<u8>> for SyncId {
    type Error = HubError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() <= TIMESTAMP_LENGTH {
            return Err(HubError::BadInput(format!(
                "sync id too short: {} bytes",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncId({})", self)
    }
}
