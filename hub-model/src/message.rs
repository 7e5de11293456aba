//! Signed user messages and identity-registry events
//!
//! A hub stores one set of signed messages per network. Messages are
//! content-addressed by their hash and attributed to a user (FID) via a
//! signer key that must have been announced by a `SignerAdd` under that
//! user's custody address.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds between the Unix epoch and the Farcaster epoch (2021-01-01T00:00:00Z).
///
/// All message timestamps are seconds since this epoch.
pub const FARCASTER_EPOCH: u64 = 1_609_459_200;

/// Opaque Farcaster user identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fid(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl Fid {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Fid {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Fid {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fid({})", self)
    }
}

/// Kind of a signed user message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    CastAdd,
    CastRemove,
    ReactionAdd,
    ReactionRemove,
    AmpAdd,
    AmpRemove,
    VerificationAdd,
    VerificationRemove,
    SignerAdd,
    SignerRemove,
    UserDataAdd,
}

impl MessageKind {
    /// The add-kind this remove-kind displaces, if any.
    pub fn removes(&self) -> Option<MessageKind> {
        match self {
            MessageKind::CastRemove => Some(MessageKind::CastAdd),
            MessageKind::ReactionRemove => Some(MessageKind::ReactionAdd),
            MessageKind::AmpRemove => Some(MessageKind::AmpAdd),
            MessageKind::VerificationRemove => Some(MessageKind::VerificationAdd),
            MessageKind::SignerRemove => Some(MessageKind::SignerAdd),
            _ => None,
        }
    }
}

/// A signed user message as the storage engine hands it to the sync core.
///
/// Validation (signature checks, body decoding) happens inside the storage
/// engine; the sync core only needs the identity fields. Messages arriving
/// over the network may be malformed, so nothing here panics on odd input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub fid: Fid,
    pub kind: MessageKind,
    /// Seconds since [`FARCASTER_EPOCH`].
    pub timestamp: u32,
    /// Content hash of the message payload.
    #[serde(with = "serde_bytes")]
    pub hash: Vec<u8>,
    /// Public key of the signer that produced this message.
    #[serde(with = "serde_bytes")]
    pub signer: Vec<u8>,
    /// Kind-specific body (target hash, signer key being added, ...).
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

impl Message {
    /// Lowercase hex of the content hash.
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

/// An on-chain identity-registry event binding an FID to a custody address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRegistryEvent {
    pub fid: Fid,
    #[serde(with = "serde_bytes")]
    pub custody_address: Vec<u8>,
    pub block_number: u64,
    #[serde(with = "serde_bytes")]
    pub transaction_hash: Vec<u8>,
}
