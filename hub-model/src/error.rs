//! Domain-tagged errors for the sync core
//!
//! Every failure the core surfaces carries one of a small set of domain
//! tags, mirrored on the wire as a string code plus a status. Remote peers
//! only ever see the code; variant payloads are for local logs.

use crate::message::Fid;
use thiserror::Error;

/// Status code a merge returns when the message references an FID the
/// storage engine has never seen a custody event for.
pub const STATUS_UNKNOWN_FID: u16 = 412;

/// Errors surfaced by the sync core and the interfaces it consumes.
#[derive(Error, Debug)]
pub enum HubError {
    /// Malformed message, missing timestamp/hash, invalid gossip envelope.
    #[error("bad input: {0}")]
    BadInput(String),

    /// Unknown prefix or missing record.
    #[error("not found: {0}")]
    NotFound(String),

    /// Merge rejected because the FID's custody event or signer is unknown.
    #[error("unknown fid: {0}")]
    UnknownFid(Fid),

    /// RPC failure during peer interaction.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Local merge failed after dependency recovery.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Anything else; logged and swallowed.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl HubError {
    /// Wire-visible domain code.
    pub fn code(&self) -> &'static str {
        match self {
            HubError::BadInput(_) => "bad_input",
            HubError::NotFound(_) | HubError::UnknownFid(_) => "not_found",
            HubError::NetworkFailure(_) => "unavailable.network_failure",
            HubError::StorageFailure(_) => "unavailable.storage_failure",
            HubError::Unknown(_) => "unknown",
        }
    }

    /// Numeric status carried alongside the code.
    pub fn status(&self) -> u16 {
        match self {
            HubError::BadInput(_) => 400,
            HubError::NotFound(_) => 404,
            HubError::UnknownFid(_) => STATUS_UNKNOWN_FID,
            HubError::NetworkFailure(_) | HubError::StorageFailure(_) => 503,
            HubError::Unknown(_) => 500,
        }
    }
}
