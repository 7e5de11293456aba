//! Contact records peers republish over gossip
//!
//! A contact record advertises a hub's addresses and its current snapshot
//! commitment. Receivers compare `excluded_hashes` against their own
//! snapshot to decide whether to start a sync round against the advertised
//! RPC address.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a hub republishes its contact record.
pub const GOSSIP_CONTACT_INTERVAL: Duration = Duration::from_millis(10_000);

/// Host and port of a reachable endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipAddressInfo {
    pub address: String,
    pub port: u16,
}

/// A hub's periodically gossiped contact record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfoContent {
    pub peer_id: String,
    pub gossip_address: Option<GossipAddressInfo>,
    pub rpc_address: Option<GossipAddressInfo>,
    /// Snapshot commitment: sibling digests along the settled-timestamp
    /// path, lowercase hex, path order.
    pub excluded_hashes: Vec<String>,
    /// Number of messages under the snapshot prefix.
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_record_json_round_trip() {
        let contact = ContactInfoContent {
            peer_id: "peer-1".to_string(),
            gossip_address: Some(GossipAddressInfo {
                address: "10.0.0.1".to_string(),
                port: 2282,
            }),
            rpc_address: None,
            excluded_hashes: vec!["00".repeat(20), "ab".repeat(20)],
            count: 42,
        };
        let json = serde_json::to_vec(&contact).unwrap();
        let back: ContactInfoContent = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, contact);
    }
}
