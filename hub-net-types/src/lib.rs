//! Hub Net Types
//!
//! Pure transport-level gossip abstractions and the value types peers
//! exchange over gossip. Envelope encoding lives here; transport
//! implementations live elsewhere (the in-memory sim in `hub-net-sim`).

pub mod contact;
pub mod envelope;
pub mod gossip;

pub use contact::{ContactInfoContent, GossipAddressInfo, GOSSIP_CONTACT_INTERVAL};
pub use envelope::{
    contact_info_topic, primary_topic, GossipContent, GossipMessage, GossipVersion,
};
pub use gossip::{GossipError, GossipLayer};
