//! Hub Model
//!
//! Pure data types and traits for the hub sync core, decoupled from
//! storage engines, network stacks, and the reconciliation protocol.

pub mod clock;
pub mod error;
pub mod message;
pub mod storage;
pub mod types;

pub use clock::{Clock, MockClock, SystemClock};
pub use error::{HubError, STATUS_UNKNOWN_FID};
pub use message::{Fid, IdRegistryEvent, Message, MessageKind, FARCASTER_EPOCH};
pub use storage::{StorageEngine, StoreEvent};
pub use types::TrieHash;
