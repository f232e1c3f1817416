//! Peer-to-peer networking functionality
//!
//! This module handles communication between ledger nodes: the wire
//! envelope, the transport boundary, peer bookkeeping, chain conflict
//! resolution and the node protocol state machine itself.

pub mod message;
pub mod node;
pub mod peer;
pub mod sync;
pub mod transport;

pub use message::{
    encode_payload, AddBlockPayload, AddTxPayload, ChainPayload, Envelope, GetDataPayload,
    MessageKind, VersionPayload,
};
pub use node::{Node, Role};
pub use peer::{HandshakeState, PeerInfo, PeerRegistry};
pub use sync::{ConflictResolver, SyncAction, SYNC_TIMEOUT_MS};
pub use transport::{LocalHub, LocalTransport, Transport, UdpTransport};
