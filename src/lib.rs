//! # Meshchain - My Minimal Peer-to-Peer Ledger
//!
//! This is my gossip-based distributed ledger built from scratch in Rust.
//! When I come back to this code, here's what I need to remember:
//!
//! ## What I Built
//! - **Ledger Core**: a hash-linked chain with a Merkle commitment over each
//!   block's transactions and a constant-difficulty proof-of-work predicate
//! - **Spend-Chain Mempool**: transactions reference the transaction they
//!   spend instead of a UTXO set; the validator checks one hop back
//! - **Gossip Protocol**: version/verack handshake, getdata/chain sync,
//!   addblock/addtx propagation over a broadcast transport
//! - **Longest-Chain Consensus**: the conflict resolver asks the single
//!   highest-announcing peer and swaps in its chain if it validates
//! - **Node Roles**: full, miner and SPV as capability values on one
//!   protocol, not an inheritance chain
//!
//! ## How I Organized My Code
//! - `core/`: blocks, transactions, the ledger, Merkle tree, proof-of-work
//! - `network/`: wire envelope, transport boundary, peers, sync, the node
//! - `storage/`: JSON snapshot persistence
//! - `config/`: node settings and environment overrides
//! - `utils/`: hashing and canonical serialization helpers
//! - `cli/`: command-line interface for the node binary
//!
//! ## Key Design Decisions I Made
//! - One dispatch thread per node owns all protocol state; mining runs on
//!   worker threads with explicit cancellation so it never blocks dispatch
//! - Every node owns its ledger outright - no shared defaults, ever
//! - Canonical sorted-key JSON is the one serialization hashes are taken
//!   over, so any two nodes agree on every digest
//! - Peers are untrusted: invalid chains, blocks and transactions are
//!   logged and dropped without ever corrupting local state

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use crate::cli::{Command, NodeArgs, Opt};
pub use crate::config::{Config, GLOBAL_CONFIG};
pub use crate::core::{
    Block, BlockHeader, Ledger, MempoolValidator, MerkleTree, ProofOfWork, Transaction,
    TransactionIndex, DEFAULT_DIFFICULTY, GENESIS_PROOF, MINING_REWARD, MINING_WORKERS,
    SENTINEL_HASH,
};
pub use crate::error::{NodeError, Result};
pub use crate::network::{
    encode_payload, AddBlockPayload, AddTxPayload, ChainPayload, ConflictResolver, Envelope,
    GetDataPayload, HandshakeState, LocalHub, LocalTransport, MessageKind, Node, PeerInfo,
    PeerRegistry, Role, SyncAction, Transport, UdpTransport, VersionPayload, SYNC_TIMEOUT_MS,
};
pub use crate::storage::Snapshot;
pub use crate::utils::{
    canonical_json, current_timestamp, hash_object, sha256_digest, sha256_hexdigest,
};
