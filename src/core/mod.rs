//! Core ledger functionality
//!
//! This module contains the fundamental components: blocks, transactions,
//! the ledger itself, the Merkle commitment, proof-of-work consensus and
//! the mempool spend-chain validator.

pub mod block;
pub mod ledger;
pub mod mempool;
pub mod merkle;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, BlockHeader};
pub use ledger::{Ledger, GENESIS_PROOF};
pub use mempool::MempoolValidator;
pub use merkle::MerkleTree;
pub use proof_of_work::{ProofOfWork, DEFAULT_DIFFICULTY, MINING_WORKERS};
pub use transaction::{Transaction, TransactionIndex, MINING_REWARD, SENTINEL_HASH};
