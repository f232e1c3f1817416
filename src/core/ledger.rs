// This is the core ledger implementation - the heart of the node
// I keep the chain of blocks and the pending-transaction pool together here,
// because every hashing and validation rule ties the two to each other.
// The chain follows a longest-valid-chain design with proof-of-work consensus
// and a Merkle commitment over each block's transaction set.

use crate::core::transaction::SENTINEL_HASH;
use crate::core::{
    Block, BlockHeader, MempoolValidator, MerkleTree, ProofOfWork, Transaction, TransactionIndex,
};
use crate::error::Result;
use crate::utils::{current_timestamp, hash_object};
use log::{info, warn};
use serde::Serialize;

// The genesis block carries a fixed proof; it is never checked against a predecessor
pub const GENESIS_PROOF: u64 = 100;

// This is my main ledger structure holding the entire local chain state
pub struct Ledger {
    chain: Vec<Block>,             // The blocks, genesis first
    pool: Vec<String>,             // Hashes of transactions pending inclusion
    tx_index: TransactionIndex,    // Every transaction ever accepted, by hash
    pow: ProofOfWork,              // The predicate used to validate proofs
}

impl Ledger {
    // When I want a brand new ledger with a synthesized genesis block
    pub fn new() -> Result<Ledger> {
        Self::with_chain(Vec::new(), TransactionIndex::new())
    }

    // When I want a ledger seeded from a loaded snapshot. A non-empty chain
    // skips genesis synthesis; an empty one triggers it.
    pub fn with_chain(chain: Vec<Block>, tx_index: TransactionIndex) -> Result<Ledger> {
        Self::with_proof_of_work(ProofOfWork::new(), chain, tx_index)
    }

    // Tests run at reduced difficulty through this constructor
    pub fn with_proof_of_work(
        pow: ProofOfWork,
        chain: Vec<Block>,
        mut tx_index: TransactionIndex,
    ) -> Result<Ledger> {
        tx_index.ensure_sentinel();

        let mut ledger = Ledger {
            chain,
            pool: Vec::new(),
            tx_index,
            pow,
        };

        if ledger.chain.is_empty() {
            info!("Creating genesis block");
            ledger.append_block(GENESIS_PROOF, Some(SENTINEL_HASH.to_string()))?;
        }

        Ok(ledger)
    }

    /// Canonical hash used uniformly for headers and transactions.
    pub fn hash<T: Serialize>(value: &T) -> Result<String> {
        hash_object(value)
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Chain always holds at least the genesis block - this should never happen")
    }

    pub fn get_chain(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn height(&self) -> usize {
        self.chain.len()
    }

    pub fn get_headers(&self) -> Vec<BlockHeader> {
        self.chain.iter().map(|b| b.get_header().clone()).collect()
    }

    pub fn pending(&self) -> &[String] {
        self.pool.as_slice()
    }

    pub fn get_tx_index(&self) -> &TransactionIndex {
        &self.tx_index
    }

    pub fn proof_of_work(&self) -> ProofOfWork {
        self.pow
    }

    // This is where inbound transactions enter the pool. The validator's
    // verdict is final: rejections are logged and swallowed, never raised,
    // because remote submitters get no error channel in this protocol.
    pub fn add_transaction(&mut self, tx: Transaction) -> Option<String> {
        if let Err(reason) = MempoolValidator::check(&tx, &self.tx_index) {
            warn!("Rejected transaction from {}: {reason}", tx.get_sender());
            return None;
        }

        let tx_hash = match tx.id() {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Failed to hash transaction: {e}");
                return None;
            }
        };

        self.tx_index.insert(tx_hash.clone(), tx);
        if !self.pool.contains(&tx_hash) {
            self.pool.push(tx_hash.clone());
        }
        Some(tx_hash)
    }

    // The only way a block gets onto the chain. I build the header from the
    // current pool and the previous block, commit the Merkle tree, append,
    // and clear the pool - all in one step so no caller can bypass it.
    pub fn append_block(&mut self, proof: u64, previous_hash: Option<String>) -> Result<Block> {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.last_block().get_header().hash()?,
        };

        let merkle_tree = MerkleTree::build(&self.pool, &self.tx_index)?;
        let merkle_root = merkle_tree
            .first()
            .and_then(|level| level.first())
            .cloned()
            .unwrap_or_else(|| SENTINEL_HASH.to_string());

        let header = BlockHeader::new(
            self.chain.len() as u64 + 1,
            current_timestamp()?,
            proof,
            previous_hash,
            merkle_root,
        );
        let block = Block::new(header, self.pool.clone(), merkle_tree);

        self.pool.clear();
        self.chain.push(block.clone());

        info!(
            "Appended block at height {} with {} transactions",
            self.chain.len(),
            block.get_transaction_hashes().len()
        );

        Ok(block)
    }

    // Walks consecutive pairs checking index sequence, timestamp order,
    // previous-hash linkage and proof-of-work. Logs and bails on the first
    // violation, never mutates state. The genesis block has no predecessor
    // to check against, which the pairwise walk handles naturally.
    pub fn validate_chain(&self, chain: &[Block]) -> bool {
        let headers: Vec<BlockHeader> = chain.iter().map(|b| b.get_header().clone()).collect();
        self.validate_headers(&headers)
    }

    /// Header-only analogue of `validate_chain`, used by SPV peers.
    pub fn validate_headers(&self, headers: &[BlockHeader]) -> bool {
        for i in 0..headers.len().saturating_sub(1) {
            let block = &headers[i];
            let next = &headers[i + 1];

            if block.get_index() != (i + 1) as u64 || next.get_index() != (i + 2) as u64 {
                warn!("Chain invalid: index sequence broken at position {i}");
                return false;
            }

            if block.get_timestamp() > next.get_timestamp() {
                warn!("Chain invalid: timestamps out of order at position {i}");
                return false;
            }

            let prev_hash = match block.hash() {
                Ok(hash) => hash,
                Err(e) => {
                    warn!("Chain invalid: failed to hash header at position {i}: {e}");
                    return false;
                }
            };

            if prev_hash != next.get_previous_hash() {
                warn!("Chain invalid: previous-hash linkage broken at position {i}");
                return false;
            }

            if !self.pow.valid_proof(&prev_hash, next.get_proof()) {
                warn!("Chain invalid: proof-of-work check failed at position {i}");
                return false;
            }
        }

        true
    }

    // Wholesale replacement, the only chain mutation besides append_block.
    // ConflictResolver calls this after the candidate passed validation.
    // Local index entries survive the merge: first writer wins per key.
    pub fn replace_chain(&mut self, chain: Vec<Block>, incoming: TransactionIndex) {
        info!(
            "Replacing local chain (height {} -> {})",
            self.chain.len(),
            chain.len()
        );
        self.chain = chain;
        self.tx_index.merge(incoming);
    }

    // Extend the chain by one broadcast block. The candidate is validated as
    // a whole; on failure the local chain is left byte-for-byte untouched.
    pub fn try_extend(&mut self, block: Block, incoming: TransactionIndex) -> bool {
        let mut candidate = self.chain.clone();
        candidate.push(block);

        if !self.validate_chain(&candidate) {
            return false;
        }

        self.chain = candidate;
        self.tx_index.merge(incoming);
        true
    }

    /// Position of the block committing to a transaction hash, if any.
    pub fn find_transaction_block(&self, tx_hash: &str) -> Option<usize> {
        self.chain.iter().position(|b| b.contains_transaction(tx_hash))
    }
}
