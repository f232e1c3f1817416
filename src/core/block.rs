use crate::error::Result;
use crate::utils::hash_object;
use serde::{Deserialize, Serialize};

/// The hashed portion of a block. Chain linkage, proof checking and the
/// merkle commitment all operate on the header alone, which is what lets
/// SPV peers validate without transaction bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    index: u64,
    timestamp: i64,
    proof: u64,
    previous_hash: String,
    merkle_root: String,
}

impl BlockHeader {
    pub fn new(
        index: u64,
        timestamp: i64,
        proof: u64,
        previous_hash: String,
        merkle_root: String,
    ) -> BlockHeader {
        BlockHeader {
            index,
            timestamp,
            proof,
            previous_hash,
            merkle_root,
        }
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_proof(&self) -> u64 {
        self.proof
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_merkle_root(&self) -> &str {
        self.merkle_root.as_str()
    }

    /// Canonical hash of this header. This digest is both the next block's
    /// `previous_hash` and the proof-of-work challenge.
    pub fn hash(&self) -> Result<String> {
        hash_object(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    header: BlockHeader,
    transaction_hashes: Vec<String>,
    merkle_tree: Vec<Vec<String>>,
}

impl Block {
    pub fn new(
        header: BlockHeader,
        transaction_hashes: Vec<String>,
        merkle_tree: Vec<Vec<String>>,
    ) -> Block {
        Block {
            header,
            transaction_hashes,
            merkle_tree,
        }
    }

    pub fn get_header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn get_transaction_hashes(&self) -> &[String] {
        self.transaction_hashes.as_slice()
    }

    pub fn get_merkle_tree(&self) -> &[Vec<String>] {
        self.merkle_tree.as_slice()
    }

    pub fn contains_transaction(&self, tx_hash: &str) -> bool {
        self.transaction_hashes.iter().any(|h| h == tx_hash)
    }

    /// Header-only copy for SPV storage: keeps the header and the committed
    /// transaction hashes, drops the merkle levels.
    pub fn stripped(&self) -> Block {
        Block {
            header: self.header.clone(),
            transaction_hashes: self.transaction_hashes.clone(),
            merkle_tree: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(index: u64, timestamp: i64) -> BlockHeader {
        BlockHeader::new(index, timestamp, 100, "0".to_string(), "0".to_string())
    }

    #[test]
    fn test_header_hash_is_stable_hex() {
        let h = header(1, 1_000);
        let digest = h.hash().unwrap();
        assert_eq!(digest, h.hash().unwrap());
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_header_hash_changes_with_contents() {
        assert_ne!(
            header(1, 1_000).hash().unwrap(),
            header(2, 1_000).hash().unwrap()
        );
        assert_ne!(
            header(1, 1_000).hash().unwrap(),
            header(1, 1_001).hash().unwrap()
        );
    }

    #[test]
    fn test_stripped_block_keeps_header_and_hashes() {
        let block = Block::new(
            header(3, 5_000),
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["root".to_string()], vec!["a".to_string(), "b".to_string()]],
        );

        let stripped = block.stripped();
        assert_eq!(stripped.get_header(), block.get_header());
        assert_eq!(stripped.get_transaction_hashes(), block.get_transaction_hashes());
        assert!(stripped.get_merkle_tree().is_empty());
        // the header hash is unchanged by stripping
        assert_eq!(
            stripped.get_header().hash().unwrap(),
            block.get_header().hash().unwrap()
        );
    }
}
