use crate::core::TransactionIndex;
use crate::error::{NodeError, Result};
use crate::utils::sha256_hexdigest;

use crate::core::transaction::SENTINEL_HASH;

/// Merkle commitment over a block's transaction set.
///
/// The tree is stored as a list of levels with level 0 holding the root and
/// the last level holding the leaves. Leaves are ordered by the referenced
/// transaction's timestamp, not pool insertion order, so any party holding
/// the same transaction set and index rebuilds the identical tree.
pub struct MerkleTree;

impl MerkleTree {
    /// Build the full tree for a set of transaction hashes.
    ///
    /// Odd levels store the duplicated last element used for pairing, a
    /// single transaction yields `[[hash]]`, and an empty set yields no
    /// levels at all.
    pub fn build(tx_hashes: &[String], tx_index: &TransactionIndex) -> Result<Vec<Vec<String>>> {
        if tx_hashes.is_empty() {
            return Ok(Vec::new());
        }

        let mut leaves = Vec::with_capacity(tx_hashes.len());
        for hash in tx_hashes {
            let tx = tx_index.get(hash).ok_or_else(|| {
                NodeError::Transaction(format!("Transaction {hash} missing from index"))
            })?;
            leaves.push((tx.get_timestamp(), hash.clone()));
        }

        // Timestamp order, hash as tie-breaker for equal timestamps
        leaves.sort();
        let mut current: Vec<String> = leaves.into_iter().map(|(_, hash)| hash).collect();

        let mut levels: Vec<Vec<String>> = Vec::new();
        while current.len() > 1 {
            if current.len() % 2 != 0 {
                let last = current
                    .last()
                    .cloned()
                    .expect("Non-empty level always has a last element");
                current.push(last);
            }
            levels.push(current.clone());

            current = current
                .chunks(2)
                .map(|pair| Self::hash_pair(&pair[0], &pair[1]))
                .collect();
        }
        levels.push(current);
        levels.reverse();

        Ok(levels)
    }

    /// Commitment root for a transaction set. An empty set commits to the
    /// sentinel, which only ever happens for the genesis block.
    pub fn root(tx_hashes: &[String], tx_index: &TransactionIndex) -> Result<String> {
        let levels = Self::build(tx_hashes, tx_index)?;
        Ok(levels
            .first()
            .and_then(|level| level.first())
            .cloned()
            .unwrap_or_else(|| SENTINEL_HASH.to_string()))
    }

    /// Parent hash: double SHA-256 over the concatenated child hex digests.
    fn hash_pair(left: &str, right: &str) -> String {
        let combined = format!("{left}{right}");
        let first = sha256_hexdigest(combined.as_bytes());
        sha256_hexdigest(first.as_bytes())
    }
}
