// This file implements the transaction model - the unit of value moving through the ledger
// There is no UTXO set here: each transaction points at the one it spends via previous_hash,
// and the sentinel "0" marks seed/reward transactions that spend nothing

use crate::error::Result;
use crate::utils::{current_timestamp, hash_object};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved previous-hash marking a transaction that spends nothing
/// (genesis seeding and the miner's reward transaction).
pub const SENTINEL_HASH: &str = "0";

/// Fixed reward paid to the miner of each block.
pub const MINING_REWARD: u64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    recipient: String,
    amount: u64,
    previous_hash: String,
    timestamp: i64,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
        previous_hash: impl Into<String>,
    ) -> Result<Transaction> {
        Ok(Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            previous_hash: previous_hash.into(),
            timestamp: current_timestamp()?,
        })
    }

    /// The special transaction a miner injects into its own pool when a block
    /// is produced. Spends nothing, so the validator accepts it unconditionally.
    pub fn new_reward(recipient: &str) -> Result<Transaction> {
        Transaction::new(SENTINEL_HASH, recipient, MINING_REWARD, SENTINEL_HASH)
    }

    /// Create a transaction with an explicit timestamp (for testing only)
    #[cfg(test)]
    pub fn new_with_timestamp(
        sender: &str,
        recipient: &str,
        amount: u64,
        previous_hash: &str,
        timestamp: i64,
    ) -> Transaction {
        Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            previous_hash: previous_hash.to_string(),
            timestamp,
        }
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Transaction identity: double hash of the canonical serialization.
    /// The outer hash is applied to the inner 64-character digest string.
    pub fn id(&self) -> Result<String> {
        let inner = hash_object(self)?;
        hash_object(&inner)
    }

    /// True when this transaction spends nothing (seed or mining reward).
    pub fn spends_nothing(&self) -> bool {
        self.previous_hash == SENTINEL_HASH
    }
}

/// Append-only mapping from transaction hash to transaction.
///
/// Entries are never removed or mutated once inserted, and the sentinel key
/// `"0"` always maps to no transaction. Merging with a peer's index keeps
/// local entries (first writer wins per key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionIndex {
    inner: HashMap<String, Option<Transaction>>,
}

impl Default for TransactionIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionIndex {
    pub fn new() -> TransactionIndex {
        let mut inner = HashMap::new();
        inner.insert(SENTINEL_HASH.to_string(), None);
        TransactionIndex { inner }
    }

    /// Re-establish the sentinel entry after deserializing external data.
    pub fn ensure_sentinel(&mut self) {
        self.inner.entry(SENTINEL_HASH.to_string()).or_insert(None);
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.inner.contains_key(hash)
    }

    /// Look up the transaction stored under a hash. The sentinel key exists
    /// but resolves to no transaction.
    pub fn get(&self, hash: &str) -> Option<&Transaction> {
        self.inner.get(hash).and_then(|entry| entry.as_ref())
    }

    /// Insert a transaction under its hash. Existing entries are left
    /// untouched; the index is append-only.
    pub fn insert(&mut self, hash: String, tx: Transaction) {
        self.inner.entry(hash).or_insert(Some(tx));
    }

    /// Merge a peer's index into this one, first writer wins per key.
    pub fn merge(&mut self, other: TransactionIndex) {
        for (hash, entry) in other.inner {
            self.inner.entry(hash).or_insert(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
