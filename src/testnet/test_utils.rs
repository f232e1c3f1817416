//! Test utilities for ledger and protocol testing

use crate::core::{Ledger, ProofOfWork, Transaction, TransactionIndex, SENTINEL_HASH};
use crate::error::Result;

/// Difficulty used by tests; one hex zero keeps mining effectively instant.
pub const TEST_DIFFICULTY: usize = 1;

/// Create a ledger at test difficulty with a fresh genesis block.
pub fn create_test_ledger() -> Result<Ledger> {
    Ledger::with_proof_of_work(
        ProofOfWork::with_difficulty(TEST_DIFFICULTY),
        Vec::new(),
        TransactionIndex::new(),
    )
}

/// Mine a real proof for the ledger's tip and append a block with the
/// current pool.
pub fn mine_next_block(ledger: &mut Ledger) -> Result<()> {
    let challenge = ledger.last_block().get_header().hash()?;
    let proof = ledger.proof_of_work().mine(&challenge);
    ledger.append_block(proof, Some(challenge))?;
    Ok(())
}

/// Seed a ledger with one sentinel-spend transaction and mine it into a
/// block; returns the transaction hash.
pub fn seed_and_mine(ledger: &mut Ledger, recipient: &str, amount: u64) -> Result<String> {
    let seed = Transaction::new(SENTINEL_HASH, recipient, amount, SENTINEL_HASH)?;
    let tx_hash = ledger
        .add_transaction(seed)
        .expect("Sentinel spends are always accepted");
    mine_next_block(ledger)?;
    Ok(tx_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_ledger() {
        let ledger = create_test_ledger().unwrap();
        assert_eq!(ledger.height(), 1);
        assert_eq!(ledger.proof_of_work().get_difficulty(), TEST_DIFFICULTY);
    }

    #[test]
    fn test_seed_and_mine_extends_chain() {
        let mut ledger = create_test_ledger().unwrap();
        let tx_hash = seed_and_mine(&mut ledger, "Alice", 50).unwrap();

        assert_eq!(ledger.height(), 2);
        assert!(ledger.last_block().contains_transaction(&tx_hash));
        assert!(ledger.validate_chain(ledger.get_chain()));
    }
}
