// Accept/reject logic for a transaction entering the pending pool.
// This is a single-hop spend-chain check, not a balance ledger: a transaction
// must name a previous transaction whose recipient it is and whose amount
// covers it. It does not stop two transactions from naming the same
// previous_hash - that behavior is inherited and deliberate.

use crate::core::{Transaction, TransactionIndex};

pub struct MempoolValidator;

impl MempoolValidator {
    /// Check a transaction against the spend-chain rule. Returns the reject
    /// reason so the caller can log it; acceptance carries no data.
    pub fn check(tx: &Transaction, tx_index: &TransactionIndex) -> Result<(), String> {
        if tx.get_sender().is_empty()
            || tx.get_recipient().is_empty()
            || tx.get_previous_hash().is_empty()
        {
            return Err("missing required fields".to_string());
        }

        // Sentinel spends are unconditional: genesis seeding and mining rewards
        if tx.spends_nothing() {
            return Ok(());
        }

        let prev = match tx_index.get(tx.get_previous_hash()) {
            Some(prev) => prev,
            None => {
                return Err(format!(
                    "previous transaction {} not in index",
                    tx.get_previous_hash()
                ))
            }
        };

        if prev.get_recipient() != tx.get_sender() {
            return Err(format!(
                "sender {} does not own the referenced transaction (recipient was {})",
                tx.get_sender(),
                prev.get_recipient()
            ));
        }

        if prev.get_amount() < tx.get_amount() {
            return Err(format!(
                "amount {} exceeds referenced amount {}",
                tx.get_amount(),
                prev.get_amount()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::SENTINEL_HASH;

    fn seed(recipient: &str, amount: u64) -> Transaction {
        Transaction::new_with_timestamp("0", recipient, amount, SENTINEL_HASH, 1_000)
    }

    #[test]
    fn test_sentinel_spend_is_always_accepted() {
        // Even a completely fresh index accepts sentinel spends
        let index = TransactionIndex::new();
        assert!(MempoolValidator::check(&seed("Alice", 50), &index).is_ok());
    }

    #[test]
    fn test_spend_chain_scenario() {
        let mut index = TransactionIndex::new();

        // A: 50 to Alice from nothing
        let a = seed("Alice", 50);
        let h1 = a.id().unwrap();
        assert!(MempoolValidator::check(&a, &index).is_ok());
        index.insert(h1.clone(), a);

        // B: Alice sends 30 of A to Bob - accepted
        let b = Transaction::new_with_timestamp("Alice", "Bob", 30, &h1, 2_000);
        assert!(MempoolValidator::check(&b, &index).is_ok());
        index.insert(b.id().unwrap(), b);

        // C: Bob tries to spend A, which belongs to Alice - rejected
        let c = Transaction::new_with_timestamp("Bob", "Carl", 30, &h1, 3_000);
        assert!(MempoolValidator::check(&c, &index).is_err());
    }

    #[test]
    fn test_unknown_previous_hash_is_rejected() {
        let index = TransactionIndex::new();
        let tx = Transaction::new_with_timestamp("Alice", "Bob", 10, "no-such-hash", 1_000);
        assert!(MempoolValidator::check(&tx, &index).is_err());
    }

    #[test]
    fn test_overspend_is_rejected() {
        let mut index = TransactionIndex::new();
        let a = seed("Alice", 50);
        let h1 = a.id().unwrap();
        index.insert(h1.clone(), a);

        let overspend = Transaction::new_with_timestamp("Alice", "Bob", 51, &h1, 2_000);
        assert!(MempoolValidator::check(&overspend, &index).is_err());

        let exact = Transaction::new_with_timestamp("Alice", "Bob", 50, &h1, 2_000);
        assert!(MempoolValidator::check(&exact, &index).is_ok());
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let index = TransactionIndex::new();
        let no_sender = Transaction::new_with_timestamp("", "Bob", 10, SENTINEL_HASH, 1_000);
        assert!(MempoolValidator::check(&no_sender, &index).is_err());
        let no_recipient = Transaction::new_with_timestamp("Alice", "", 10, SENTINEL_HASH, 1_000);
        assert!(MempoolValidator::check(&no_recipient, &index).is_err());
    }

    #[test]
    fn test_same_previous_hash_can_be_spent_twice() {
        // Known limitation of the spend-chain rule: it is not a UTXO set
        let mut index = TransactionIndex::new();
        let a = seed("Alice", 50);
        let h1 = a.id().unwrap();
        index.insert(h1.clone(), a);

        let first = Transaction::new_with_timestamp("Alice", "Bob", 20, &h1, 2_000);
        let second = Transaction::new_with_timestamp("Alice", "Carl", 20, &h1, 3_000);
        assert!(MempoolValidator::check(&first, &index).is_ok());
        index.insert(first.id().unwrap(), first);
        assert!(MempoolValidator::check(&second, &index).is_ok());
    }
}
