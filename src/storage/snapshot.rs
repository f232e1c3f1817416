use crate::core::{Block, Ledger, TransactionIndex};
use crate::error::{NodeError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Persisted ledger snapshot: the chain plus the transaction index.
///
/// Older snapshots named the index field `tx`; loading accepts both names,
/// writing always uses the canonical `tx_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub chain: Vec<Block>,
    #[serde(default, alias = "tx")]
    pub tx_info: TransactionIndex,
}

impl Snapshot {
    /// Read a snapshot from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Snapshot> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| NodeError::Io(format!("Failed to read {}: {e}", path.display())))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        info!(
            "Loaded snapshot from {} ({} blocks)",
            path.display(),
            snapshot.chain.len()
        );
        Ok(snapshot)
    }

    /// Capture a ledger's current chain and index.
    pub fn of(ledger: &Ledger) -> Snapshot {
        Snapshot {
            chain: ledger.get_chain().to_vec(),
            tx_info: ledger.get_tx_index().clone(),
        }
    }

    /// Write the snapshot to disk, pretty-printed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)
            .map_err(|e| NodeError::Io(format!("Failed to write {}: {e}", path.display())))?;
        info!(
            "Saved snapshot to {} ({} blocks)",
            path.display(),
            self.chain.len()
        );
        Ok(())
    }

    /// Turn the snapshot into a ledger. An empty chain triggers genesis
    /// synthesis; a loaded one skips it.
    pub fn into_ledger(self) -> Result<Ledger> {
        Ledger::with_chain(self.chain, self.tx_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProofOfWork, Transaction, SENTINEL_HASH};
    use tempfile::tempdir;

    fn test_ledger() -> Ledger {
        let mut ledger = Ledger::with_proof_of_work(
            ProofOfWork::with_difficulty(1),
            Vec::new(),
            TransactionIndex::new(),
        )
        .unwrap();

        let seed = Transaction::new("0", "Alice", 50, SENTINEL_HASH).unwrap();
        ledger.add_transaction(seed).unwrap();
        let challenge = ledger.last_block().get_header().hash().unwrap();
        let proof = ledger.proof_of_work().mine(&challenge);
        ledger.append_block(proof, Some(challenge)).unwrap();
        ledger
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let ledger = test_ledger();
        Snapshot::of(&ledger).save(&path).unwrap();

        let restored = Snapshot::load(&path).unwrap().into_ledger().unwrap();
        assert_eq!(restored.get_chain(), ledger.get_chain());
        assert_eq!(restored.get_tx_index(), ledger.get_tx_index());
    }

    #[test]
    fn test_snapshot_writes_canonical_field_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        Snapshot::of(&test_ledger()).save(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"tx_info\""));
        assert!(raw.contains("\"chain\""));
    }

    #[test]
    fn test_snapshot_accepts_legacy_index_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.json");

        let ledger = test_ledger();
        let legacy = serde_json::json!({
            "chain": ledger.get_chain(),
            "tx": ledger.get_tx_index(),
        });
        fs::write(&path, serde_json::to_string(&legacy).unwrap()).unwrap();

        let snapshot = Snapshot::load(&path).unwrap();
        assert_eq!(&snapshot.tx_info, ledger.get_tx_index());
    }

    #[test]
    fn test_empty_snapshot_triggers_genesis() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "{}").unwrap();

        let ledger = Snapshot::load(&path).unwrap().into_ledger().unwrap();
        assert_eq!(ledger.height(), 1);
        assert_eq!(ledger.last_block().get_header().get_previous_hash(), SENTINEL_HASH);
    }
}
