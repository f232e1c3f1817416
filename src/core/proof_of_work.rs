use crate::utils::sha256_hexdigest;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

/// Hex leading-zero digits required of a winning digest. Constant by design;
/// there is no difficulty retargeting in this protocol.
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Number of worker threads racing over strided nonce ranges when a miner
/// node searches for a proof.
pub const MINING_WORKERS: usize = 4;

/// The proof-of-work predicate and search loop.
///
/// The challenge is the hash of the previous block's header, so each proof
/// commits to the exact chain it extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofOfWork {
    pub fn new() -> ProofOfWork {
        ProofOfWork {
            difficulty: DEFAULT_DIFFICULTY,
        }
    }

    /// Reduced difficulties keep tests fast; production nodes use the default.
    pub fn with_difficulty(difficulty: usize) -> ProofOfWork {
        ProofOfWork { difficulty }
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    /// True iff sha256(challenge + proof) carries the required zero prefix.
    pub fn valid_proof(&self, challenge: &str, proof: u64) -> bool {
        let guess = format!("{challenge}{proof}");
        let digest = sha256_hexdigest(guess.as_bytes());
        digest.as_bytes()[..self.difficulty].iter().all(|b| *b == b'0')
    }

    /// Linear scan from zero; returns the smallest satisfying nonce.
    pub fn mine(&self, challenge: &str) -> u64 {
        let mut proof = 0u64;
        while !self.valid_proof(challenge, proof) {
            proof += 1;
        }
        proof
    }

    /// Race `workers` threads over strided nonce ranges; the first find stops
    /// the others. Returns `None` if the cancel flag is raised before a proof
    /// is found (the chain tip moved underneath the miner).
    pub fn mine_parallel(
        &self,
        challenge: &str,
        workers: usize,
        cancel: &AtomicBool,
    ) -> Option<u64> {
        let workers = workers.max(1);
        let found = AtomicU64::new(u64::MAX);
        let stop = AtomicBool::new(false);

        thread::scope(|scope| {
            for offset in 0..workers {
                let found = &found;
                let stop = &stop;
                let pow = *self;
                scope.spawn(move || {
                    let mut proof = offset as u64;
                    loop {
                        if stop.load(Ordering::Relaxed) || cancel.load(Ordering::Relaxed) {
                            return;
                        }
                        if pow.valid_proof(challenge, proof) {
                            found.fetch_min(proof, Ordering::Relaxed);
                            stop.store(true, Ordering::Relaxed);
                            return;
                        }
                        proof += workers as u64;
                    }
                });
            }
        });

        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        match found.load(Ordering::Relaxed) {
            u64::MAX => None,
            proof => Some(proof),
        }
    }
}
