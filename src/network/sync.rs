//! Conflict resolution: longest valid chain wins.
//!
//! The resolver queries only the single highest-announcing peer and accepts
//! its chain if it is longer and valid. That rule is preserved as specified
//! (a known weakness, not an oversight); what this module adds over the
//! bare rule is a correlation id per request and a timeout after which the
//! unresponsive peer is excluded for the round and the next-best peer is
//! asked instead.

use crate::network::PeerRegistry;
use crate::utils::current_timestamp;
use std::collections::HashSet;
use uuid::Uuid;

/// How long a `getdata` may stay unanswered before the resolver gives up on
/// that peer for the current round.
pub const SYNC_TIMEOUT_MS: i64 = 5_000;

/// What the node should do after a resolution step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Send `getdata` to this peer and await its `chain` response.
    Request { peer: String, request_id: String },
    /// No peer announces more than we hold; the node is synced.
    Synced,
}

#[derive(Debug, Clone)]
struct PendingRequest {
    peer: String,
    request_id: String,
    sent_at: i64,
}

#[derive(Debug, Default)]
pub struct ConflictResolver {
    pending: Option<PendingRequest>,
    excluded: HashSet<String>,
}

impl ConflictResolver {
    pub fn new() -> ConflictResolver {
        ConflictResolver {
            pending: None,
            excluded: HashSet::new(),
        }
    }

    /// Pick the next peer to ask. Peers that already failed or timed out
    /// this round are skipped; when nobody is left above our height the
    /// round ends and the exclusion set resets.
    pub fn resolve(&mut self, registry: &PeerRegistry, local_height: usize) -> SyncAction {
        match registry.best_peer_above(local_height, &self.excluded) {
            Some(peer) => {
                let request_id = Uuid::new_v4().to_string();
                self.pending = Some(PendingRequest {
                    peer: peer.clone(),
                    request_id: request_id.clone(),
                    sent_at: current_timestamp().unwrap_or(0),
                });
                SyncAction::Request { peer, request_id }
            }
            None => {
                self.pending = None;
                self.excluded.clear();
                SyncAction::Synced
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Does a `chain` response settle the outstanding request?
    pub fn matches(&self, peer: &str, request_id: &str) -> bool {
        match &self.pending {
            Some(pending) => pending.peer == peer && pending.request_id == request_id,
            None => false,
        }
    }

    /// The outstanding request was answered and accepted.
    pub fn complete(&mut self) {
        self.pending = None;
        self.excluded.clear();
    }

    /// The outstanding request failed (invalid chain or timeout); exclude
    /// the peer for this round so the next resolve tries someone else.
    pub fn fail_current(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.excluded.insert(pending.peer);
        }
    }

    pub fn timed_out(&self, now: i64) -> bool {
        match &self.pending {
            Some(pending) => now - pending.sent_at > SYNC_TIMEOUT_MS,
            None => false,
        }
    }
}
