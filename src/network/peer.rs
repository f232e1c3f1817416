use crate::utils::current_timestamp;
use std::collections::{HashMap, HashSet};

/// Per-peer handshake progression. A peer we have never heard from is
/// `Unknown`, a received `version` moves it to `Announced`, and a `verack`
/// completes the handshake at `Acked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Unknown,
    Announced,
    Acked,
}

/// Bookkeeping for one known peer.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    identifier: String,
    state: HandshakeState,
    last_send: Option<i64>,
    last_recv: Option<i64>,
    announced_height: usize,
}

impl PeerInfo {
    pub fn get_identifier(&self) -> &str {
        self.identifier.as_str()
    }

    pub fn get_state(&self) -> HandshakeState {
        self.state
    }

    pub fn get_last_send(&self) -> Option<i64> {
        self.last_send
    }

    pub fn get_last_recv(&self) -> Option<i64> {
        self.last_recv
    }

    pub fn get_announced_height(&self) -> usize {
        self.announced_height
    }
}

/// Registry of known peers. Owned and mutated exclusively by the node's
/// dispatch loop, so it needs no internal locking.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<String, PeerInfo>,
}

impl PeerRegistry {
    pub fn new() -> PeerRegistry {
        PeerRegistry {
            peers: HashMap::new(),
        }
    }

    /// Register a peer announced via `version`. Returns true when the peer
    /// is new; known peers only get their height refreshed.
    pub fn register(&mut self, identifier: &str, height: usize) -> bool {
        if self.peers.contains_key(identifier) {
            self.update_height(identifier, height);
            return false;
        }

        self.peers.insert(
            identifier.to_string(),
            PeerInfo {
                identifier: identifier.to_string(),
                state: HandshakeState::Announced,
                last_send: None,
                last_recv: current_timestamp().ok(),
                announced_height: height,
            },
        );
        true
    }

    pub fn mark_acked(&mut self, identifier: &str) {
        if let Some(peer) = self.peers.get_mut(identifier) {
            peer.state = HandshakeState::Acked;
        }
    }

    pub fn state_of(&self, identifier: &str) -> HandshakeState {
        self.peers
            .get(identifier)
            .map(|peer| peer.state)
            .unwrap_or(HandshakeState::Unknown)
    }

    pub fn get(&self, identifier: &str) -> Option<&PeerInfo> {
        self.peers.get(identifier)
    }

    pub fn is_known(&self, identifier: &str) -> bool {
        self.peers.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Heights are self-reported and refreshed opportunistically from any
    /// message that reveals one.
    pub fn update_height(&mut self, identifier: &str, height: usize) {
        if let Some(peer) = self.peers.get_mut(identifier) {
            peer.announced_height = height;
        }
    }

    pub fn record_send(&mut self, identifier: &str) {
        if let Some(peer) = self.peers.get_mut(identifier) {
            peer.last_send = current_timestamp().ok();
        }
    }

    pub fn record_recv(&mut self, identifier: &str) {
        if let Some(peer) = self.peers.get_mut(identifier) {
            peer.last_recv = current_timestamp().ok();
        }
    }

    /// The peer with the strictly greatest announced height above `height`,
    /// skipping excluded peers. This is the consensus rule's single-peer
    /// selection: no fan-out, no quorum.
    pub fn best_peer_above(&self, height: usize, excluded: &HashSet<String>) -> Option<String> {
        let mut best_height = height;
        let mut best_peer = None;

        for peer in self.peers.values() {
            if excluded.contains(peer.get_identifier()) {
                continue;
            }
            if peer.announced_height > best_height {
                best_height = peer.announced_height;
                best_peer = Some(peer.identifier.clone());
            }
        }

        best_peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_progression() {
        let mut registry = PeerRegistry::new();
        assert_eq!(registry.state_of("peer-a"), HandshakeState::Unknown);

        assert!(registry.register("peer-a", 1));
        assert_eq!(registry.state_of("peer-a"), HandshakeState::Announced);

        registry.mark_acked("peer-a");
        assert_eq!(registry.state_of("peer-a"), HandshakeState::Acked);
    }

    #[test]
    fn test_reregistration_refreshes_height_only() {
        let mut registry = PeerRegistry::new();
        assert!(registry.register("peer-a", 1));
        registry.mark_acked("peer-a");

        assert!(!registry.register("peer-a", 9));
        assert_eq!(registry.get("peer-a").unwrap().get_announced_height(), 9);
        assert_eq!(registry.state_of("peer-a"), HandshakeState::Acked);
    }

    #[test]
    fn test_best_peer_selects_greatest_height() {
        let mut registry = PeerRegistry::new();
        registry.register("peer-a", 1);
        registry.register("peer-b", 3);
        registry.register("peer-c", 5);

        let best = registry.best_peer_above(2, &HashSet::new());
        assert_eq!(best.as_deref(), Some("peer-c"));
    }

    #[test]
    fn test_best_peer_requires_strictly_greater_height() {
        let mut registry = PeerRegistry::new();
        registry.register("peer-a", 2);

        assert_eq!(registry.best_peer_above(2, &HashSet::new()), None);
        assert_eq!(registry.best_peer_above(3, &HashSet::new()), None);
    }

    #[test]
    fn test_best_peer_skips_excluded() {
        let mut registry = PeerRegistry::new();
        registry.register("peer-b", 3);
        registry.register("peer-c", 5);

        let mut excluded = HashSet::new();
        excluded.insert("peer-c".to_string());

        let best = registry.best_peer_above(2, &excluded);
        assert_eq!(best.as_deref(), Some("peer-b"));
    }

    #[test]
    fn test_send_recv_stamps() {
        let mut registry = PeerRegistry::new();
        registry.register("peer-a", 1);

        let peer = registry.get("peer-a").unwrap();
        assert!(peer.get_last_recv().is_some());
        assert!(peer.get_last_send().is_none());

        registry.record_send("peer-a");
        assert!(registry.get("peer-a").unwrap().get_last_send().is_some());
    }
}
