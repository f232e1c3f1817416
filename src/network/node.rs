// This is the node protocol - the state machine tying the ledger, the peer
// registry and the conflict resolver together over a broadcast transport.
// One dispatch thread per node owns the registry and consumes every inbound
// message; mining runs on its own workers and reports back over the same
// channel, so a long proof search never blocks dispatch.

use crate::core::{
    BlockHeader, Ledger, Transaction, TransactionIndex, MINING_WORKERS,
};
use crate::error::{NodeError, Result};
use crate::network::message::{
    encode_payload, AddBlockPayload, AddTxPayload, ChainPayload, Envelope, GetDataPayload,
    MessageKind, VersionPayload,
};
use crate::network::sync::{ConflictResolver, SyncAction};
use crate::network::{PeerRegistry, Transport};
use crate::utils::current_timestamp;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Backoff while every interface queue is empty.
const POLL_IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// What a node is allowed to do, as plain capabilities instead of a class
/// hierarchy. A role value fully determines full/miner/SPV behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Role {
    pub name: &'static str,
    /// May produce new blocks.
    pub can_mine: bool,
    /// Keeps transaction bodies and merkle levels; false means headers only.
    pub tracks_transactions: bool,
    /// Extra headers required on top of the containing block before a
    /// transaction counts as settled.
    pub confirmation_depth: usize,
}

impl Role {
    /// Maintains the full chain and independently verifies everything.
    pub const FULL: Role = Role {
        name: "full",
        can_mine: false,
        tracks_transactions: true,
        confirmation_depth: 0,
    };

    /// A full node that also produces blocks.
    pub const MINER: Role = Role {
        name: "miner",
        can_mine: true,
        tracks_transactions: true,
        confirmation_depth: 0,
    };

    /// Header-only client: six confirmations on top of the containing
    /// block before a transaction is treated as settled.
    pub const SPV: Role = Role {
        name: "spv",
        can_mine: false,
        tracks_transactions: false,
        confirmation_depth: 6,
    };
}

/// Commands and internal completions consumed by the dispatch loop.
enum NodeEvent {
    Announce,
    Resolve,
    Mine,
    SubmitTransaction(Transaction),
    MiningFinished { challenge: String, proof: u64 },
    Shutdown,
}

/// Public handle to a running node. All work happens on the dispatch
/// thread; the handle just posts commands and reads shared state.
pub struct Node {
    identifier: String,
    role: Role,
    ledger: Arc<Mutex<Ledger>>,
    events: Sender<NodeEvent>,
    ready: Arc<AtomicBool>,
    synced: Arc<AtomicBool>,
    dispatch: Option<JoinHandle<()>>,
}

impl Node {
    /// Start a node over its own explicitly-owned ledger. There is no shared
    /// default ledger; every caller passes the one this node will own.
    pub fn start(
        identifier: impl Into<String>,
        role: Role,
        ledger: Ledger,
        transport: Arc<dyn Transport>,
    ) -> Node {
        let identifier = identifier.into();
        let ledger = Arc::new(Mutex::new(ledger));
        let ready = Arc::new(AtomicBool::new(false));
        let synced = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let (events_tx, events_rx) = mpsc::channel();

        let protocol = NodeProtocol {
            identifier: identifier.clone(),
            role,
            ledger: Arc::clone(&ledger),
            transport,
            peers: PeerRegistry::new(),
            resolver: ConflictResolver::new(),
            events: events_rx,
            loopback: events_tx.clone(),
            ready: Arc::clone(&ready),
            synced: Arc::clone(&synced),
            running,
            mining_cancel: None,
        };

        let dispatch = thread::spawn(move || protocol.run());

        Node {
            identifier,
            role,
            ledger,
            events: events_tx,
            ready,
            synced,
            dispatch: Some(dispatch),
        }
    }

    pub fn get_identifier(&self) -> &str {
        self.identifier.as_str()
    }

    pub fn get_role(&self) -> Role {
        self.role
    }

    /// Shared ledger handle for inspection and snapshotting. Hold the lock
    /// briefly; the dispatch loop takes it for every mutation.
    pub fn ledger(&self) -> Arc<Mutex<Ledger>> {
        Arc::clone(&self.ledger)
    }

    pub fn height(&self) -> usize {
        self.ledger
            .lock()
            .expect("Failed to acquire lock on ledger - this should never happen")
            .height()
    }

    /// True once at least one peer completed the handshake.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// True once conflict resolution decided the local chain is current.
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }

    /// Broadcast our `version` so peers can register us.
    pub fn announce(&self) {
        let _ = self.events.send(NodeEvent::Announce);
    }

    /// Kick off chain synchronization against the best-announcing peer.
    pub fn resolve_conflicts(&self) {
        let _ = self.events.send(NodeEvent::Resolve);
    }

    /// Ask the node to produce a block. Only roles with `can_mine` accept.
    pub fn mine(&self) -> Result<()> {
        if !self.role.can_mine {
            return Err(NodeError::Mining(format!(
                "Role '{}' cannot mine",
                self.role.name
            )));
        }
        self.events
            .send(NodeEvent::Mine)
            .map_err(|_| NodeError::Mining("Node is shut down".to_string()))
    }

    /// Submit a transaction locally; accepted transactions are broadcast
    /// as `addtx`.
    pub fn submit_transaction(&self, tx: Transaction) {
        let _ = self.events.send(NodeEvent::SubmitTransaction(tx));
    }

    /// Settlement policy: the containing block plus `confirmation_depth`
    /// blocks on top of it.
    pub fn settled(&self, tx_hash: &str) -> bool {
        let ledger = self
            .ledger
            .lock()
            .expect("Failed to acquire lock on ledger - this should never happen");
        match ledger.find_transaction_block(tx_hash) {
            Some(position) => ledger.height() >= position + 1 + self.role.confirmation_depth,
            None => false,
        }
    }

    pub fn stop(&mut self) {
        if let Some(dispatch) = self.dispatch.take() {
            let _ = self.events.send(NodeEvent::Shutdown);
            let _ = dispatch.join();
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The dispatch-side state machine. Sole mutator of the peer registry and
/// sole consumer of inbound packets.
struct NodeProtocol {
    identifier: String,
    role: Role,
    ledger: Arc<Mutex<Ledger>>,
    transport: Arc<dyn Transport>,
    peers: PeerRegistry,
    resolver: ConflictResolver,
    events: Receiver<NodeEvent>,
    loopback: Sender<NodeEvent>,
    ready: Arc<AtomicBool>,
    synced: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    mining_cancel: Option<Arc<AtomicBool>>,
}

impl NodeProtocol {
    fn run(mut self) {
        while self.running.load(Ordering::Relaxed) {
            let mut idle = true;

            while let Ok(event) = self.events.try_recv() {
                idle = false;
                if !self.handle_event(event) {
                    self.running.store(false, Ordering::Relaxed);
                    self.cancel_mining();
                    return;
                }
            }

            for interface in self.transport.interfaces() {
                while let Some(packet) = self.transport.poll(&interface) {
                    idle = false;
                    self.receive(&packet, &interface);
                }
            }

            self.check_sync_timeout();

            if idle {
                thread::sleep(POLL_IDLE_BACKOFF);
            }
        }
        self.cancel_mining();
    }

    /// Returns false when the loop should stop.
    fn handle_event(&mut self, event: NodeEvent) -> bool {
        match event {
            NodeEvent::Announce => self.announce(),
            NodeEvent::Resolve => self.resolve_conflicts(),
            NodeEvent::Mine => self.start_mining(),
            NodeEvent::SubmitTransaction(tx) => self.submit_transaction(tx),
            NodeEvent::MiningFinished { challenge, proof } => self.finish_mining(challenge, proof),
            NodeEvent::Shutdown => return false,
        }
        true
    }

    // A decode failure drops the packet and keeps the loop alive; an
    // unknown type is ignored without noise; a foreign target is filtered
    // before dispatch.
    fn receive(&mut self, packet: &[u8], interface: &str) {
        let envelope = match Envelope::decode(packet) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping packet on {interface}: {e}");
                return;
            }
        };

        if envelope.identifier == self.identifier {
            return; // our own broadcast echoed back by the transport
        }
        if !envelope.target.is_empty() && envelope.target != self.identifier {
            return;
        }

        let kind = match MessageKind::parse(&envelope.kind) {
            Some(kind) => kind,
            None => return,
        };

        self.peers.record_recv(&envelope.identifier);

        match kind {
            MessageKind::Version => self.handle_version(&envelope),
            MessageKind::Verack => self.handle_verack(&envelope),
            MessageKind::GetData => self.handle_getdata(&envelope),
            MessageKind::Chain => self.handle_chain(&envelope),
            MessageKind::AddBlock => self.handle_addblock(&envelope),
            MessageKind::AddTx => self.handle_addtx(&envelope),
        }
    }

    fn handle_version(&mut self, envelope: &Envelope) {
        let payload: VersionPayload = match envelope.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping version from {}: {e}", envelope.identifier);
                return;
            }
        };

        let sender = envelope.identifier.as_str();
        if self.peers.register(sender, payload.height) {
            info!("Registered peer {sender} at height {}", payload.height);

            // First contact: acknowledge and introduce ourselves back
            self.send(MessageKind::Verack, String::new(), sender);
            match encode_payload(&VersionPayload {
                height: self.height(),
            }) {
                Ok(message) => self.send(MessageKind::Version, message, sender),
                Err(e) => error!("Failed to encode version payload: {e}"),
            }
        }
    }

    fn handle_verack(&mut self, envelope: &Envelope) {
        self.peers.mark_acked(&envelope.identifier);
        self.ready.store(true, Ordering::Relaxed);
    }

    fn handle_getdata(&mut self, envelope: &Envelope) {
        let payload: GetDataPayload = match envelope.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping getdata from {}: {e}", envelope.identifier);
                return;
            }
        };

        let (chain, tx_info) = {
            let ledger = self.lock_ledger();
            if self.role.tracks_transactions {
                (ledger.get_chain().to_vec(), ledger.get_tx_index().clone())
            } else {
                // Header-only peers answer with stripped blocks and no bodies
                (
                    ledger.get_chain().iter().map(|b| b.stripped()).collect(),
                    TransactionIndex::new(),
                )
            }
        };

        let response = ChainPayload {
            chain,
            tx_info,
            request_id: payload.request_id,
        };
        match encode_payload(&response) {
            Ok(message) => self.send(MessageKind::Chain, message, &envelope.identifier),
            Err(e) => error!("Failed to encode chain payload: {e}"),
        }
    }

    fn handle_chain(&mut self, envelope: &Envelope) {
        let payload: ChainPayload = match envelope.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping chain from {}: {e}", envelope.identifier);
                return;
            }
        };

        let sender = envelope.identifier.as_str();
        self.peers.update_height(sender, payload.chain.len());
        let solicited = self.resolver.matches(sender, &payload.request_id);

        let accepted = {
            let mut ledger = self.lock_ledger();
            let valid = if self.role.tracks_transactions {
                ledger.validate_chain(&payload.chain)
            } else {
                let headers: Vec<BlockHeader> = payload
                    .chain
                    .iter()
                    .map(|b| b.get_header().clone())
                    .collect();
                ledger.validate_headers(&headers)
            };

            if valid {
                if self.role.tracks_transactions {
                    ledger.replace_chain(payload.chain, payload.tx_info);
                } else {
                    let stripped = payload.chain.iter().map(|b| b.stripped()).collect();
                    ledger.replace_chain(stripped, TransactionIndex::new());
                }
                true
            } else {
                false
            }
        };

        if accepted {
            // The chain we were mining on may just have been discarded
            self.cancel_mining();
            self.synced.store(true, Ordering::Relaxed);
            if solicited {
                self.resolver.complete();
            }
        } else {
            warn!("Received invalid chain from {sender}, asking another peer");
            if solicited {
                self.resolver.fail_current();
            }
            self.resolve_conflicts();
        }
    }

    fn handle_addblock(&mut self, envelope: &Envelope) {
        let payload: AddBlockPayload = match envelope.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping addblock from {}: {e}", envelope.identifier);
                return;
            }
        };

        let sender = envelope.identifier.as_str();
        self.peers.update_height(sender, payload.height);

        let (block, incoming) = if self.role.tracks_transactions {
            (payload.block, payload.tx_info)
        } else {
            (payload.block.stripped(), TransactionIndex::new())
        };

        let extended = self.lock_ledger().try_extend(block, incoming);
        if extended {
            info!("Accepted block from {sender}");
            self.cancel_mining();
        } else {
            // Never a partial apply: the chain is untouched and we fall back
            // to full resolution instead of silently discarding
            warn!("Block from {sender} does not extend local chain, resolving conflicts");
            self.resolve_conflicts();
        }
    }

    fn handle_addtx(&mut self, envelope: &Envelope) {
        if !self.role.tracks_transactions {
            return;
        }

        let payload: AddTxPayload = match envelope.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping addtx from {}: {e}", envelope.identifier);
                return;
            }
        };

        // Re-run the mempool validator; rejection is logged, not answered
        self.lock_ledger().add_transaction(payload.tx);
    }

    fn announce(&mut self) {
        match encode_payload(&VersionPayload {
            height: self.height(),
        }) {
            Ok(message) => self.send(MessageKind::Version, message, ""),
            Err(e) => error!("Failed to encode version payload: {e}"),
        }
    }

    fn resolve_conflicts(&mut self) {
        let height = self.height();
        match self.resolver.resolve(&self.peers, height) {
            SyncAction::Request { peer, request_id } => {
                info!("Requesting chain from {peer}");
                match encode_payload(&GetDataPayload { request_id }) {
                    Ok(message) => self.send(MessageKind::GetData, message, &peer),
                    Err(e) => error!("Failed to encode getdata payload: {e}"),
                }
            }
            SyncAction::Synced => {
                self.synced.store(true, Ordering::Relaxed);
            }
        }
    }

    fn submit_transaction(&mut self, tx: Transaction) {
        let accepted = self.lock_ledger().add_transaction(tx.clone());
        if accepted.is_none() {
            return;
        }

        match encode_payload(&AddTxPayload { tx }) {
            Ok(message) => self.send(MessageKind::AddTx, message, ""),
            Err(e) => error!("Failed to encode addtx payload: {e}"),
        }
    }

    // Mining happens on worker threads racing over nonce ranges; the
    // dispatch loop stays responsive and learns of completion through the
    // event channel.
    fn start_mining(&mut self) {
        if !self.role.can_mine {
            warn!("Ignoring mine request: role '{}' cannot mine", self.role.name);
            return;
        }
        if self.mining_cancel.is_some() {
            warn!("Ignoring mine request: mining already in progress");
            return;
        }

        let (challenge, pow) = {
            let ledger = self.lock_ledger();
            let challenge = match ledger.last_block().get_header().hash() {
                Ok(challenge) => challenge,
                Err(e) => {
                    error!("Failed to hash chain tip: {e}");
                    return;
                }
            };
            (challenge, ledger.proof_of_work())
        };

        let cancel = Arc::new(AtomicBool::new(false));
        self.mining_cancel = Some(Arc::clone(&cancel));
        let loopback = self.loopback.clone();

        info!("{} is mining", self.identifier);
        thread::spawn(move || {
            if let Some(proof) = pow.mine_parallel(&challenge, MINING_WORKERS, &cancel) {
                let _ = loopback.send(NodeEvent::MiningFinished { challenge, proof });
            }
        });
    }

    fn finish_mining(&mut self, challenge: String, proof: u64) {
        self.mining_cancel = None;

        let broadcast = {
            let mut ledger = self.lock_ledger();
            let tip = match ledger.last_block().get_header().hash() {
                Ok(tip) => tip,
                Err(e) => {
                    error!("Failed to hash chain tip: {e}");
                    return;
                }
            };

            // The chain may have been replaced or extended while we searched;
            // a proof for a stale tip must never be appended
            if tip != challenge {
                warn!("Discarding stale proof: chain tip moved while mining");
                return;
            }

            let reward = match Transaction::new_reward(&self.identifier) {
                Ok(reward) => reward,
                Err(e) => {
                    error!("Failed to create reward transaction: {e}");
                    return;
                }
            };
            // Injected directly into our own pool, bypassing external submission
            self.loopback_reward(&mut ledger, reward);

            let block = match ledger.append_block(proof, Some(challenge)) {
                Ok(block) => block,
                Err(e) => {
                    error!("Failed to append mined block: {e}");
                    return;
                }
            };

            AddBlockPayload {
                block,
                tx_info: ledger.get_tx_index().clone(),
                height: ledger.height(),
            }
        };

        info!("Mined block at height {}", broadcast.height);
        match encode_payload(&broadcast) {
            Ok(message) => self.send(MessageKind::AddBlock, message, ""),
            Err(e) => error!("Failed to encode addblock payload: {e}"),
        }
    }

    fn loopback_reward(&self, ledger: &mut Ledger, reward: Transaction) {
        // Sentinel spends are unconditionally valid, so this cannot fail
        // for validation reasons; a hashing failure is still logged inside
        if ledger.add_transaction(reward).is_none() {
            error!("Reward transaction was rejected");
        }
    }

    fn cancel_mining(&mut self) {
        if let Some(cancel) = self.mining_cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    fn check_sync_timeout(&mut self) {
        let now = match current_timestamp() {
            Ok(now) => now,
            Err(_) => return,
        };
        if self.resolver.timed_out(now) {
            warn!("Chain request timed out, retrying with another peer");
            self.resolver.fail_current();
            self.resolve_conflicts();
        }
    }

    fn send(&mut self, kind: MessageKind, message: String, target: &str) {
        let envelope = Envelope::new(kind, &self.identifier, message, target);
        match envelope.encode() {
            Ok(bytes) => {
                if let Err(e) = self.transport.send(&bytes) {
                    error!("Failed to send {}: {e}", kind.as_str());
                    return;
                }
                if !target.is_empty() {
                    self.peers.record_send(target);
                }
            }
            Err(e) => error!("Failed to encode {}: {e}", kind.as_str()),
        }
    }

    fn height(&self) -> usize {
        self.lock_ledger().height()
    }

    fn lock_ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger
            .lock()
            .expect("Failed to acquire lock on ledger - this should never happen")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProofOfWork, SENTINEL_HASH};
    use crate::network::LocalHub;

    fn test_ledger() -> Ledger {
        Ledger::with_proof_of_work(
            ProofOfWork::with_difficulty(1),
            Vec::new(),
            TransactionIndex::new(),
        )
        .unwrap()
    }

    // Seed a ledger with one spendable transaction and `blocks` mined blocks
    fn ledger_with_blocks(blocks: usize) -> (Ledger, String) {
        let mut ledger = test_ledger();
        let seed = Transaction::new("0", "Alice", 50, SENTINEL_HASH).unwrap();
        let tx_hash = ledger.add_transaction(seed).unwrap();

        for _ in 0..blocks {
            let challenge = ledger.last_block().get_header().hash().unwrap();
            let proof = ledger.proof_of_work().mine(&challenge);
            ledger.append_block(proof, Some(challenge)).unwrap();
        }
        (ledger, tx_hash)
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::MINER.can_mine);
        assert!(!Role::FULL.can_mine);
        assert!(!Role::SPV.can_mine);
        assert!(!Role::SPV.tracks_transactions);
        assert_eq!(Role::SPV.confirmation_depth, 6);
        assert_eq!(Role::FULL.confirmation_depth, 0);
    }

    #[test]
    fn test_mine_is_refused_for_non_miner_roles() {
        let hub = LocalHub::new();
        let node = Node::start(
            "node-full",
            Role::FULL,
            test_ledger(),
            Arc::new(hub.attach("node-full")),
        );
        assert!(node.mine().is_err());
    }

    #[test]
    fn test_full_node_settlement_needs_one_confirmation() {
        let hub = LocalHub::new();
        let (ledger, tx_hash) = ledger_with_blocks(1);
        let node = Node::start(
            "node-full",
            Role::FULL,
            ledger,
            Arc::new(hub.attach("node-full")),
        );

        assert!(node.settled(&tx_hash));
        assert!(!node.settled("unknown-hash"));
    }

    #[test]
    fn test_spv_settlement_needs_seven_headers() {
        let hub = LocalHub::new();

        // Containing block only: 1 confirmation, SPV wants 7
        let (shallow, tx_hash) = ledger_with_blocks(1);
        let node = Node::start("spv-1", Role::SPV, shallow, Arc::new(hub.attach("spv-1")));
        assert!(!node.settled(&tx_hash));

        // Containing block plus six successors
        let (deep, tx_hash) = ledger_with_blocks(7);
        let node = Node::start("spv-2", Role::SPV, deep, Arc::new(hub.attach("spv-2")));
        assert!(node.settled(&tx_hash));
    }
}
