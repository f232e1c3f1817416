//! The byte-oriented transport boundary.
//!
//! The protocol core only needs a broadcast-capable `send` and a pollable
//! receive queue per interface; everything below that line (binding,
//! duplicate filtering, raw datagram handling) belongs to the transport.

use crate::error::{NodeError, Result};
use log::error;
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Largest payload a single UDP datagram can carry
const UDP_MAX_PACKET: usize = 65_507;
const UDP_READ_TIMEOUT: Duration = Duration::from_millis(200);

pub trait Transport: Send + Sync {
    /// Names of the receive interfaces this transport exposes.
    fn interfaces(&self) -> Vec<String>;

    /// Broadcast an encoded packet to every reachable peer.
    fn send(&self, payload: &[u8]) -> Result<()>;

    /// Non-blocking receive from one interface queue.
    fn poll(&self, interface: &str) -> Option<Vec<u8>>;
}

/// In-process message hub for tests and single-process simulations.
///
/// Every attached transport gets its own inbox; a send lands in every inbox
/// except the sender's own.
pub struct LocalHub {
    inboxes: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
}

impl LocalHub {
    pub fn new() -> Arc<LocalHub> {
        Arc::new(LocalHub {
            inboxes: Mutex::new(HashMap::new()),
        })
    }

    /// Register a named participant and hand back its transport endpoint.
    pub fn attach(self: &Arc<Self>, name: &str) -> LocalTransport {
        let mut inboxes = self
            .inboxes
            .lock()
            .expect("Failed to acquire lock on hub inboxes - this should never happen");
        inboxes.entry(name.to_string()).or_default();

        LocalTransport {
            hub: Arc::clone(self),
            name: name.to_string(),
        }
    }
}

/// One participant's endpoint on a [`LocalHub`].
pub struct LocalTransport {
    hub: Arc<LocalHub>,
    name: String,
}

impl Transport for LocalTransport {
    fn interfaces(&self) -> Vec<String> {
        vec!["local0".to_string()]
    }

    fn send(&self, payload: &[u8]) -> Result<()> {
        let mut inboxes = self
            .hub
            .inboxes
            .lock()
            .expect("Failed to acquire lock on hub inboxes - this should never happen");
        for (name, inbox) in inboxes.iter_mut() {
            if name != &self.name {
                inbox.push_back(payload.to_vec());
            }
        }
        Ok(())
    }

    fn poll(&self, _interface: &str) -> Option<Vec<u8>> {
        let mut inboxes = self
            .hub
            .inboxes
            .lock()
            .expect("Failed to acquire lock on hub inboxes - this should never happen");
        inboxes.get_mut(&self.name).and_then(|inbox| inbox.pop_front())
    }
}

/// UDP broadcast transport: one node per host and port, datagrams broadcast
/// to the local network. A reader thread drains the socket into the
/// interface queue so `poll` never blocks the dispatch loop.
pub struct UdpTransport {
    socket: UdpSocket,
    port: u16,
    queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl UdpTransport {
    pub fn bind(port: u16) -> Result<UdpTransport> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .map_err(|e| NodeError::Network(format!("Failed to bind UDP port {port}: {e}")))?;
        socket
            .set_broadcast(true)
            .map_err(|e| NodeError::Network(format!("Failed to enable broadcast: {e}")))?;

        let reader_socket = socket
            .try_clone()
            .map_err(|e| NodeError::Network(format!("Failed to clone socket: {e}")))?;
        reader_socket
            .set_read_timeout(Some(UDP_READ_TIMEOUT))
            .map_err(|e| NodeError::Network(format!("Failed to set read timeout: {e}")))?;

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let running = Arc::new(AtomicBool::new(true));

        let reader_queue = Arc::clone(&queue);
        let reader_running = Arc::clone(&running);
        let reader = thread::spawn(move || {
            let mut buf = vec![0u8; UDP_MAX_PACKET];
            while reader_running.load(Ordering::Relaxed) {
                match reader_socket.recv_from(&mut buf) {
                    Ok((len, _addr)) => {
                        let mut queue = reader_queue
                            .lock()
                            .expect("Failed to acquire lock on receive queue - this should never happen");
                        queue.push_back(buf[..len].to_vec());
                    }
                    Err(e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        error!("UDP receive failed: {e}");
                    }
                }
            }
        });

        Ok(UdpTransport {
            socket,
            port,
            queue,
            running,
            reader: Some(reader),
        })
    }
}

impl Transport for UdpTransport {
    fn interfaces(&self) -> Vec<String> {
        vec!["udp0".to_string()]
    }

    fn send(&self, payload: &[u8]) -> Result<()> {
        self.socket
            .send_to(payload, (Ipv4Addr::BROADCAST, self.port))
            .map_err(|e| NodeError::Network(format!("UDP send failed: {e}")))?;
        Ok(())
    }

    fn poll(&self, _interface: &str) -> Option<Vec<u8>> {
        let mut queue = self
            .queue
            .lock()
            .expect("Failed to acquire lock on receive queue - this should never happen");
        queue.pop_front()
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_broadcast_excludes_sender() {
        let hub = LocalHub::new();
        let a = hub.attach("a");
        let b = hub.attach("b");
        let c = hub.attach("c");

        a.send(b"hello").unwrap();

        assert_eq!(b.poll("local0"), Some(b"hello".to_vec()));
        assert_eq!(c.poll("local0"), Some(b"hello".to_vec()));
        assert_eq!(a.poll("local0"), None);
    }

    #[test]
    fn test_hub_queues_preserve_order() {
        let hub = LocalHub::new();
        let a = hub.attach("a");
        let b = hub.attach("b");

        a.send(b"one").unwrap();
        a.send(b"two").unwrap();

        assert_eq!(b.poll("local0"), Some(b"one".to_vec()));
        assert_eq!(b.poll("local0"), Some(b"two".to_vec()));
        assert_eq!(b.poll("local0"), None);
    }

    #[test]
    fn test_empty_queue_polls_none() {
        let hub = LocalHub::new();
        let a = hub.attach("a");
        assert_eq!(a.poll("local0"), None);
    }
}
