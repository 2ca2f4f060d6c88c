//! In-memory stand-in for a QUIC connection under test.

use qtrace_core::{Connection, Correlated, HookSlots, PacketKey, TlsSecrets};
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

/// A packet the simulated connection sent or received.
///
/// Like a real packet object it lives only as long as the caller keeps it;
/// the trace remembers its key, never the packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPacket {
    key: PacketKey,
    pub payload: Vec<u8>,
}

impl SimPacket {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: PacketKey::fresh(),
            payload: payload.into(),
        }
    }
}

impl Correlated for SimPacket {
    fn correlation_key(&self) -> PacketKey {
        self.key
    }
}

/// Fires hooks synchronously from `send` and `receive`, on the calling thread.
#[derive(Debug)]
pub struct SimConnection {
    hooks: HookSlots,
    secrets: Mutex<TlsSecrets>,
    peer: Option<SocketAddr>,
}

impl Default for SimConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConnection {
    pub fn new() -> Self {
        Self {
            hooks: HookSlots::new(),
            secrets: Mutex::new(TlsSecrets::default()),
            peer: None,
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn send(&self, payload: impl Into<Vec<u8>>) -> SimPacket {
        let packet = SimPacket::new(payload);
        self.send_packet(&packet);
        packet
    }

    pub fn receive(&self, payload: impl Into<Vec<u8>>) -> SimPacket {
        let packet = SimPacket::new(payload);
        self.receive_packet(&packet);
        packet
    }

    /// Send an existing packet again (a retransmission keeps its identity).
    pub fn send_packet(&self, packet: &SimPacket) {
        self.hooks.fire_sent(&packet.payload, packet.key);
    }

    pub fn receive_packet(&self, packet: &SimPacket) {
        self.hooks.fire_received(&packet.payload, packet.key);
    }

    /// Pretend the handshake derived these secrets.
    pub fn handshake(&self, secrets: TlsSecrets) {
        tracing::debug!(?secrets, "simulated handshake done");
        *self.secrets.lock().unwrap_or_else(PoisonError::into_inner) = secrets;
    }
}

impl Connection for SimConnection {
    fn hooks(&self) -> &HookSlots {
        &self.hooks
    }

    fn tls_secrets(&self) -> TlsSecrets {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}
