//! The connection capability the recorder attaches to.
//!
//! A connection under test owns a [`HookSlots`] registry and fires it from its
//! send and receive paths. There is exactly one subscriber per direction:
//! registering a hook replaces whatever was there before and hands the old one
//! back to the caller.

use crate::packet::{Direction, PacketKey};
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

/// Callback fired with the clear-text bytes of a packet and the key of the
/// packet object that produced them.
pub type PacketHook = Arc<dyn Fn(&[u8], PacketKey) + Send + Sync>;

#[derive(Default)]
pub struct HookSlots {
    sent: RwLock<Option<PacketHook>>,
    received: RwLock<Option<PacketHook>>,
}

impl HookSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the on-send hook, returning the one it replaces.
    pub fn set_sent(&self, hook: PacketHook) -> Option<PacketHook> {
        self.slot(Direction::ToServer)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(hook)
    }

    /// Install the on-receive hook, returning the one it replaces.
    pub fn set_received(&self, hook: PacketHook) -> Option<PacketHook> {
        self.slot(Direction::ToClient)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(hook)
    }

    pub fn clear(&self) {
        for direction in [Direction::ToServer, Direction::ToClient] {
            self.slot(direction)
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
    }

    /// Remove `hook` from whichever slot still holds it, leaving hooks
    /// registered by anyone else in place. Returns whether anything was removed.
    pub fn clear_if(&self, hook: &PacketHook) -> bool {
        let mut removed = false;
        for direction in [Direction::ToServer, Direction::ToClient] {
            let mut slot = self
                .slot(direction)
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, hook)) {
                slot.take();
                removed = true;
            }
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.current(Direction::ToServer).is_none() && self.current(Direction::ToClient).is_none()
    }

    pub fn fire_sent(&self, data: &[u8], key: PacketKey) {
        self.fire(Direction::ToServer, data, key);
    }

    pub fn fire_received(&self, data: &[u8], key: PacketKey) {
        self.fire(Direction::ToClient, data, key);
    }

    fn fire(&self, direction: Direction, data: &[u8], key: PacketKey) {
        // The slot lock is released before the call so a hook may re-register.
        if let Some(hook) = self.current(direction) {
            hook(data, key);
        }
    }

    fn current(&self, direction: Direction) -> Option<PacketHook> {
        self.slot(direction)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn slot(&self, direction: Direction) -> &RwLock<Option<PacketHook>> {
        match direction {
            Direction::ToServer => &self.sent,
            Direction::ToClient => &self.received,
        }
    }
}

impl std::fmt::Debug for HookSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSlots")
            .field("sent", &self.current(Direction::ToServer).is_some())
            .field("received", &self.current(Direction::ToClient).is_some())
            .finish()
    }
}

/// Secret material from the TLS handshake, needed to decrypt a capture later.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsSecrets {
    pub client_random: Vec<u8>,
    pub exporter_secret: Vec<u8>,
    pub early_exporter_secret: Vec<u8>,
}

impl TlsSecrets {
    pub fn is_empty(&self) -> bool {
        self.client_random.is_empty()
            && self.exporter_secret.is_empty()
            && self.early_exporter_secret.is_empty()
    }
}

// Secrets never reach logs; only the (public) client random is shown.
impl std::fmt::Debug for TlsSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSecrets")
            .field("client_random", &hex::encode(&self.client_random))
            .field(
                "exporter_secret",
                &format_args!("<{} bytes>", self.exporter_secret.len()),
            )
            .field(
                "early_exporter_secret",
                &format_args!("<{} bytes>", self.early_exporter_secret.len()),
            )
            .finish()
    }
}

/// A connection under test, as seen by the recorder.
pub trait Connection: Send + Sync {
    /// Hook registry fired from the connection's send and receive paths.
    fn hooks(&self) -> &HookSlots;

    /// Current TLS secrets. Empty until the handshake has derived them.
    fn tls_secrets(&self) -> TlsSecrets;

    /// Address of the server, if the connection has resolved one.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_hook(counter: &Arc<AtomicUsize>) -> PacketHook {
        let counter = counter.clone();
        Arc::new(move |_data: &[u8], _key: PacketKey| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn fire_without_hook_is_noop() {
        let slots = HookSlots::new();
        slots.fire_sent(b"x", PacketKey::fresh());
        slots.fire_received(b"x", PacketKey::fresh());
        assert!(slots.is_empty());
    }

    #[test]
    fn set_replaces_and_returns_previous() {
        let slots = HookSlots::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        assert!(slots.set_sent(counting_hook(&first)).is_none());
        assert!(slots.set_sent(counting_hook(&second)).is_some());

        slots.fire_sent(b"a", PacketKey::fresh());
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn directions_are_independent() {
        let slots = HookSlots::new();
        let sent = Arc::new(AtomicUsize::new(0));
        slots.set_sent(counting_hook(&sent));

        slots.fire_received(b"r", PacketKey::fresh());
        assert_eq!(sent.load(Ordering::SeqCst), 0);

        slots.clear();
        slots.fire_sent(b"s", PacketKey::fresh());
        assert_eq!(sent.load(Ordering::SeqCst), 0);
        assert!(slots.is_empty());
    }

    #[test]
    fn clear_if_only_removes_the_given_hook() {
        let slots = HookSlots::new();
        let ours = Arc::new(AtomicUsize::new(0));
        let theirs = Arc::new(AtomicUsize::new(0));
        let our_hook = counting_hook(&ours);
        slots.set_sent(our_hook.clone());
        slots.set_received(counting_hook(&theirs));

        assert!(slots.clear_if(&our_hook));
        assert!(!slots.clear_if(&our_hook));

        slots.fire_sent(b"s", PacketKey::fresh());
        slots.fire_received(b"r", PacketKey::fresh());
        assert_eq!(ours.load(Ordering::SeqCst), 0);
        assert_eq!(theirs.load(Ordering::SeqCst), 1);
        assert!(!slots.is_empty());
    }

    #[test]
    fn secrets_debug_hides_exporters() {
        let secrets = TlsSecrets {
            client_random: vec![0xab, 0xcd],
            exporter_secret: vec![0x11; 32],
            early_exporter_secret: vec![],
        };
        let dbg = format!("{secrets:?}");
        assert!(dbg.contains("abcd"));
        assert!(dbg.contains("<32 bytes>"));
        assert!(!dbg.contains("1111"));
    }
}
