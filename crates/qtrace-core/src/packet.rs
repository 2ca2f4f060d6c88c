//! Captured packet events and the keys that link them to live packets.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an in-memory packet object.
///
/// The key is a plain number: holding one keeps nothing alive and says nothing
/// about whether the packet it names still exists. It is only ever compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketKey(u64);

impl PacketKey {
    /// Allocate a key that no other `fresh()` call in this process returns.
    pub fn fresh() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap an identifier the packet owner already maintains.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Anything that can name the packet it was built from.
pub trait Correlated {
    fn correlation_key(&self) -> PacketKey;
}

impl Correlated for PacketKey {
    fn correlation_key(&self) -> PacketKey {
        *self
    }
}

/// Which way a packet travelled, seen from the client under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ToServer,
    ToClient,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::ToServer => "to_server",
            Direction::ToClient => "to_client",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One send or receive event observed on the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePacket {
    pub direction: Direction,
    /// Milliseconds since the Unix epoch at capture time.
    pub timestamp: i64,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub is_of_interest: bool,
    /// Never exported; packets read back from disk carry no key.
    #[serde(skip)]
    pub(crate) key: Option<PacketKey>,
}

impl TracePacket {
    pub(crate) fn captured(
        direction: Direction,
        timestamp: i64,
        data: &[u8],
        key: PacketKey,
    ) -> Self {
        Self {
            direction,
            timestamp,
            data: data.to_vec(),
            is_of_interest: false,
            key: Some(key),
        }
    }

    pub fn key(&self) -> Option<PacketKey> {
        self.key
    }

    pub(crate) fn matches(&self, key: PacketKey) -> bool {
        self.key == Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_keys_are_unique() {
        let a = PacketKey::fresh();
        let b = PacketKey::fresh();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn direction_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Direction::ToServer).unwrap(),
            "\"to_server\""
        );
        assert_eq!(
            serde_json::from_str::<Direction>("\"to_client\"").unwrap(),
            Direction::ToClient
        );
        assert_eq!(Direction::ToClient.to_string(), "to_client");
    }

    #[test]
    fn key_is_not_serialized() {
        let p = TracePacket::captured(
            Direction::ToServer,
            1_700_000_000_000,
            b"\x01\x02",
            PacketKey::from_raw(7),
        );
        let json = serde_json::to_value(&p).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(obj["data"], "AQI=");
        assert_eq!(obj["is_of_interest"], false);

        let back: TracePacket = serde_json::from_value(json).unwrap();
        assert_eq!(back.key(), None);
        assert_eq!(back.data, vec![1, 2]);
        assert!(!back.matches(PacketKey::from_raw(7)));
    }
}
