//! Append-only packet log shared between a trace and its hooks.

use crate::packet::{Direction, PacketKey, TracePacket};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Packets in hook-firing order, plus the epoch of the live attachment.
///
/// Hooks carry the epoch they were registered under and append only while it
/// is still current, so attaching again (or detaching) silences older hooks.
#[derive(Default)]
pub(crate) struct PacketLog {
    packets: Mutex<Vec<TracePacket>>,
    epoch: AtomicU64,
}

impl PacketLog {
    pub(crate) fn from_packets(packets: Vec<TracePacket>) -> Self {
        Self {
            packets: Mutex::new(packets),
            epoch: AtomicU64::new(0),
        }
    }

    /// Start a new attachment and return its epoch.
    pub(crate) fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Hook-side append. Never fails: a poisoned lock is recovered.
    pub(crate) fn append(&self, epoch: u64, direction: Direction, data: &[u8], key: PacketKey) {
        let mut packets = self.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        // Stamped under the lock so timestamps follow stream order.
        let timestamp = chrono::Utc::now().timestamp_millis();
        packets.push(TracePacket::captured(direction, timestamp, data, key));
        tracing::trace!(
            direction = %direction,
            len = data.len(),
            seq = packets.len() - 1,
            "captured packet"
        );
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<TracePacket>> {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PacketLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketLog")
            .field("packets", &self.lock().len())
            .field("epoch", &self.epoch.load(Ordering::SeqCst))
            .finish()
    }
}

pub(crate) fn serialize<S>(log: &Arc<PacketLog>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    log.lock().serialize(serializer)
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Arc<PacketLog>, D::Error>
where
    D: Deserializer<'de>,
{
    let packets = Option::<Vec<TracePacket>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(Arc::new(PacketLog::from_packets(packets)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_epoch_is_ignored() {
        let log = PacketLog::default();
        let first = log.next_epoch();
        log.append(first, Direction::ToServer, b"a", PacketKey::from_raw(1));
        let second = log.next_epoch();
        log.append(first, Direction::ToServer, b"b", PacketKey::from_raw(2));
        log.append(second, Direction::ToClient, b"c", PacketKey::from_raw(3));

        let packets = log.lock();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].data, b"a");
        assert_eq!(packets[1].data, b"c");
        assert_eq!(packets[1].direction, Direction::ToClient);
    }

    #[test]
    fn unattached_log_records_nothing() {
        let log = PacketLog::default();
        log.append(1, Direction::ToServer, b"x", PacketKey::fresh());
        assert!(log.lock().is_empty());
    }
}
