//! The record of one scenario run.
//!
//! A [`Trace`] is created once per run, attached to the connection under test
//! so every sent and received packet lands in its stream, annotated with the
//! verdict, and completed with the TLS secrets needed to decrypt the capture.
//!
//! ```text
//! Trace::new ─► attach_to(conn) ─► (hooks append packets) ─► add_pcap
//!                                                          ─► mark_error
//!                                                          ─► complete ─► export
//! ```

mod stream;

use crate::capture::CaptureController;
use crate::conn::{Connection, PacketHook};
use crate::errors::{CaptureError, TraceResult};
use crate::packet::{Correlated, Direction, PacketKey, TracePacket};
use crate::provenance::RevisionSource;
use crate::results::{ResultValue, Results, ERROR_KEY};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use stream::PacketLog;

/// The record of one scenario run against one host, exported as JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct Trace {
    /// Revision of the code that produced the trace.
    pub commit: String,
    pub scenario: String,
    pub scenario_version: u32,
    /// Host the scenario ran against.
    pub host: String,
    /// Address resolved for `host`.
    #[serde(default)]
    pub ip: String,
    /// Scenario-specific results; the verdict message lives under `"error"`.
    #[serde(default, deserialize_with = "crate::results::deserialize_or_empty")]
    pub results: Results,
    /// Epoch seconds.
    pub started_at: i64,
    /// Milliseconds.
    #[serde(default)]
    pub duration: u64,
    /// Scenario-specific verdict code, 0 on success.
    #[serde(default)]
    pub error_code: u8,
    #[serde(
        default,
        serialize_with = "stream::serialize",
        deserialize_with = "stream::deserialize"
    )]
    stream: Arc<PacketLog>,
    #[serde(default, with = "crate::encoding::base64_bytes")]
    pub pcap: Vec<u8>,
    /// Filled by offline decryption, never by the recorder.
    #[serde(default, with = "crate::encoding::base64_bytes")]
    pub decrypted_pcap: Vec<u8>,
    #[serde(default, with = "crate::encoding::base64_bytes")]
    pub client_random: Vec<u8>,
    #[serde(default, with = "crate::encoding::base64_bytes")]
    pub exporter_secret: Vec<u8>,
    #[serde(default, with = "crate::encoding::base64_bytes")]
    pub early_exporter_secret: Vec<u8>,
    #[serde(skip, default = "Instant::now")]
    clock: Instant,
    #[serde(skip)]
    subscriptions: Subscriptions,
}

/// Hooks this trace has registered, so a detach removes only its own.
#[derive(Default)]
struct Subscriptions(Mutex<Vec<PacketHook>>);

impl Subscriptions {
    fn push(&self, hook: PacketHook) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(hook);
    }

    fn remove_from(&self, conn: &dyn Connection) {
        let hooks = conn.hooks();
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|hook| !hooks.clear_if(hook));
    }
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.0.lock().unwrap_or_else(PoisonError::into_inner).len();
        write!(f, "Subscriptions({n})")
    }
}

impl Trace {
    /// Start the record of a scenario run against `host`.
    ///
    /// Fails with [`crate::TraceError::Provenance`] when the revision of the
    /// code under test cannot be determined. That error is fatal for the run.
    pub fn new(
        scenario: impl Into<String>,
        scenario_version: u32,
        host: impl Into<String>,
        revisions: &dyn RevisionSource,
    ) -> TraceResult<Self> {
        let commit = revisions.revision()?;
        Ok(Self {
            commit,
            scenario: scenario.into(),
            scenario_version,
            host: host.into(),
            ip: String::new(),
            results: Results::new(),
            started_at: chrono::Utc::now().timestamp(),
            duration: 0,
            error_code: 0,
            stream: Arc::new(PacketLog::default()),
            pcap: Vec::new(),
            decrypted_pcap: Vec::new(),
            client_random: Vec::new(),
            exporter_secret: Vec::new(),
            early_exporter_secret: Vec::new(),
            clock: Instant::now(),
            subscriptions: Subscriptions::default(),
        })
    }

    /// Register send and receive hooks on `conn`.
    ///
    /// Replaces any hooks already registered there, and silences hooks from
    /// earlier attachments of this trace to other connections: the most
    /// recent attachment is the only one that records.
    pub fn attach_to(&self, conn: &dyn Connection) {
        let epoch = self.stream.next_epoch();
        let hooks = conn.hooks();
        let sent = self.hook(epoch, Direction::ToServer);
        let received = self.hook(epoch, Direction::ToClient);
        hooks.set_sent(sent.clone());
        hooks.set_received(received.clone());
        self.subscriptions.push(sent);
        self.subscriptions.push(received);
        tracing::info!(scenario = %self.scenario, host = %self.host, epoch, "trace attached");
    }

    /// Remove this trace's hooks from `conn` and stop recording.
    ///
    /// Hooks another trace registered on `conn` since are left in place.
    pub fn detach_from(&self, conn: &dyn Connection) {
        self.subscriptions.remove_from(conn);
        self.stream.next_epoch();
        tracing::info!(
            scenario = %self.scenario,
            packets = self.stream_len(),
            "trace detached"
        );
    }

    // The hook holds the log weakly: a hook that outlives the trace records nothing.
    fn hook(&self, epoch: u64, direction: Direction) -> PacketHook {
        let log = Arc::downgrade(&self.stream);
        Arc::new(move |data: &[u8], key: PacketKey| {
            if let Some(log) = log.upgrade() {
                log.append(epoch, direction, data, key);
            }
        })
    }

    /// Record the verdict of the run.
    ///
    /// A non-empty `message` is stored as `results["error"]`. When `packet` is
    /// given, the first captured packet carrying its key is flagged as of
    /// interest; if it was never captured nothing is flagged.
    pub fn mark_error(&mut self, code: u8, message: &str, packet: Option<&dyn Correlated>) {
        self.error_code = code;
        if !message.is_empty() {
            self.results
                .insert(ERROR_KEY.to_string(), ResultValue::Text(message.to_string()));
        }
        let Some(packet) = packet else {
            return;
        };

        let key = packet.correlation_key();
        let mut packets = self.stream.lock();
        match packets.iter_mut().find(|p| p.matches(key)) {
            Some(p) => p.is_of_interest = true,
            None => tracing::debug!(
                key = key.raw(),
                code,
                "packet of interest was not captured, nothing flagged"
            ),
        }
    }

    /// Stop the raw capture of `conn` and keep its bytes.
    ///
    /// Controller errors come back unchanged and leave `pcap` as it was.
    pub fn add_pcap<C: CaptureController>(
        &mut self,
        controller: &C,
        conn: &dyn Connection,
        handle: C::Handle,
    ) -> Result<(), CaptureError> {
        let content = controller.stop(conn, handle)?;
        tracing::info!(scenario = %self.scenario, bytes = content.len(), "stored packet capture");
        self.pcap = content;
        Ok(())
    }

    /// Copy the handshake secrets out of `conn`.
    ///
    /// Call once the handshake has derived them; earlier calls store whatever
    /// (possibly empty) values the connection holds at that point.
    pub fn complete(&mut self, conn: &dyn Connection) {
        let secrets = conn.tls_secrets();
        tracing::info!(
            scenario = %self.scenario,
            client_random = %hex::encode(&secrets.client_random),
            "trace completed"
        );
        self.client_random = secrets.client_random;
        self.exporter_secret = secrets.exporter_secret;
        self.early_exporter_secret = secrets.early_exporter_secret;
    }

    pub fn set_result(&mut self, key: impl Into<String>, value: impl Into<ResultValue>) {
        self.results.insert(key.into(), value.into());
    }

    /// Take `ip` from the connection's resolved peer, if it has one.
    pub fn set_ip_from(&mut self, conn: &dyn Connection) {
        if let Some(peer) = conn.peer_addr() {
            self.ip = peer.ip().to_string();
        }
    }

    /// Set `duration` to the time elapsed since the trace was created.
    pub fn stamp_duration(&mut self) {
        self.duration = self.clock.elapsed().as_millis() as u64;
    }

    /// Snapshot of the packet stream in capture order.
    pub fn packets(&self) -> Vec<TracePacket> {
        self.stream.lock().clone()
    }

    pub fn stream_len(&self) -> usize {
        self.stream.lock().len()
    }

    pub fn packets_of_interest(&self) -> Vec<TracePacket> {
        self.stream
            .lock()
            .iter()
            .filter(|p| p.is_of_interest)
            .cloned()
            .collect()
    }
}
