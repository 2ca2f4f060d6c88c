//! Recorder for QUIC conformance scenario runs.
//!
//! A [`Trace`] captures every packet a connection under test sends and
//! receives, the scenario's verdict, an optional raw packet capture and the
//! TLS secrets needed to decrypt that capture offline.

pub mod capture;
pub mod config;
pub mod conn;
pub mod encoding;
pub mod errors;
pub mod export;
pub mod packet;
pub mod provenance;
pub mod results;
pub mod trace;

// Convenience re-exports
pub use capture::{CaptureController, TcpdumpCapture, TcpdumpHandle};
pub use config::{CaptureConfig, ExportConfig, GitConfig, RecorderConfig};
pub use conn::{Connection, HookSlots, PacketHook, TlsSecrets};
pub use errors::{CaptureError, TraceError, TraceResult};
pub use packet::{Correlated, Direction, PacketKey, TracePacket};
pub use provenance::{FixedRevision, GitRevision, RevisionSource};
pub use results::{ResultValue, Results, ERROR_KEY};
pub use trace::Trace;
