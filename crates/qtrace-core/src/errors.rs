//! Error types for trace recording.

use thiserror::Error;

pub type TraceResult<T> = Result<T, TraceError>;

/// Errors raised while building, configuring or persisting a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The revision of the code under test could not be determined.
    /// A trace without provenance is invalid; the top-level driver should abort.
    #[error("cannot determine source revision: {reason}")]
    Provenance { reason: String },

    #[error("config error in '{path}': {reason}")]
    Config { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TraceError {
    pub fn provenance(reason: impl Into<String>) -> Self {
        Self::Provenance {
            reason: reason.into(),
        }
    }

    /// True for errors that invalidate the whole run rather than one operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Provenance { .. })
    }

    /// Suggested exit code for a driver binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Provenance { .. } => 3,
            Self::Config { .. } | Self::Yaml(_) => 2,
            _ => 1,
        }
    }
}

/// Errors from stopping a packet capture and collecting its bytes.
///
/// [`crate::Trace::add_pcap`] hands these back to the caller unchanged.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("connection has no peer address to filter on")]
    NoPeer,

    #[error("failed to spawn capture process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to signal capture process pid={pid}: {reason}")]
    Signal { pid: u32, reason: String },

    #[error("failed waiting for capture process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("capture process pid={pid} did not exit within {grace_ms}ms")]
    TimedOut { pid: u32, grace_ms: u64 },

    #[error("failed to read capture file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
