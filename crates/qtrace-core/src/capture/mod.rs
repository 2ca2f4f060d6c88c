//! Raw packet capture running alongside a scenario.
//!
//! The recorder never starts or supervises a capture itself. It only asks a
//! [`CaptureController`] to stop one and hand over the bytes, see
//! [`crate::Trace::add_pcap`].

pub mod tcpdump;

use crate::conn::Connection;
use crate::errors::CaptureError;

pub use tcpdump::{TcpdumpCapture, TcpdumpHandle};

pub trait CaptureController {
    /// Whatever identifies one running capture (a child process, a job id).
    type Handle;

    /// Stop the capture associated with `conn` and return the raw capture file.
    /// May block until the capture process has flushed and exited.
    fn stop(&self, conn: &dyn Connection, handle: Self::Handle)
        -> Result<Vec<u8>, CaptureError>;
}
