use qtrace_core::{CaptureController, CaptureError, Connection};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Capture controller that hands back a fixed outcome.
#[derive(Debug)]
pub struct ScriptedCapture {
    outcome: Result<Vec<u8>, String>,
    stops: AtomicUsize,
}

impl ScriptedCapture {
    pub fn returning(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            outcome: Ok(bytes.into()),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl CaptureController for ScriptedCapture {
    type Handle = ();

    fn stop(&self, _conn: &dyn Connection, _handle: ()) -> Result<Vec<u8>, CaptureError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(bytes) => Ok(bytes.clone()),
            Err(message) => Err(CaptureError::Other(anyhow::anyhow!("{message}"))),
        }
    }
}
