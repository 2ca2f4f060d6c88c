//! `tcpdump`-backed capture controller.
//!
//! `start` spawns `tcpdump host <ip> and udp port <port> -w <file> -i <iface>`
//! filtered on the connection's peer. `stop` interrupts it with SIGINT so it
//! flushes the pcap file, waits for it to exit and reads the file back.

use super::CaptureController;
use crate::config::CaptureConfig;
use crate::conn::Connection;
use crate::errors::CaptureError;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct TcpdumpCapture {
    program: PathBuf,
    interface: String,
    stop_grace: Duration,
}

impl Default for TcpdumpCapture {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

/// A running capture. The capture file is deleted when the handle drops.
#[derive(Debug)]
pub struct TcpdumpHandle {
    child: Child,
    file: NamedTempFile,
}

impl TcpdumpHandle {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl TcpdumpCapture {
    pub fn from_config(cfg: &CaptureConfig) -> Self {
        Self {
            program: cfg.tcpdump.clone(),
            interface: cfg.interface.clone(),
            stop_grace: Duration::from_millis(cfg.stop_grace_ms),
        }
    }

    /// Start capturing the UDP flow between this host and the connection's peer.
    pub fn start(&self, conn: &dyn Connection) -> Result<TcpdumpHandle, CaptureError> {
        let peer = conn.peer_addr().ok_or(CaptureError::NoPeer)?;
        let file = tempfile::Builder::new()
            .prefix("qtrace-")
            .suffix(".pcap")
            .tempfile()
            .map_err(|e| {
                CaptureError::Other(anyhow::Error::new(e).context("creating pcap file"))
            })?;

        let child = Command::new(&self.program)
            .args(self.filter_args(&peer.ip().to_string(), peer.port()))
            .arg("-w")
            .arg(file.path())
            .arg("-i")
            .arg(&self.interface)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        tracing::info!(
            pid = child.id(),
            peer = %peer,
            interface = %self.interface,
            "started packet capture"
        );
        Ok(TcpdumpHandle { child, file })
    }

    fn filter_args(&self, ip: &str, port: u16) -> Vec<String> {
        vec![
            "host".into(),
            ip.into(),
            "and".into(),
            "udp".into(),
            "port".into(),
            port.to_string(),
        ]
    }
}

impl CaptureController for TcpdumpCapture {
    type Handle = TcpdumpHandle;

    fn stop(
        &self,
        _conn: &dyn Connection,
        mut handle: TcpdumpHandle,
    ) -> Result<Vec<u8>, CaptureError> {
        let pid = handle.pid();
        interrupt(&mut handle.child)?;

        match wait_timeout(&mut handle.child, self.stop_grace).map_err(CaptureError::Wait)? {
            Some(status) => {
                tracing::debug!(pid, %status, "capture process exited");
            }
            None => {
                tracing::warn!(pid, "capture process ignored SIGINT, killing it");
                let _ = handle.child.kill();
                let _ = handle.child.wait();
                return Err(CaptureError::TimedOut {
                    pid,
                    grace_ms: self.stop_grace.as_millis() as u64,
                });
            }
        }

        std::fs::read(handle.file.path()).map_err(|source| CaptureError::Read {
            path: handle.file.path().display().to_string(),
            source,
        })
    }
}

#[cfg(unix)]
fn interrupt(child: &mut Child) -> Result<(), CaptureError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = child.id();
    match kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
        Ok(()) => Ok(()),
        // Already gone: nothing to interrupt, the file is whatever it flushed.
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(CaptureError::Signal {
            pid,
            reason: e.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) -> Result<(), CaptureError> {
    let pid = child.id();
    child.kill().map_err(|e| CaptureError::Signal {
        pid,
        reason: e.to_string(),
    })
}

fn wait_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(20);

    loop {
        match child.try_wait()? {
            Some(status) => return Ok(Some(status)),
            None => {
                if start.elapsed() >= timeout {
                    return Ok(None);
                }
                std::thread::sleep(poll_interval);
            }
        }
    }
}
