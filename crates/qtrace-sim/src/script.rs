//! Step scripts: drive a simulated connection and record the run.

use crate::connection::{SimConnection, SimPacket};
use anyhow::{bail, Context, Result};
use qtrace_core::{Correlated, RevisionSource, TlsSecrets, Trace};

#[derive(Debug, Clone)]
pub enum Step {
    Send(Vec<u8>),
    Receive(Vec<u8>),
    /// Send the packet produced by step `n` again, keeping its key.
    Retransmit(usize),
    Handshake(TlsSecrets),
    /// Record a verdict, optionally pointing at the packet produced by step `n`.
    MarkError {
        code: u8,
        message: String,
        packet: Option<usize>,
    },
}

impl Step {
    pub fn send(payload: impl Into<Vec<u8>>) -> Self {
        Step::Send(payload.into())
    }

    pub fn receive(payload: impl Into<Vec<u8>>) -> Self {
        Step::Receive(payload.into())
    }

    pub fn mark_error(code: u8, message: impl Into<String>, packet: Option<usize>) -> Self {
        Step::MarkError {
            code,
            message: message.into(),
            packet,
        }
    }
}

#[derive(Debug)]
pub struct ScriptRun {
    pub trace: Trace,
    pub conn: SimConnection,
    /// Packet produced by each step, `None` for steps that produce none.
    pub packets: Vec<Option<SimPacket>>,
}

/// Run `steps` against a fresh [`SimConnection`] and return the completed trace.
pub fn run_script(
    scenario: &str,
    version: u32,
    host: &str,
    revisions: &dyn RevisionSource,
    steps: &[Step],
) -> Result<ScriptRun> {
    let conn = SimConnection::new();
    let mut trace = Trace::new(scenario, version, host, revisions)
        .with_context(|| format!("starting trace for scenario '{scenario}'"))?;
    trace.attach_to(&conn);

    let mut packets: Vec<Option<SimPacket>> = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        let produced = match step {
            Step::Send(payload) => Some(conn.send(payload.clone())),
            Step::Receive(payload) => Some(conn.receive(payload.clone())),
            Step::Retransmit(n) => {
                let packet = step_packet(&packets, *n, i)?.clone();
                conn.send_packet(&packet);
                Some(packet)
            }
            Step::Handshake(secrets) => {
                conn.handshake(secrets.clone());
                None
            }
            Step::MarkError {
                code,
                message,
                packet,
            } => {
                let target = match packet {
                    Some(n) => Some(step_packet(&packets, *n, i)? as &dyn Correlated),
                    None => None,
                };
                trace.mark_error(*code, message, target);
                None
            }
        };
        packets.push(produced);
    }

    trace.complete(&conn);
    trace.stamp_duration();
    tracing::debug!(
        scenario,
        steps = steps.len(),
        packets = trace.stream_len(),
        "script finished"
    );
    Ok(ScriptRun {
        trace,
        conn,
        packets,
    })
}

fn step_packet(packets: &[Option<SimPacket>], n: usize, at: usize) -> Result<&SimPacket> {
    match packets.get(n) {
        Some(Some(p)) => Ok(p),
        Some(None) => bail!("step {at} refers to step {n}, which produced no packet"),
        None => bail!("step {at} refers to step {n}, which has not run yet"),
    }
}
