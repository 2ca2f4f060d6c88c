//! JSON persistence for finished traces.
//!
//! A run over many hosts is written as one JSON array of trace records; a
//! single trace can also be written to its own file. Files are written to a
//! temporary sibling and renamed into place, so readers never see half a
//! record.

use crate::config::ExportConfig;
use crate::errors::TraceResult;
use crate::trace::Trace;
use std::io::{Read, Write};
use std::path::Path;

pub fn to_json(trace: &Trace) -> TraceResult<String> {
    Ok(serde_json::to_string(trace)?)
}

pub fn to_json_pretty(trace: &Trace) -> TraceResult<String> {
    Ok(serde_json::to_string_pretty(trace)?)
}

/// Decode one trace record. Packets read back carry no correlation keys.
pub fn from_json(json: &str) -> TraceResult<Trace> {
    Ok(serde_json::from_str(json)?)
}

pub fn write_traces<W: Write>(
    mut writer: W,
    traces: &[Trace],
    cfg: &ExportConfig,
) -> TraceResult<()> {
    if cfg.pretty {
        serde_json::to_writer_pretty(&mut writer, traces)?;
    } else {
        serde_json::to_writer(&mut writer, traces)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn read_traces<R: Read>(reader: R) -> TraceResult<Vec<Trace>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Write `trace` to `path`, replacing any previous file atomically.
pub fn write_trace_file(path: &Path, trace: &Trace, cfg: &ExportConfig) -> TraceResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    if cfg.pretty {
        serde_json::to_writer_pretty(&mut tmp, trace)?;
    } else {
        serde_json::to_writer(&mut tmp, trace)?;
    }
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::info!(
        path = %path.display(),
        scenario = %trace.scenario,
        packets = trace.stream_len(),
        "wrote trace"
    );
    Ok(())
}

pub fn read_trace_file(path: &Path) -> TraceResult<Trace> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
