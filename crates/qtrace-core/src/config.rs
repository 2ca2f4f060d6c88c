use crate::errors::{TraceError, TraceResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for the recorder's collaborators, usually read from `qtrace.yaml`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfig {
    pub git: GitConfig,
    pub capture: CaptureConfig,
    pub export: ExportConfig,
}

impl RecorderConfig {
    pub fn from_yaml_str(yaml: &str) -> TraceResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> TraceResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| TraceError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&raw).map_err(|e| TraceError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    pub binary: PathBuf,
    /// Working tree to resolve `HEAD` in. Defaults to the process cwd.
    pub repo_dir: Option<PathBuf>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
            repo_dir: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub tcpdump: PathBuf,
    /// Interface passed to `tcpdump -i`.
    pub interface: String,
    /// How long a capture process gets to flush after SIGINT before it is killed.
    pub stop_grace_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            tcpdump: PathBuf::from("/usr/sbin/tcpdump"),
            interface: "any".to_string(),
            stop_grace_ms: 2_000,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub pretty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = RecorderConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, RecorderConfig::default());
        assert_eq!(cfg.capture.interface, "any");
        assert_eq!(cfg.capture.stop_grace_ms, 2_000);
        assert!(!cfg.export.pretty);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = RecorderConfig::from_yaml_str(
            "capture:\n  interface: eth0\nexport:\n  pretty: true\n",
        )
        .unwrap();
        assert_eq!(cfg.capture.interface, "eth0");
        assert_eq!(cfg.capture.tcpdump, PathBuf::from("/usr/sbin/tcpdump"));
        assert!(cfg.export.pretty);
        assert_eq!(cfg.git, GitConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RecorderConfig::from_yaml_str("capture:\n  iface: eth0\n").unwrap_err();
        assert!(matches!(err, TraceError::Yaml(_)));
    }

    #[test]
    fn load_reports_path_on_failure() {
        let err = RecorderConfig::load("/nonexistent/qtrace.yaml").unwrap_err();
        match err {
            TraceError::Config { path, .. } => assert_eq!(path, "/nonexistent/qtrace.yaml"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "git:\n  binary: /opt/git/bin/git\n  repo_dir: /src/quic").unwrap();
        let cfg = RecorderConfig::load(f.path()).unwrap();
        assert_eq!(cfg.git.binary, PathBuf::from("/opt/git/bin/git"));
        assert_eq!(cfg.git.repo_dir, Some(PathBuf::from("/src/quic")));
    }
}
