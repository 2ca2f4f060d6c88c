//! Source revision of the code under test.
//!
//! Every trace carries the revision of the build that produced it. Failing to
//! determine it is a [`TraceError::Provenance`], which callers treat as fatal.

use crate::config::GitConfig;
use crate::errors::{TraceError, TraceResult};
use std::path::PathBuf;
use std::process::{Command, Stdio};

pub trait RevisionSource {
    fn revision(&self) -> TraceResult<String>;
}

/// Asks git for the commit checked out in a working tree.
#[derive(Debug, Clone)]
pub struct GitRevision {
    git: PathBuf,
    repo_dir: Option<PathBuf>,
}

impl Default for GitRevision {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
            repo_dir: None,
        }
    }
}

impl GitRevision {
    pub fn new(git: impl Into<PathBuf>) -> Self {
        Self {
            git: git.into(),
            repo_dir: None,
        }
    }

    pub fn from_config(cfg: &GitConfig) -> Self {
        Self {
            git: cfg.binary.clone(),
            repo_dir: cfg.repo_dir.clone(),
        }
    }

    /// Resolve `HEAD` in `dir` instead of the process working directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.repo_dir = Some(dir.into());
        self
    }
}

impl RevisionSource for GitRevision {
    fn revision(&self) -> TraceResult<String> {
        let mut cmd = Command::new(&self.git);
        cmd.args(["rev-parse", "--verify", "HEAD"])
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.repo_dir {
            cmd.current_dir(dir);
        }

        let out = cmd.output().map_err(|e| {
            TraceError::provenance(format!("running {}: {}", self.git.display(), e))
        })?;

        if !out.status.success() {
            let mut stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            stderr.truncate(512);
            return Err(TraceError::provenance(format!(
                "git rev-parse exited with {}: {}",
                out.status, stderr
            )));
        }

        let rev = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if rev.is_empty() {
            return Err(TraceError::provenance("git rev-parse printed no revision"));
        }
        tracing::debug!(revision = %rev, "resolved source revision");
        Ok(rev)
    }
}

/// A revision known ahead of time, e.g. stamped into the binary at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRevision(String);

impl FixedRevision {
    pub fn new(rev: impl Into<String>) -> Self {
        Self(rev.into())
    }
}

impl RevisionSource for FixedRevision {
    fn revision(&self) -> TraceResult<String> {
        let rev = self.0.trim();
        if rev.is_empty() {
            return Err(TraceError::provenance("empty revision"));
        }
        Ok(rev.to_string())
    }
}
