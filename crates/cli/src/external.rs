//! Black-box optimizer run as a subprocess, one group at a time.
//!
//! Contract: `GROUP_NUMBER=<n> <binary> -n <iterations> -r <restarts> -i <store> -o <store>`.
//! The binary may rewrite its whole store, so it only ever sees a private
//! single-group store in a temp directory; the caller merges the result back.
//! Output is trusted only after it decodes, is overlap-free, and beats the input.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tempfile::TempDir;
use treepack::prelude::*;
use treepack::task::Diagnostics;

use crate::store;

/// Environment variable that selects the group.
pub const GROUP_ENV: &str = "GROUP_NUMBER";

pub struct ExternalOptimizer {
    binary: PathBuf,
    /// Arguments placed before the contract flags (e.g. a script for an interpreter).
    leading: Vec<OsString>,
}

impl ExternalOptimizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            leading: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading.extend(args.into_iter().map(Into::into));
        self
    }
}

fn io_error(group: usize, stage: &'static str, e: anyhow::Error) -> TaskError {
    TaskError::Io {
        group,
        stage,
        source: std::io::Error::other(format!("{e:#}")),
    }
}

impl PackingTask for ExternalOptimizer {
    fn name(&self) -> &str {
        "external"
    }

    fn run(
        &mut self,
        config: Configuration,
        params: &TaskParams,
    ) -> Result<TaskOutcome, TaskError> {
        let group = config.len();
        let dir = TempDir::new().map_err(|source| TaskError::Io {
            group,
            stage: "creating private store dir",
            source,
        })?;
        let path = dir.path().join(format!("group_{group:03}.csv"));
        store::save(&path, std::slice::from_ref(&config))
            .map_err(|e| io_error(group, "writing private store", e))?;

        tracing::info!(group, binary = %self.binary.display(), ?params, "spawning optimizer");
        let output = Command::new(&self.binary)
            .args(&self.leading)
            .env(GROUP_ENV, group.to_string())
            .arg("-n")
            .arg(params.iterations.to_string())
            .arg("-r")
            .arg(params.restarts.to_string())
            .arg("-i")
            .arg(&path)
            .arg("-o")
            .arg(&path)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| TaskError::Io {
                group,
                stage: "spawning optimizer",
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(TaskError::Exit {
                group,
                status: output.status.code(),
                diagnostics: stderr.trim().to_string(),
            });
        }
        let lines: Vec<String> = stdout
            .lines()
            .chain(stderr.lines())
            .map(str::to_string)
            .collect();
        for line in &lines {
            tracing::debug!(group, "{line}");
        }
        let mut diagnostics = Diagnostics::from_lines(lines);

        let shape = Arc::clone(config.shape());
        let mut contents = store::load(&path, &shape)
            .map_err(|e| io_error(group, "reading private store", e))?;
        if let Some(e) = contents.errors.remove(&group) {
            return Err(TaskError::Output {
                group,
                reason: e.to_string(),
            });
        }
        let result = contents.groups.remove(&group).ok_or(TaskError::Output {
            group,
            reason: "group missing from optimizer output".to_string(),
        })?;

        let verified = total_overlap(&result) == 0.0 && score(&result) < score(&config);
        if diagnostics.improved != verified {
            tracing::warn!(
                group,
                claimed = diagnostics.improved,
                verified,
                "optimizer verdict disagrees with recomputed score"
            );
        }
        diagnostics.improved = verified;
        let configuration = if verified { result } else { config };
        Ok(TaskOutcome {
            configuration,
            diagnostics,
        })
    }
}
