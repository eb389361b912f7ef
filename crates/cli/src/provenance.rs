//! Provenance sidecars: `<store>.provenance.json` next to each written store.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::ffi::OsString;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Metadata used to generate a provenance sidecar.
pub struct Payload {
    pub params: Value,
    /// Free-form run label from `--tag`.
    pub tag: Option<String>,
    /// Groups whose placements changed in this write.
    pub groups: Vec<usize>,
}

impl Payload {
    pub fn new(params: Value, tag: Option<String>) -> Self {
        Self {
            params,
            tag,
            groups: Vec::new(),
        }
    }
}

/// Write `<artifact>.provenance.json` with git commit, callsite, params and outputs.
#[track_caller]
pub fn write_sidecar<P: AsRef<Path>>(artifact: P, payload: Payload) -> Result<PathBuf> {
    let artifact = artifact.as_ref();
    let provenance_path = provenance_path(artifact);
    if let Some(parent) = provenance_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating provenance dir {}", parent.display()))?;
        }
    }

    let callsite = Location::caller();
    let doc = json!({
        "code_rev": current_git_rev(),
        "callsite": {
            "file": callsite.file(),
            "line": callsite.line()
        },
        "tool_version": treepack::VERSION,
        "tag": payload.tag,
        "groups": payload.groups,
        "params": payload.params,
        "outputs": [artifact.to_string_lossy()]
    });
    fs::write(&provenance_path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {}", provenance_path.display()))?;
    Ok(provenance_path)
}

/// `<dir>/<stem>.provenance.json`; a path without a file name gets `store`.
fn provenance_path(store: &Path) -> PathBuf {
    let mut name = store
        .file_stem()
        .map_or_else(|| OsString::from("store"), |s| s.to_os_string());
    name.push(".provenance.json");
    store.with_file_name(name)
}

/// Runtime override, for checkouts without `.git` (containers, tarballs).
pub const GIT_REV_ENV: &str = "GIT_COMMIT";

/// Commit of the running code: `$GIT_COMMIT`, else `git rev-parse HEAD`, else "unknown".
pub fn current_git_rev() -> String {
    if let Some(rev) = std::env::var(GIT_REV_ENV).ok().filter(|s| !s.is_empty()) {
        return rev;
    }
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn provenance_path_rewrites_extension() {
        let base = Path::new("/tmp/run/submission.csv");
        let derived = provenance_path(base);
        assert_eq!(derived, Path::new("/tmp/run/submission.provenance.json"));
        assert_eq!(provenance_path(Path::new("/")), Path::new("/store.provenance.json"));
    }

    #[test]
    fn git_rev_honours_runtime_override() {
        std::env::set_var(GIT_REV_ENV, "abc123");
        assert_eq!(current_git_rev(), "abc123");
        std::env::set_var(GIT_REV_ENV, "");
        let fallback = current_git_rev();
        std::env::remove_var(GIT_REV_ENV);
        assert_ne!(fallback, "abc123");
        assert!(!fallback.is_empty());
    }

    #[test]
    fn write_sidecar_creates_file() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("store.csv");
        fs::write(&artifact, "id,x,y,deg\n").unwrap();
        let mut payload = Payload::new(json!({"iterations": 500}), Some("night-run".into()));
        payload.groups = vec![3, 7];
        let prov_path = write_sidecar(&artifact, payload).unwrap();
        assert!(prov_path.exists());
        let parsed: Value = serde_json::from_slice(&fs::read(prov_path).unwrap()).unwrap();
        assert_eq!(parsed["outputs"][0], artifact.to_string_lossy().as_ref());
        assert_eq!(parsed["tag"], "night-run");
        assert_eq!(parsed["groups"], json!([3, 7]));
        assert_eq!(parsed["params"]["iterations"], 500);
    }
}
