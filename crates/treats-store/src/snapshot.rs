use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::workspace::Workspace;

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    workspace: &'a Workspace,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    workspace: Workspace,
}

/// Reads a snapshot written by [`write`]. A missing file is not an error.
pub fn load(path: &Path) -> Result<Option<Workspace>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    if snapshot.version != FORMAT_VERSION {
        bail!(
            "snapshot {} has format version {}, expected {}",
            path.display(),
            snapshot.version,
            FORMAT_VERSION
        );
    }

    info!(
        "Loaded snapshot {} saved at {}",
        path.display(),
        snapshot.saved_at.to_rfc3339()
    );
    Ok(Some(snapshot.workspace))
}

pub fn encode(workspace: &Workspace) -> Result<Vec<u8>> {
    let snapshot = SnapshotRef {
        version: FORMAT_VERSION,
        saved_at: Utc::now(),
        workspace,
    };
    Ok(serde_json::to_vec(&snapshot)?)
}

/// Replaces the file at `path` with `bytes`. Goes through a sibling temp file
/// so a crash never leaves a half-written snapshot behind.
pub fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::fixtures::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn restores_state_and_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treats.json");

        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        ws.send_message(ada, c, "persisted", T0).unwrap();
        write(&path, &encode(&ws).unwrap()).unwrap();

        let mut restored = load(&path).unwrap().unwrap();
        assert_eq!(restored.channel(c).unwrap().messages[0].body, "persisted");
        let next = restored.send_message(ada, c, "after restart", T0).unwrap();
        assert_eq!(next, 2);
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treats.json");
        let ws = workspace();
        let mut value: serde_json::Value = serde_json::from_slice(&encode(&ws).unwrap()).unwrap();
        value["version"] = serde_json::json!(99);
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(load(&path).is_err());
    }
}
