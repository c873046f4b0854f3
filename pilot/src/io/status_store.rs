//! Status snapshot file for external tooling (HUD overlays, scripts).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::io::config::write_atomic;
use crate::orchestrator::status::Status;

/// Load a status snapshot from disk.
pub fn load_status(path: &Path) -> Result<Status> {
    debug!(path = %path.display(), "loading status");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read status {}", path.display()))?;
    let status: Status = serde_json::from_str(&contents)
        .with_context(|| format!("parse status {}", path.display()))?;
    Ok(status)
}

/// Atomically write a status snapshot as pretty JSON (temp file + rename).
pub fn write_status(path: &Path, status: &Status) -> Result<()> {
    debug!(path = %path.display(), tick = status.tick, phase = %status.phase, "writing status");
    let mut buf = serde_json::to_string_pretty(status).context("serialize status")?;
    buf.push('\n');
    write_atomic(path, "json.tmp", &buf)
}
