//! All-or-nothing artifact output
//!
//! Bytes go to a temporary file next to the destination, are synced, and
//! the temporary file is renamed over the destination. A failure at any
//! step removes the temporary file and leaves the destination as it was.
//!
//! The artifact is read by a separate prefetch daemon, so it is not left
//! owner-only: a replaced file keeps its mode, a new one gets 0644.

use crate::error::{CompileError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Mode of a newly created artifact
#[cfg(unix)]
pub const ARTIFACT_MODE: u32 = 0o644;

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(ARTIFACT_MODE))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

/// Permissions the artifact should end up with
fn artifact_permissions(dest: &Path) -> Option<fs::Permissions> {
    match fs::metadata(dest) {
        Ok(meta) if meta.is_file() => Some(meta.permissions()),
        _ => default_permissions(),
    }
}

/// Atomically replace `dest` with `bytes`
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Dropping the handle on an error path deletes the temporary file
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CompileError::io(dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| CompileError::io(tmp.path(), e))?;
    if let Some(permissions) = artifact_permissions(dest) {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| CompileError::io(tmp.path(), e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| CompileError::io(tmp.path(), e))?;

    tmp.persist(dest)
        .map_err(|e| CompileError::io(dest, e.error))?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}
