//! File loading for content catalogs and snapshots.
//!
//! The engine never touches the filesystem; everything it reads from disk
//! goes through here.

use std::fs;
use std::path::Path;

use outpost_core::data::Content;
use outpost_core::snapshot::Snapshot;

use crate::error::{HeadlessError, Result};

fn read(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(HeadlessError::FileNotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| HeadlessError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate a RON content catalog.
pub fn load_content(path: &Path) -> Result<Content> {
    let text = read(path)?;
    let content = Content::from_ron_str(&path.display().to_string(), &text)?;
    tracing::info!(
        path = %path.display(),
        upgrades = content.upgrades.len(),
        enemies = content.enemies.len(),
        "Loaded content"
    );
    Ok(content)
}

/// Load content from `path`, or the built-in catalog when `None`.
pub fn content_or_default(path: Option<&Path>) -> Result<Content> {
    path.map_or_else(|| Ok(Content::default()), load_content)
}

/// Load a persisted snapshot.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let text = read(path)?;
    let snapshot = Snapshot::from_json_str(&text)?;
    tracing::info!(path = %path.display(), "Loaded snapshot");
    Ok(snapshot)
}

/// Load a snapshot from `path`, or an empty one (new game) when `None`.
pub fn snapshot_or_default(path: Option<&Path>) -> Result<Snapshot> {
    path.map_or_else(|| Ok(Snapshot::default()), load_snapshot)
}

/// Write a snapshot as pretty JSON.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = snapshot.to_json_string()?;
    fs::write(path, json).map_err(|source| HeadlessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Wrote snapshot");
    Ok(())
}
