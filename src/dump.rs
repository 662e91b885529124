//! Clipboard snapshots: item lists saved as MessagePack files.
//!
//! Layout: a named map `{ version, items: [{ type, data }] }` with `data`
//! as a MessagePack binary.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ClipboardItem, ClipboardItems};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot error type.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("unsupported snapshot version {0} (expected {SNAPSHOT_VERSION})")]
    Version(u32),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    items: &'a [ClipboardItem],
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    items: ClipboardItems,
}

/// Encode `items` as a snapshot.
pub fn encode(items: &[ClipboardItem]) -> Result<Vec<u8>, DumpError> {
    Ok(rmp_serde::to_vec_named(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        items,
    })?)
}

/// Decode a snapshot, rejecting unknown versions.
pub fn decode(bytes: &[u8]) -> Result<ClipboardItems, DumpError> {
    let snapshot: Snapshot = rmp_serde::from_slice(bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(DumpError::Version(snapshot.version));
    }
    Ok(snapshot.items)
}

/// Write `items` to `path`, replacing any existing file.
pub fn save_items(path: &Path, items: &[ClipboardItem]) -> Result<(), DumpError> {
    std::fs::write(path, encode(items)?)?;
    Ok(())
}

/// Read items from a snapshot file.
pub fn load_items(path: &Path) -> Result<ClipboardItems, DumpError> {
    decode(&std::fs::read(path)?)
}
