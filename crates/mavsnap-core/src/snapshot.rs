//! On-disk snapshot directory shared by the collector and the presenter.
//!
//! Each message type owns one `<TYPE>.json` file holding the last value
//! received. Files are replaced whole on every successful receipt and are
//! never deleted.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::{MavsnapError, Result};
use crate::message_types::MessageType;

/// Default snapshot directory, relative to the working directory.
pub const DEFAULT_PARAMS_DIR: &str = "public/params";

/// Handle on the snapshot directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot file for `message_type`.
    pub fn path_for(&self, message_type: &MessageType) -> PathBuf {
        self.dir.join(message_type.file_name())
    }

    /// Resolve a file name requested by a client to a path inside the
    /// directory. Returns `None` for names that could escape it.
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        is_safe_file_name(file_name).then(|| self.dir.join(file_name))
    }

    /// Replace the snapshot for `message_type` with `snapshot`.
    ///
    /// The JSON is written to a temporary sibling and renamed into place, so
    /// a concurrent reader sees either the old or the new document.
    pub fn write(&self, message_type: &MessageType, snapshot: &Value) -> Result<PathBuf> {
        let path = self.path_for(message_type);
        let bytes = to_pretty_json(snapshot)?;

        let tmp = path.with_extension("json.tmp");
        let write_err = |source: std::io::Error| MavsnapError::SnapshotWrite {
            path: path.clone(),
            source,
        };

        let mut file = std::fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(&bytes).map_err(write_err)?;
        drop(file);
        std::fs::rename(&tmp, &path).map_err(write_err)?;

        Ok(path)
    }

    /// Read back the snapshot for `message_type`, if one exists.
    pub fn read(&self, message_type: &MessageType) -> Result<Option<Value>> {
        let path = self.path_for(message_type);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// `true` when `name` is a single, non-hidden path component.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}

/// Serialize with 4-space indentation.
fn to_pretty_json(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
