//! Snapshot persistence.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pt_core::{LogError, Snapshot, SnapshotLog};
use serde::Serialize;
use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid snapshot log: {0}")]
    Log(#[from] LogError),
}

/// Receives the full snapshot history after every successful poll.
pub trait SnapshotSink {
    fn persist(&mut self, snapshots: &[Snapshot]) -> Result<(), SinkError>;
}

/// Rewrites a pretty-printed JSON array of snapshots on every poll.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for JsonFileSink {
    fn persist(&mut self, snapshots: &[Snapshot]) -> Result<(), SinkError> {
        write_json_atomic(&self.path, snapshots)?;
        tracing::trace!(path = %self.path.display(), count = snapshots.len(), "snapshot log written");
        Ok(())
    }
}

/// Writes `value` as pretty JSON via a sibling temp file and a rename, so a
/// crash mid-write never leaves a truncated file behind.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SinkError> {
    let io_err = |source: std::io::Error| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Reads a snapshot log written by [`JsonFileSink`].
///
/// A missing file is an empty log.
pub fn read_snapshot_log(path: &Path) -> Result<SnapshotLog, SinkError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SnapshotLog::new()),
        Err(source) => {
            return Err(SinkError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let snapshots: Vec<Snapshot> = serde_json::from_str(&content)?;
    Ok(SnapshotLog::from_snapshots(snapshots)?)
}
