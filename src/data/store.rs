//! Persistence of the last raw snapshot for a group.
//!
//! The snapshot file is the only state carried between runs besides the
//! failover record. Its first line is the capture time as a UTC epoch,
//! followed by the host table.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use failwatch_types::Snapshot;
use tracing::debug;

use super::table::{parse_snapshot, write_snapshot};
use crate::error::{MonitorError, Result};

/// File-backed store for one group's previous snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot.
    ///
    /// Returns `Ok(None)` when no snapshot has been saved yet. A file that
    /// exists but cannot be parsed is reported as `CorruptState` rather
    /// than treated as a fresh start.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no previous snapshot");
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(MonitorError::corrupt(&self.path, e.to_string()));
            }
            Err(e) => return Err(MonitorError::io(&self.path, e)),
        };

        parse_snapshot(&content, &self.path).map(Some)
    }

    /// Overwrite the stored snapshot with `snapshot`.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MonitorError::io(parent, e))?;
        }
        fs::write(&self.path, write_snapshot(snapshot))
            .map_err(|e| MonitorError::io(&self.path, e))?;
        debug!(path = %self.path.display(), hosts = snapshot.len(), "saved snapshot");
        Ok(())
    }
}
