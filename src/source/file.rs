//! File-based counter source.
//!
//! Reads one `Host,Hits,Bandwidth` table per instance, as exported by the
//! statistics collector, and sums them per host.

use std::fs;
use std::path::{Path, PathBuf};

use failwatch_types::{Snapshot, Timestamp};
use tracing::debug;

use super::CounterSource;
use crate::data::table::parse_counter_table;
use crate::error::{MonitorError, Result};

/// A counter source that reads per-instance statistics dumps.
///
/// Each entry of a group's instance list is a path to a dump. Relative
/// paths are resolved against the source's base directory.
#[derive(Debug)]
pub struct FileSource {
    base_dir: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source rooted at `base_dir`.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let description = format!("files: {}", base_dir.display());
        Self {
            base_dir,
            description,
        }
    }

    /// Returns the directory instance paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn read_instance(&self, group: &str, instance: &str) -> Result<Snapshot> {
        let path = self.base_dir.join(instance);
        let content = fs::read_to_string(&path).map_err(|e| MonitorError::Source {
            group: group.to_string(),
            reason: format!("read error on {}: {}", path.display(), e),
        })?;
        parse_counter_table(&content, &path, 0).map_err(|e| MonitorError::Source {
            group: group.to_string(),
            reason: e.to_string(),
        })
    }
}

impl CounterSource for FileSource {
    fn collect(&mut self, group: &str, instances: &[String], now: Timestamp) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new(now);
        for instance in instances {
            let counters = self.read_instance(group, instance)?;
            debug!(group, instance = %instance, hosts = counters.len(), "read instance statistics");
            for (host, c) in counters.hosts {
                snapshot.record(host, c);
            }
        }
        Ok(snapshot)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
