//! Error types for the monitoring pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can abort a group's poll or the whole run.
///
/// A missing baseline and an unclassified host are not errors; they are
/// represented by [`Delta::NoBaseline`](crate::data::Delta) and
/// [`Site::unknown`](failwatch_types::Site::unknown).
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Elapsed time between two snapshots was zero or negative.
    #[error("Invalid polling interval: {elapsed}s between snapshots")]
    InvalidInterval { elapsed: i64 },

    /// A state file exists but could not be parsed.
    #[error("Corrupt state in {}: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },

    /// Missing or invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The counter collector failed for a group.
    #[error("Failed to collect counters for group {group}: {reason}")]
    Source { group: String, reason: String },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every configured group failed, so there is nothing to write.
    #[error("No group produced a failover record")]
    NoHealthyGroups,
}

impl MonitorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MonitorError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MonitorError::CorruptState {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, MonitorError>;
