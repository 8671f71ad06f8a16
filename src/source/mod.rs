//! Sources of raw traffic counters.
//!
//! Collecting per-instance statistics is done outside this crate; a
//! [`CounterSource`] hands the already-gathered cumulative counters for a
//! group's instances to the pipeline.

mod file;
mod memory;

pub use file::FileSource;
pub use memory::MemorySource;

use std::fmt::Debug;

use failwatch_types::{Snapshot, Timestamp};

use crate::error::Result;

/// Trait for obtaining the current cumulative counters of a group.
///
/// # Example
///
/// ```
/// use failwatch::{CounterSource, MemorySource};
/// use failwatch_types::{Counters, Snapshot};
///
/// let mut source = MemorySource::new();
/// source.set("frontier", Snapshot::builder().host("10.0.0.1", Counters::new(5, 50)).build());
///
/// let snapshot = source.collect("frontier", &[], 1_700_000_000).unwrap();
/// assert_eq!(snapshot.timestamp, 1_700_000_000);
/// ```
pub trait CounterSource: Debug {
    /// Collect counters for `group`, summed over its `instances`, stamped
    /// with `now`.
    fn collect(&mut self, group: &str, instances: &[String], now: Timestamp) -> Result<Snapshot>;

    /// Returns a human-readable description of the source, for logging.
    fn description(&self) -> &str;
}
