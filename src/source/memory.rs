//! In-memory counter source.
//!
//! Holds counters pushed by the caller instead of reading them. Useful when
//! the collector runs in the same process, and in tests.

use std::collections::HashMap;

use failwatch_types::{Snapshot, Timestamp};

use super::CounterSource;
use crate::error::{MonitorError, Result};

/// A counter source that returns counters set by the caller.
///
/// The instance list is ignored; counters are stored per group.
#[derive(Debug, Default)]
pub struct MemorySource {
    groups: HashMap<String, Snapshot>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the counters returned for `group` on the next collect.
    pub fn set(&mut self, group: impl Into<String>, snapshot: Snapshot) {
        self.groups.insert(group.into(), snapshot);
    }
}

impl CounterSource for MemorySource {
    fn collect(&mut self, group: &str, _instances: &[String], now: Timestamp) -> Result<Snapshot> {
        let mut snapshot = self
            .groups
            .get(group)
            .cloned()
            .ok_or_else(|| MonitorError::Source {
                group: group.to_string(),
                reason: "no counters available".to_string(),
            })?;
        snapshot.timestamp = now;
        Ok(snapshot)
    }

    fn description(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use failwatch_types::Counters;

    #[test]
    fn test_collect_stamps_now() {
        let mut source = MemorySource::new();
        source.set("A", Snapshot::builder().timestamp(1).host("h", Counters::new(1, 2)).build());

        let snapshot = source.collect("A", &[], 99).unwrap();
        assert_eq!(snapshot.timestamp, 99);
        assert_eq!(snapshot.get("h"), Some(&Counters::new(1, 2)));
    }

    #[test]
    fn test_unknown_group_fails() {
        let mut source = MemorySource::new();
        let err = source.collect("A", &[], 0).unwrap_err();
        assert!(matches!(err, MonitorError::Source { .. }));
    }
}
