//! Rolling record of failover events.
//!
//! The record is bounded by age, not size: events older than the retention
//! span are dropped when the record is loaded, before the current run
//! appends anything.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use failwatch_types::{FailoverEvent, RateRecord, Timestamp};
use tracing::debug;

use super::table::{parse_record, write_record};
use crate::error::{MonitorError, Result};

const SECS_PER_HOUR: f64 = 3600.0;

/// Failover events for one or more groups, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryRecord {
    events: Vec<FailoverEvent>,
}

impl HistoryRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<FailoverEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[FailoverEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop events recorded before `now - retention_hours`.
    pub fn prune(self, now: Timestamp, retention_hours: f64) -> Self {
        let cutoff = now as f64 - retention_hours * SECS_PER_HOUR;
        let events = self
            .events
            .into_iter()
            .filter(|e| e.timestamp as f64 >= cutoff)
            .collect();
        Self { events }
    }

    /// Stamp `new_events` with `now` and `group` and add them at the end.
    ///
    /// No pruning happens here; retention is applied once per run, on load.
    pub fn append(mut self, new_events: Vec<RateRecord>, now: Timestamp, group: &str) -> Self {
        self.events
            .extend(new_events.into_iter().map(|r| FailoverEvent::new(now, group, r)));
        self
    }

    /// Concatenate another record after this one.
    pub fn extend(&mut self, other: HistoryRecord) {
        self.events.extend(other.events);
    }

    /// Split the record into one record per group name.
    pub fn split_by_group(self) -> BTreeMap<String, HistoryRecord> {
        let mut groups: BTreeMap<String, HistoryRecord> = BTreeMap::new();
        for event in self.events {
            groups.entry(event.group.clone()).or_default().events.push(event);
        }
        groups
    }

    /// Load a record table.
    ///
    /// Returns `Ok(None)` when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no failover record yet");
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(MonitorError::corrupt(path, e.to_string()));
            }
            Err(e) => return Err(MonitorError::io(path, e)),
        };

        Ok(Some(Self::from_events(parse_record(&content, path)?)))
    }

    /// Write the record table, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_events(path, &self.events)
    }
}

/// Write failover events as a record table.
pub fn write_events(path: &Path, events: &[FailoverEvent]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MonitorError::io(parent, e))?;
    }
    fs::write(path, write_record(events)).map_err(|e| MonitorError::io(path, e))
}
