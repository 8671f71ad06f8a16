//! One monitoring run across all configured groups.
//!
//! ```text
//! CounterSource ──▶ SnapshotStore (load previous, save current)
//!                         │
//!                         ▼
//!                   delta::compute ──▶ ReferenceTable::classify
//!                                              │
//!                                              ▼
//!                  HistoryRecord ◀── failover::detect
//!                         │
//!                         ▼
//!        record file + RankReducer ──▶ reduced record file
//! ```
//!
//! Groups are processed one after the other. A group that fails is logged
//! and left out of the output; the others are still written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use failwatch_types::{RateRecord, Timestamp};
use tracing::{error, info, warn};

use crate::config::{GroupConfig, MonitorConfig};
use crate::data::history::write_events;
use crate::data::{
    delta, failover, Delta, HistoryRecord, RankReducer, ReferenceTable, SnapshotStore,
};
use crate::error::{MonitorError, Result};
use crate::source::CounterSource;

/// What happened to a group during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOutcome {
    /// Rates were computed; `flagged` rows belonged to offending sites.
    Checked { flagged: usize },
    /// First run for this group: the snapshot was saved, no rates yet.
    NoBaseline,
    /// The group's poll was aborted.
    Failed(String),
}

impl GroupOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, GroupOutcome::Failed(_))
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub now: Timestamp,
    pub outcomes: BTreeMap<String, GroupOutcome>,
    pub record_path: PathBuf,
    pub reduced_path: PathBuf,
    /// Rows in the full record after this run.
    pub record_rows: usize,
    /// Rows in the reduced record.
    pub reduced_rows: usize,
}

impl RunSummary {
    pub fn failed_groups(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_failed())
            .map(|(name, _)| name.as_str())
    }
}

/// Drives the pipeline for every configured group.
#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    source: Box<dyn CounterSource>,
    reference: ReferenceTable,
}

impl Monitor {
    /// Create a monitor. The configuration is validated here so that a bad
    /// value stops the run before any group touches its state files.
    pub fn new(
        config: MonitorConfig,
        source: Box<dyn CounterSource>,
        reference: ReferenceTable,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            reference,
        })
    }

    /// Run every group once at time `now` and write both record files.
    pub fn run(&mut self, now: Timestamp) -> Result<RunSummary> {
        info!(
            time = %format_time(now),
            groups = self.config.groups.len(),
            source = self.source.description(),
            "starting failover check"
        );

        let record_path = self.config.record_file.clone();
        let mut past = HistoryRecord::load(&record_path)?
            .unwrap_or_default()
            .split_by_group();

        let groups: Vec<(String, GroupConfig)> = self
            .config
            .groups
            .iter()
            .map(|(name, group)| (name.clone(), group.clone()))
            .collect();

        let mut record = HistoryRecord::new();
        let mut outcomes = BTreeMap::new();

        for (name, group) in &groups {
            let retention = group.retention_hours(self.config.history.span);
            let history = past.remove(name).unwrap_or_default().prune(now, retention);

            let outcome = match self.poll_group(name, group, now) {
                Ok(Some(flagged)) => {
                    let count = flagged.len();
                    record.extend(history.append(flagged, now, name));
                    GroupOutcome::Checked { flagged: count }
                }
                Ok(None) => {
                    record.extend(history);
                    GroupOutcome::NoBaseline
                }
                Err(e) => {
                    error!(group = %name, error = %e, "group poll failed");
                    GroupOutcome::Failed(e.to_string())
                }
            };
            outcomes.insert(name.clone(), outcome);
        }

        if !past.is_empty() {
            let dropped: Vec<_> = past.keys().cloned().collect();
            info!(groups = ?dropped, "dropping history of unconfigured groups");
        }

        if outcomes.values().all(GroupOutcome::is_failed) {
            return Err(MonitorError::NoHealthyGroups);
        }

        let reduced = RankReducer::standard(self.config.reduced_ranks).reduce(record.events());
        let reduced_path = reduced_path(&record_path);

        record.save(&record_path)?;
        write_events(&reduced_path, &reduced)?;

        info!(
            rows = record.len(),
            reduced_rows = reduced.len(),
            path = %record_path.display(),
            "wrote failover record"
        );

        Ok(RunSummary {
            now,
            outcomes,
            record_path,
            reduced_path,
            record_rows: record.len(),
            reduced_rows: reduced.len(),
        })
    }

    /// Poll one group. Returns `None` when the group has no baseline yet.
    fn poll_group(
        &mut self,
        name: &str,
        group: &GroupConfig,
        now: Timestamp,
    ) -> Result<Option<Vec<RateRecord>>> {
        let current = self.source.collect(name, &group.instances, now)?;

        let store = SnapshotStore::new(&group.file_last_stats);
        let previous = store.load()?;
        // Save before computing so the newest counters survive a failure below.
        store.save(&current)?;

        let rates = match delta::compute(&current, previous.as_ref())? {
            Delta::NoBaseline => {
                info!(group = %name, "no previous snapshot, skipping until next poll");
                return Ok(None);
            }
            Delta::Rates(rates) => self.reference.classify_all(rates),
        };

        let flagged = failover::detect(&rates, group.rate_threshold);
        for (site, total) in failover::site_totals(&rates) {
            if total > group.rate_threshold {
                warn!(
                    group = %name,
                    site = %site,
                    rate = %format!("{:.2}", total),
                    threshold = group.rate_threshold,
                    "excess failover traffic"
                );
            }
        }
        if flagged.is_empty() {
            info!(group = %name, hosts = rates.len(), "no failover activity");
        }

        Ok(Some(flagged))
    }
}

/// Path of the reduced record: `reduced` inserted before the extension.
///
/// `failovers.csv` becomes `failovers.reduced.csv`; a name without an
/// extension gets `.reduced` appended.
pub fn reduced_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let reduced = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.reduced.{ext}"),
        _ => format!("{file_name}.reduced"),
    };
    path.with_file_name(reduced)
}

fn format_time(ts: Timestamp) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(ts, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistoryConfig;
    use crate::source::MemorySource;
    use failwatch_types::{Counters, Snapshot};
    use tempfile::TempDir;

    #[test]
    fn test_reduced_path() {
        assert_eq!(
            reduced_path(Path::new("/var/lib/failovers.csv")),
            PathBuf::from("/var/lib/failovers.reduced.csv")
        );
        assert_eq!(
            reduced_path(Path::new("a.b.csv")),
            PathBuf::from("a.b.reduced.csv")
        );
        assert_eq!(
            reduced_path(Path::new("records")),
            PathBuf::from("records.reduced")
        );
        assert_eq!(
            reduced_path(Path::new(".hidden")),
            PathBuf::from(".hidden.reduced")
        );
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "1970-01-01T00:00:00+00:00");
    }

    fn config(dir: &TempDir, threshold: f64) -> MonitorConfig {
        let mut groups = BTreeMap::new();
        groups.insert(
            "A".to_string(),
            GroupConfig {
                instances: vec!["a".to_string()],
                file_last_stats: dir.path().join("A.last"),
                rate_threshold: threshold,
                retention_hours: None,
            },
        );
        MonitorConfig {
            record_file: dir.path().join("failovers.csv"),
            reference_file: None,
            reduced_ranks: 12,
            history: HistoryConfig { span: 24.0 },
            groups,
        }
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let dir = TempDir::new().unwrap();
        let result = Monitor::new(
            config(&dir, -1.0),
            Box::new(MemorySource::new()),
            ReferenceTable::new(),
        );
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_first_run_has_no_baseline() {
        let dir = TempDir::new().unwrap();
        let mut source = MemorySource::new();
        source.set("A", Snapshot::builder().host("h", Counters::new(1, 1)).build());

        let mut monitor =
            Monitor::new(config(&dir, 5.0), Box::new(source), ReferenceTable::new()).unwrap();
        let summary = monitor.run(1_000).unwrap();

        assert_eq!(summary.outcomes["A"], GroupOutcome::NoBaseline);
        assert_eq!(summary.record_rows, 0);
        assert!(dir.path().join("A.last").exists());
        assert!(dir.path().join("failovers.reduced.csv").exists());
    }

    #[test]
    fn test_all_groups_failing_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut monitor = Monitor::new(
            config(&dir, 5.0),
            Box::new(MemorySource::new()),
            ReferenceTable::new(),
        )
        .unwrap();

        let err = monitor.run(1_000).unwrap_err();
        assert!(matches!(err, MonitorError::NoHealthyGroups));
        assert!(!dir.path().join("failovers.csv").exists());
    }
}
