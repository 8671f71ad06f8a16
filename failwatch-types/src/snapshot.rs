//! Snapshot - a point-in-time capture of cumulative traffic counters.

use std::collections::BTreeMap;

use crate::Timestamp;

/// Cumulative counters for a single traffic source.
///
/// Both counters only grow while the serving instance stays up. A value
/// lower than the one seen in an earlier snapshot means the instance
/// restarted and its counters were reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Counters {
    /// Number of requests served.
    pub hits: u64,
    /// Number of bytes served.
    pub bandwidth: u64,
}

impl Counters {
    /// Create counters from raw values.
    pub fn new(hits: u64, bandwidth: u64) -> Self {
        Self { hits, bandwidth }
    }

    /// Add another set of counters to this one.
    ///
    /// Used when the same host shows up in the statistics of several
    /// instances of one group.
    pub fn accumulate(&mut self, other: Counters) {
        self.hits = self.hits.saturating_add(other.hits);
        self.bandwidth = self.bandwidth.saturating_add(other.bandwidth);
    }
}

/// One poll of cumulative counters for every host seen by a group.
///
/// Hosts are kept in a `BTreeMap` so files and rate rows come out in a
/// stable order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// When the counters were captured.
    pub timestamp: Timestamp,
    /// Counters keyed by host identifier (network address).
    pub hosts: BTreeMap<String, Counters>,
}

impl Snapshot {
    /// Create an empty snapshot taken at `timestamp`.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            hosts: BTreeMap::new(),
        }
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Check if the snapshot has no hosts.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Number of hosts in the snapshot.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Get the counters for a host.
    pub fn get(&self, host: &str) -> Option<&Counters> {
        self.hosts.get(host)
    }

    /// Record counters for a host, adding to any counters already present.
    pub fn record(&mut self, host: impl Into<String>, counters: Counters) {
        self.hosts.entry(host.into()).or_default().accumulate(counters);
    }

    /// Iterate over all hosts.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Counters)> {
        self.hosts.iter()
    }

    /// Total hits across all hosts.
    pub fn total_hits(&self) -> u64 {
        self.hosts.values().map(|c| c.hits).sum()
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    timestamp: Timestamp,
    hosts: BTreeMap<String, Counters>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capture time (seconds since the Unix epoch).
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = ts;
        self
    }

    /// Add a host with its counters.
    pub fn host(mut self, host: impl Into<String>, counters: Counters) -> Self {
        self.hosts.insert(host.into(), counters);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            timestamp: self.timestamp,
            hosts: self.hosts,
        }
    }
}
