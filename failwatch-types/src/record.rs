//! Rate rows and failover events derived from snapshots.

use std::fmt;

use crate::Timestamp;

/// Coarse geographic/administrative grouping of traffic sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Site(String);

impl Site {
    /// Label given to hosts missing from the reference table.
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The site assigned when classification finds no entry.
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Site {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Traffic of one host over one polling interval.
///
/// `hits` and `bandwidth` hold the interval deltas, the `*_rate` fields the
/// deltas divided by the elapsed seconds.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateRecord {
    /// Host identifier (network address).
    pub host: String,
    /// Optional display alias for relay hosts.
    pub alias: String,
    pub hits: u64,
    /// Requests per second.
    pub hits_rate: f64,
    pub bandwidth: u64,
    /// Bytes per second.
    pub bandwidth_rate: f64,
    /// Whether the host is a known relay (squid) rather than a direct client.
    pub is_relay: bool,
    pub site: Site,
}

impl RateRecord {
    /// Create an unclassified row: non-relay, unknown site, no alias.
    pub fn new(
        host: impl Into<String>,
        hits: u64,
        hits_rate: f64,
        bandwidth: u64,
        bandwidth_rate: f64,
    ) -> Self {
        Self {
            host: host.into(),
            alias: String::new(),
            hits,
            hits_rate,
            bandwidth,
            bandwidth_rate,
            is_relay: false,
            site: Site::unknown(),
        }
    }
}

/// A rate row whose site exceeded its group's failover threshold.
///
/// Events are immutable once stamped; they live in the history record
/// until pruned by age.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailoverEvent {
    /// Run time at which the event was recorded.
    pub timestamp: Timestamp,
    /// Name of the server group the traffic reached.
    pub group: String,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub record: RateRecord,
}

impl FailoverEvent {
    pub fn new(timestamp: Timestamp, group: impl Into<String>, record: RateRecord) -> Self {
        Self {
            timestamp,
            group: group.into(),
            record,
        }
    }

    /// Key used when summarising the history: (group, site, relay flag).
    pub fn grouping_key(&self) -> (&str, &Site, bool) {
        (&self.group, &self.record.site, self.record.is_relay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclassified_record_defaults() {
        let record = RateRecord::new("10.0.0.1", 60, 1.0, 600, 10.0);
        assert!(!record.is_relay);
        assert!(record.site.is_unknown());
        assert!(record.alias.is_empty());
    }

    #[test]
    fn test_site_display() {
        assert_eq!(Site::new("T2_CH_CERN").to_string(), "T2_CH_CERN");
        assert_eq!(Site::unknown().as_str(), "Unknown");
    }

    #[test]
    fn test_grouping_key() {
        let mut record = RateRecord::new("10.0.0.1", 1, 1.0, 1, 1.0);
        record.site = Site::new("X");
        record.is_relay = true;
        let event = FailoverEvent::new(10, "A", record);

        assert_eq!(event.grouping_key(), ("A", &Site::new("X"), true));
    }
}
