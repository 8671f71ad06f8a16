//! Tagging of rate rows with relay membership and site.
//!
//! The reference table is produced outside this crate (GeoIP lookups and
//! exception lists) and handed over as JSON:
//!
//! ```json
//! {
//!   "10.0.0.1": { "is_relay": true, "site": "T1_X", "alias": "squid1.example.org" },
//!   "192.0.2.7": { "is_relay": false, "site": "T2_Y" }
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use failwatch_types::{RateRecord, Site};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Classification of one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostClass {
    #[serde(default)]
    pub is_relay: bool,
    pub site: Site,
    #[serde(default)]
    pub alias: String,
}

/// Read-only host classification shared by every group in a run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    hosts: HashMap<String, HostClass>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| MonitorError::io(path, e))?;
        Self::parse(&content).map_err(|e| MonitorError::corrupt(path, e.to_string()))
    }

    /// Parse the table from a JSON string.
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        let hosts = serde_json::from_str(content)?;
        Ok(Self { hosts })
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, host: impl Into<String>, class: HostClass) {
        self.hosts.insert(host.into(), class);
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Whether `host` is a known relay.
    pub fn is_relay(&self, host: &str) -> bool {
        self.hosts.get(host).is_some_and(|c| c.is_relay)
    }

    /// Tag a row with relay flag, site and alias.
    ///
    /// Hosts missing from the table are direct clients of an unknown site.
    pub fn classify(&self, mut record: RateRecord) -> RateRecord {
        match self.hosts.get(&record.host) {
            Some(class) => {
                record.is_relay = class.is_relay;
                record.site = class.site.clone();
                record.alias = class.alias.clone();
            }
            None => {
                record.is_relay = false;
                record.site = Site::unknown();
            }
        }
        record
    }

    /// Classify every row.
    pub fn classify_all(&self, records: Vec<RateRecord>) -> Vec<RateRecord> {
        records.into_iter().map(|r| self.classify(r)).collect()
    }
}
