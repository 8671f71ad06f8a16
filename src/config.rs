//! Run configuration.
//!
//! The configuration names the monitored groups, their failover thresholds
//! and the files that carry state between runs:
//!
//! ```toml
//! record_file = "failovers.csv"
//! reference_file = "reference.json"
//!
//! [history]
//! span = 72.0
//!
//! [groups.frontier]
//! instances = ["stats/frontier-1.csv", "stats/frontier-2.csv"]
//! file_last_stats = "state/frontier.last"
//! rate_threshold = 5.0
//! ```
//!
//! Values can be overridden from the environment with the `FAILWATCH_`
//! prefix and `__` as the nesting separator, e.g.
//! `FAILWATCH_HISTORY__SPAN=24`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{MonitorError, Result};

/// Number of rows kept per (group, site, relay) key in the reduced record.
pub const DEFAULT_REDUCED_RANKS: usize = 12;

/// Top-level configuration for one invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Full failover history table. The reduced table is written next to it.
    pub record_file: PathBuf,
    /// JSON classification table (host -> relay flag and site).
    #[serde(default)]
    pub reference_file: Option<PathBuf>,
    #[serde(default = "default_reduced_ranks")]
    pub reduced_ranks: usize,
    pub history: HistoryConfig,
    /// Monitored groups keyed by name. Groups are processed in name order.
    pub groups: BTreeMap<String, GroupConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Default retention span, in hours.
    pub span: f64,
}

/// Configuration for one monitored server group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Statistics sources for the group's serving instances.
    pub instances: Vec<String>,
    /// Where the last raw snapshot is kept between runs.
    pub file_last_stats: PathBuf,
    /// Per-site failover rate limit, in queries per second.
    pub rate_threshold: f64,
    /// Overrides `history.span` for this group.
    #[serde(default)]
    pub retention_hours: Option<f64>,
}

fn default_reduced_ranks() -> usize {
    DEFAULT_REDUCED_RANKS
}

impl GroupConfig {
    /// Retention span for this group, falling back to the global span.
    pub fn retention_hours(&self, default_span: f64) -> f64 {
        self.retention_hours.unwrap_or(default_span)
    }
}

impl MonitorConfig {
    /// Load configuration from a file (format picked from the extension)
    /// with environment overrides, then validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("FAILWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| MonitorError::Config(e.to_string()))?;

        let parsed: MonitorConfig = config
            .try_deserialize()
            .map_err(|e| MonitorError::Config(e.to_string()))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Check every value the pipeline depends on.
    ///
    /// Runs before any group is processed so a bad threshold never leaves
    /// half of the groups written.
    pub fn validate(&self) -> Result<()> {
        if self.record_file.as_os_str().is_empty() {
            return Err(MonitorError::Config("record_file is empty".to_string()));
        }
        if self.groups.is_empty() {
            return Err(MonitorError::Config("no groups configured".to_string()));
        }
        if self.reduced_ranks == 0 {
            return Err(MonitorError::Config(
                "reduced_ranks must be at least 1".to_string(),
            ));
        }
        check_positive("history.span", self.history.span)?;

        for (name, group) in &self.groups {
            check_positive(&format!("groups.{name}.rate_threshold"), group.rate_threshold)?;
            if let Some(hours) = group.retention_hours {
                check_positive(&format!("groups.{name}.retention_hours"), hours)?;
            }
            if group.instances.is_empty() {
                return Err(MonitorError::Config(format!(
                    "groups.{name}.instances is empty"
                )));
            }
            if group.file_last_stats.as_os_str().is_empty() {
                return Err(MonitorError::Config(format!(
                    "groups.{name}.file_last_stats is empty"
                )));
            }
        }

        Ok(())
    }
}

fn check_positive(key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MonitorError::Config(format!(
            "{key} must be a positive number, got {value}"
        )))
    }
}
