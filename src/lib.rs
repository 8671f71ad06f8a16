//! # failwatch
//!
//! Detects server groups receiving excessive failover traffic: clients that
//! should reach a group through their site's relay (squid) cache but hit it
//! directly instead.
//!
//! The crate is meant to run once per period from a scheduler. Each run
//! compares the current cumulative traffic counters of every group with the
//! snapshot saved by the previous run, turns the difference into rates,
//! flags sites whose direct traffic exceeds the group's threshold and
//! appends the flagged traffic to an age-bounded record.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌───────────┐ │
//! │  │ source  │───▶│ monitor  │───▶│  data   │───▶│ record    │ │
//! │  │(counters)    │ (groups) │    │(pipeline)    │ files     │ │
//! │  └─────────┘    └──────────┘    └─────────┘    └───────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: [`CounterSource`] trait with file and in-memory implementations
//! - **[`data`]**: the pipeline stages - snapshot store, rate computation,
//!   classification, failover detection, history and rank reduction
//! - **[`monitor`]**: runs the pipeline for each configured group and writes
//!   the full and reduced records
//! - **[`config`]**: run configuration and validation
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Run once, typically from cron
//! failwatch --config failwatch.toml
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::path::Path;
//! use failwatch::{FileSource, Monitor, MonitorConfig, ReferenceTable};
//!
//! let config = MonitorConfig::load(Path::new("failwatch.toml"))?;
//! let reference = ReferenceTable::load(Path::new("reference.json"))?;
//! let mut monitor = Monitor::new(config, Box::new(FileSource::new("stats")), reference)?;
//! let summary = monitor.run(1_700_000_000)?;
//! println!("{} rows in {}", summary.record_rows, summary.record_path.display());
//! # Ok::<(), failwatch::MonitorError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod monitor;
pub mod source;

// Re-export main types for convenience
pub use config::{GroupConfig, HistoryConfig, MonitorConfig};
pub use data::{
    Delta, HistoryRecord, HostClass, RankReducer, Reduction, ReferenceTable, SnapshotStore,
};
pub use error::{MonitorError, Result};
pub use monitor::{GroupOutcome, Monitor, RunSummary};
pub use source::{CounterSource, FileSource, MemorySource};
