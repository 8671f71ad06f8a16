//! # failwatch-types
//!
//! Core types for failover traffic monitoring. This crate defines the values
//! that flow through the failwatch pipeline: cumulative counter snapshots,
//! per-host interval rates and the failover events kept in the history
//! record.
//!
//! ## Features
//!
//! - `serde`: JSON/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use failwatch_types::{Counters, Snapshot};
//!
//! let snapshot = Snapshot::builder()
//!     .timestamp(1_700_000_000)
//!     .host("10.0.0.1", Counters::new(1100, 52_000))
//!     .host("10.0.0.2", Counters::new(40, 800))
//!     .build();
//!
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(snapshot.total_hits(), 1140);
//! ```

mod record;
mod snapshot;

pub use record::*;
pub use snapshot::*;

/// Wall-clock instant as integer seconds since the Unix epoch (UTC).
pub type Timestamp = i64;
