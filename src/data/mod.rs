//! The failover detection pipeline.
//!
//! Each submodule is one stage, written as plain functions over value types
//! so it can be tested on its own:
//!
//! - [`store`]: persistence of the last raw snapshot per group ([`SnapshotStore`])
//! - [`delta`]: cumulative counters to interval rates ([`Delta`])
//! - [`classify`]: relay flag and site tagging ([`ReferenceTable`])
//! - [`failover`]: per-site threshold check
//! - [`history`]: the age-bounded failover record ([`HistoryRecord`])
//! - [`rank`]: top-N summary of the record ([`RankReducer`])
//! - [`table`]: CSV layout of the snapshot and record files
//!
//! ## Data Flow
//!
//! ```text
//! Snapshot (current) + Snapshot (previous)
//!        │
//!        ▼
//! delta::compute() ──▶ Vec<RateRecord>
//!        │
//!        ├──▶ ReferenceTable::classify_all()
//!        │
//!        └──▶ failover::detect() ──▶ HistoryRecord::append()
//! ```

pub mod classify;
pub mod delta;
pub mod failover;
pub mod history;
pub mod rank;
pub mod store;
pub mod table;

pub use classify::{HostClass, ReferenceTable};
pub use delta::Delta;
pub use history::HistoryRecord;
pub use rank::{Column, RankReducer, Reduction, OTHERS_LABEL};
pub use store::SnapshotStore;
