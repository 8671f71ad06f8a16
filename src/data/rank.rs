//! Size-bounded summary of the failover record.
//!
//! Rows are grouped by (group, site, relay flag). Within a key holding more
//! than `ranks` rows, the rows with the highest request rate are kept and
//! the remainder collapses into a single `Others` row. The `Others` row is
//! a lossy summary: each column is reduced independently with its own rule.

use std::collections::{BTreeMap, HashMap};

use failwatch_types::{FailoverEvent, RateRecord, Site};

/// Host label of the synthetic row summarising the remainder.
pub const OTHERS_LABEL: &str = "Others";

/// A column of the record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Timestamp,
    Sites,
    Group,
    IsSquid,
    Host,
    Alias,
    Hits,
    HitsRate,
    Bandwidth,
    BandwidthRate,
}

/// How a column's values are combined into the `Others` row.
///
/// Text columns have no sum, so `Sum` behaves as `Max` for them; on the
/// relay flag `Sum` and `Max` mean "any", `Min` means "all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    #[default]
    Sum,
    Max,
    Min,
}

/// Keeps the top rows per grouping key and folds the rest.
#[derive(Debug, Clone)]
pub struct RankReducer {
    ranks: usize,
    rules: HashMap<Column, Reduction>,
}

impl RankReducer {
    /// A reducer keeping `ranks` rows per key, summing every column.
    pub fn new(ranks: usize) -> Self {
        Self {
            ranks,
            rules: HashMap::new(),
        }
    }

    /// The reducer used for the reduced record file.
    ///
    /// Key columns and the timestamp take the maximum of the remainder;
    /// everything else is summed.
    pub fn standard(ranks: usize) -> Self {
        Self::new(ranks)
            .with_rule(Column::Group, Reduction::Max)
            .with_rule(Column::Sites, Reduction::Max)
            .with_rule(Column::IsSquid, Reduction::Max)
            .with_rule(Column::Timestamp, Reduction::Max)
    }

    /// Override the reduction for one column.
    pub fn with_rule(mut self, column: Column, reduction: Reduction) -> Self {
        self.rules.insert(column, reduction);
        self
    }

    /// Rule applied to `column`.
    pub fn rule(&self, column: Column) -> Reduction {
        self.rules.get(&column).copied().unwrap_or_default()
    }

    /// Reduce a whole record. Keys come out in sorted order.
    pub fn reduce(&self, events: &[FailoverEvent]) -> Vec<FailoverEvent> {
        let mut groups: BTreeMap<(String, Site, bool), Vec<FailoverEvent>> = BTreeMap::new();
        for event in events {
            let (group, site, relay) = event.grouping_key();
            groups
                .entry((group.to_string(), site.clone(), relay))
                .or_default()
                .push(event.clone());
        }

        groups.into_values().flat_map(|rows| self.reduce_group(rows)).collect()
    }

    /// Reduce the rows of a single key.
    ///
    /// Up to `ranks` rows are returned unchanged and in their original
    /// order. Otherwise the rows are ranked by request rate (ties keep
    /// arrival order) and the remainder becomes one `Others` row.
    pub fn reduce_group(&self, mut rows: Vec<FailoverEvent>) -> Vec<FailoverEvent> {
        if rows.len() <= self.ranks {
            return rows;
        }

        rows.sort_by(|a, b| b.record.hits_rate.total_cmp(&a.record.hits_rate));
        let rest = rows.split_off(self.ranks);
        rows.push(self.others(&rest));
        rows
    }

    fn others(&self, rest: &[FailoverEvent]) -> FailoverEvent {
        let records = || rest.iter().map(|e| &e.record);

        let record = RateRecord {
            host: OTHERS_LABEL.to_string(),
            alias: reduce_text(self.rule(Column::Alias), records().map(|r| r.alias.as_str())),
            hits: reduce_count(self.rule(Column::Hits), records().map(|r| r.hits)),
            hits_rate: reduce_rate(self.rule(Column::HitsRate), records().map(|r| r.hits_rate)),
            bandwidth: reduce_count(self.rule(Column::Bandwidth), records().map(|r| r.bandwidth)),
            bandwidth_rate: reduce_rate(
                self.rule(Column::BandwidthRate),
                records().map(|r| r.bandwidth_rate),
            ),
            is_relay: reduce_flag(self.rule(Column::IsSquid), records().map(|r| r.is_relay)),
            site: Site::new(reduce_text(
                self.rule(Column::Sites),
                records().map(|r| r.site.as_str()),
            )),
        };

        FailoverEvent {
            timestamp: reduce_timestamp(
                self.rule(Column::Timestamp),
                rest.iter().map(|e| e.timestamp),
            ),
            group: reduce_text(self.rule(Column::Group), rest.iter().map(|e| e.group.as_str())),
            record,
        }
    }
}

fn reduce_count(rule: Reduction, values: impl Iterator<Item = u64>) -> u64 {
    match rule {
        Reduction::Sum => values.fold(0, u64::saturating_add),
        Reduction::Max => values.max().unwrap_or(0),
        Reduction::Min => values.min().unwrap_or(0),
    }
}

fn reduce_timestamp(rule: Reduction, values: impl Iterator<Item = i64>) -> i64 {
    match rule {
        Reduction::Sum => values.fold(0, i64::saturating_add),
        Reduction::Max => values.max().unwrap_or(0),
        Reduction::Min => values.min().unwrap_or(0),
    }
}

fn reduce_rate(rule: Reduction, values: impl Iterator<Item = f64>) -> f64 {
    match rule {
        Reduction::Sum => values.sum(),
        Reduction::Max => values.fold(f64::NEG_INFINITY, f64::max),
        Reduction::Min => values.fold(f64::INFINITY, f64::min),
    }
}

fn reduce_text<'a>(rule: Reduction, values: impl Iterator<Item = &'a str>) -> String {
    let picked = match rule {
        Reduction::Sum | Reduction::Max => values.max(),
        Reduction::Min => values.min(),
    };
    picked.unwrap_or_default().to_string()
}

fn reduce_flag(rule: Reduction, mut values: impl Iterator<Item = bool>) -> bool {
    match rule {
        Reduction::Sum | Reduction::Max => values.any(|v| v),
        Reduction::Min => values.all(|v| v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        group: &str,
        site: &str,
        relay: bool,
        host: &str,
        hits: u64,
        rate: f64,
    ) -> FailoverEvent {
        let mut record = RateRecord::new(host, hits, rate, hits * 10, rate * 10.0);
        record.site = Site::new(site);
        record.is_relay = relay;
        FailoverEvent::new(1_700_000_000, group, record)
    }

    fn fifteen_rows() -> Vec<FailoverEvent> {
        (0..15)
            .map(|i| row("A", "X", false, &format!("h{i}"), 100 + i, i as f64))
            .collect()
    }

    #[test]
    fn test_small_group_unchanged() {
        let rows = vec![row("A", "X", false, "a", 1, 1.0), row("A", "X", false, "b", 2, 5.0)];
        let reduced = RankReducer::standard(12).reduce(&rows);
        assert_eq!(reduced, rows);
    }

    #[test]
    fn test_fifteen_rows_reduce_to_thirteen() {
        let rows = fifteen_rows();
        let reduced = RankReducer::standard(12).reduce(&rows);

        assert_eq!(reduced.len(), 13);
        // Top rows by rate, highest first.
        assert_eq!(reduced[0].record.host, "h14");
        assert_eq!(reduced[11].record.host, "h3");

        let others = &reduced[12];
        assert_eq!(others.record.host, OTHERS_LABEL);
        // h0, h1, h2 fell out of rank.
        assert_eq!(others.record.hits, 100 + 101 + 102);
        assert_eq!(others.record.hits_rate, 0.0 + 1.0 + 2.0);
        assert_eq!(others.group, "A");
        assert_eq!(others.record.site, Site::new("X"));
        assert!(!others.record.is_relay);
        assert_eq!(others.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_sum_columns_are_conserved() {
        let rows = fifteen_rows();
        let reduced = RankReducer::standard(12).reduce(&rows);

        let total = |events: &[FailoverEvent]| -> (u64, u64) {
            events.iter().fold((0, 0), |(h, b), e| (h + e.record.hits, b + e.record.bandwidth))
        };
        assert_eq!(total(&reduced), total(&rows));
    }

    #[test]
    fn test_keys_reduced_independently() {
        let mut rows = fifteen_rows();
        rows.push(row("A", "X", true, "squid", 1, 50.0));
        rows.push(row("B", "X", false, "b", 1, 50.0));

        let reduced = RankReducer::standard(12).reduce(&rows);
        assert_eq!(reduced.len(), 15);
        assert!(reduced.iter().any(|e| e.record.host == "squid"));
        assert!(reduced.iter().any(|e| e.group == "B"));
    }

    #[test]
    fn test_keys_sorted_in_output() {
        let rows = vec![
            row("B", "X", false, "b", 1, 1.0),
            row("A", "Y", true, "ay", 1, 1.0),
            row("A", "Y", false, "an", 1, 1.0),
        ];
        let hosts: Vec<_> = RankReducer::standard(12)
            .reduce(&rows)
            .into_iter()
            .map(|e| e.record.host)
            .collect();
        assert_eq!(hosts, vec!["an", "ay", "b"]);
    }

    #[test]
    fn test_rule_override() {
        let reducer = RankReducer::new(1).with_rule(Column::Hits, Reduction::Max);
        assert_eq!(reducer.rule(Column::Hits), Reduction::Max);
        assert_eq!(reducer.rule(Column::Bandwidth), Reduction::Sum);

        let rows = vec![
            row("A", "X", false, "a", 5, 9.0),
            row("A", "X", false, "b", 7, 2.0),
            row("A", "X", false, "c", 3, 1.0),
        ];
        let reduced = reducer.reduce_group(rows);
        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced[1].record.hits, 7);
        assert_eq!(reduced[1].record.bandwidth, 100);
    }

    #[test]
    fn test_plain_sum_reducer_sums_timestamps() {
        let rows = vec![
            row("A", "X", false, "a", 1, 3.0),
            row("A", "X", false, "b", 1, 2.0),
            row("A", "X", false, "c", 1, 1.0),
        ];
        let reduced = RankReducer::new(1).reduce_group(rows);
        assert_eq!(reduced[1].timestamp, 2 * 1_700_000_000);
    }
}
