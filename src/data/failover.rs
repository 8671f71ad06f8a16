//! Detection of sites sending excessive failover traffic.

use std::collections::{BTreeMap, BTreeSet};

use failwatch_types::{RateRecord, Site};

/// Sum of non-relay request rates per site.
///
/// Relay traffic is excluded: it already goes through a cache and is not
/// failover pressure.
pub fn site_totals(records: &[RateRecord]) -> BTreeMap<Site, f64> {
    let mut totals = BTreeMap::new();
    for record in records.iter().filter(|r| !r.is_relay) {
        *totals.entry(record.site.clone()).or_insert(0.0) += record.hits_rate;
    }
    totals
}

/// Sites whose non-relay total is strictly above `threshold`.
pub fn offending_sites(records: &[RateRecord], threshold: f64) -> BTreeSet<Site> {
    site_totals(records)
        .into_iter()
        .filter(|(_, total)| *total > threshold)
        .map(|(site, _)| site)
        .collect()
}

/// Every row, relay or not, belonging to a site over the threshold.
///
/// Rows keep their input order.
pub fn detect(records: &[RateRecord], threshold: f64) -> Vec<RateRecord> {
    let sites = offending_sites(records, threshold);
    if sites.is_empty() {
        return Vec::new();
    }
    records.iter().filter(|r| sites.contains(&r.site)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(host: &str, site: &str, relay: bool, rate: f64) -> RateRecord {
        let mut record = RateRecord::new(host, 0, rate, 0, 0.0);
        record.site = Site::new(site);
        record.is_relay = relay;
        record
    }

    #[test]
    fn test_single_host_over_threshold() {
        let rows = vec![row("host1", "X", false, 1000.0 / 60.0)];
        let flagged = detect(&rows, 5.0);

        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].host, "host1");
        assert!((flagged[0].hits_rate - 16.67).abs() < 0.01);
    }

    #[test]
    fn test_threshold_is_strict() {
        let at = vec![row("a", "X", false, 2.0), row("b", "X", false, 3.0)];
        assert!(detect(&at, 5.0).is_empty());

        let above = vec![row("a", "X", false, 2.0), row("b", "X", false, 4.0)];
        assert_eq!(detect(&above, 5.0).len(), 2);
    }

    #[test]
    fn test_site_sum_flags_even_if_no_host_exceeds() {
        let rows = vec![
            row("a", "X", false, 2.0),
            row("b", "X", false, 2.0),
            row("c", "X", false, 2.0),
        ];
        assert_eq!(detect(&rows, 5.0).len(), 3);
    }

    #[test]
    fn test_relay_traffic_does_not_count_but_is_reported() {
        let rows = vec![
            row("squid", "X", true, 100.0),
            row("client", "X", false, 6.0),
            row("other", "Y", false, 1.0),
        ];

        let flagged = detect(&rows, 5.0);
        let hosts: Vec<_> = flagged.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["squid", "client"]);
    }

    #[test]
    fn test_relay_only_site_is_not_flagged() {
        let rows = vec![row("squid", "X", true, 100.0)];
        assert!(detect(&rows, 5.0).is_empty());
    }

    #[test]
    fn test_site_totals_excludes_relays() {
        let rows = vec![
            row("squid", "X", true, 100.0),
            row("a", "X", false, 1.5),
            row("b", "Y", false, 2.5),
        ];
        let totals = site_totals(&rows);
        assert_eq!(totals[&Site::new("X")], 1.5);
        assert_eq!(totals[&Site::new("Y")], 2.5);
    }
}
