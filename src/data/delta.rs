//! Conversion of cumulative counter snapshots into interval rates.

use failwatch_types::{Counters, RateRecord, Snapshot};

use crate::error::{MonitorError, Result};

/// Outcome of comparing the current snapshot with the previous one.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    /// No previous snapshot exists; rates are not available yet.
    NoBaseline,
    /// One unclassified row per host in the current snapshot.
    Rates(Vec<RateRecord>),
}

/// Compute per-host rates between `previous` and `current`.
///
/// Hosts only present in `previous` produce no row. A host with any counter
/// lower than before was restarted and is treated like a new host: both of
/// its current values are taken as the whole delta. Fails with
/// `InvalidInterval` when the snapshots are not strictly ordered in time.
pub fn compute(current: &Snapshot, previous: Option<&Snapshot>) -> Result<Delta> {
    let Some(previous) = previous else {
        return Ok(Delta::NoBaseline);
    };

    let elapsed = current.timestamp - previous.timestamp;
    if elapsed <= 0 {
        return Err(MonitorError::InvalidInterval { elapsed });
    }
    let secs = elapsed as f64;

    let rates = current
        .iter()
        .map(|(host, now)| {
            let delta = counter_delta(*now, previous.get(host).copied());
            RateRecord::new(
                host.clone(),
                delta.hits,
                delta.hits as f64 / secs,
                delta.bandwidth,
                delta.bandwidth as f64 / secs,
            )
        })
        .collect();

    Ok(Delta::Rates(rates))
}

/// Difference between two readings of the same host, or `now` itself when
/// there is no earlier reading or the host's counters were reset.
fn counter_delta(now: Counters, before: Option<Counters>) -> Counters {
    match before {
        Some(before) if now.hits >= before.hits && now.bandwidth >= before.bandwidth => {
            Counters {
                hits: now.hits - before.hits,
                bandwidth: now.bandwidth - before.bandwidth,
            }
        }
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000;

    fn snap(ts: i64, hosts: &[(&str, u64, u64)]) -> Snapshot {
        hosts
            .iter()
            .fold(Snapshot::builder().timestamp(ts), |b, (h, hits, bw)| {
                b.host(*h, Counters::new(*hits, *bw))
            })
            .build()
    }

    fn rates(delta: Delta) -> Vec<RateRecord> {
        match delta {
            Delta::Rates(rates) => rates,
            Delta::NoBaseline => panic!("expected rates"),
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_no_previous_snapshot() {
        let current = snap(T0, &[("host1", 10, 10)]);
        assert_eq!(compute(&current, None).unwrap(), Delta::NoBaseline);
    }

    #[test]
    fn test_monotonic_counters() {
        let previous = snap(T0, &[("host1", 100, 1000)]);
        let current = snap(T0 + 60, &[("host1", 1100, 7000)]);

        let rows = rates(compute(&current, Some(&previous)).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].host, "host1");
        assert_eq!(rows[0].hits, 1000);
        assert_close(rows[0].hits_rate, 1000.0 / 60.0);
        assert_eq!(rows[0].bandwidth, 6000);
        assert_close(rows[0].bandwidth_rate, 100.0);
        assert!((rows[0].hits_rate - 16.67).abs() < 0.01);
    }

    #[test]
    fn test_counter_reset_uses_current_value() {
        let previous = snap(T0, &[("host1", 2000, 10)]);
        let current = snap(T0 + 60, &[("host1", 1100, 40)]);

        let rows = rates(compute(&current, Some(&previous)).unwrap());
        assert_eq!(rows[0].hits, 1100);
        assert_close(rows[0].hits_rate, 1100.0 / 60.0);
        assert!((rows[0].hits_rate - 18.33).abs() < 0.01);
        // The restart zeroed every counter, so bandwidth restarts too.
        assert_eq!(rows[0].bandwidth, 40);
        assert_close(rows[0].bandwidth_rate, 40.0 / 60.0);
    }

    #[test]
    fn test_bandwidth_reset_rebases_hits() {
        let previous = snap(T0, &[("host1", 100, 5000)]);
        let current = snap(T0 + 10, &[("host1", 150, 200)]);

        let rows = rates(compute(&current, Some(&previous)).unwrap());
        assert_eq!(rows[0].hits, 150);
        assert_eq!(rows[0].bandwidth, 200);
    }

    #[test]
    fn test_new_host_rate_is_full_counter() {
        let previous = snap(T0, &[("host1", 100, 100)]);
        let current = snap(T0 + 30, &[("host1", 100, 100), ("host2", 90, 300)]);

        let rows = rates(compute(&current, Some(&previous)).unwrap());
        let host2 = rows.iter().find(|r| r.host == "host2").unwrap();
        assert_eq!(host2.hits, 90);
        assert_close(host2.hits_rate, 3.0);
        assert_close(host2.bandwidth_rate, 10.0);

        let host1 = rows.iter().find(|r| r.host == "host1").unwrap();
        assert_close(host1.hits_rate, 0.0);
    }

    #[test]
    fn test_vanished_host_has_no_row() {
        let previous = snap(T0, &[("host1", 1, 1), ("gone", 5, 5)]);
        let current = snap(T0 + 10, &[("host1", 2, 2)]);

        let rows = rates(compute(&current, Some(&previous)).unwrap());
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| r.host != "gone"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let previous = snap(T0, &[("host1", 1, 1)]);
        let current = snap(T0, &[("host1", 2, 2)]);

        let err = compute(&current, Some(&previous)).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidInterval { elapsed: 0 }));
    }

    #[test]
    fn test_negative_interval_rejected() {
        let previous = snap(T0 + 100, &[("host1", 1, 1)]);
        let current = snap(T0, &[("host1", 2, 2)]);

        let err = compute(&current, Some(&previous)).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidInterval { elapsed: -100 }));
    }

    #[test]
    fn test_rate_matches_difference_over_elapsed() {
        let cases = [(0u64, 0u64, 1i64), (5, 5, 7), (10, 250, 3), (1, 1_000_001, 3600)];
        for (before, after, elapsed) in cases {
            let previous = snap(T0, &[("h", before, before)]);
            let current = snap(T0 + elapsed, &[("h", after, after)]);

            let rows = rates(compute(&current, Some(&previous)).unwrap());
            assert_close(rows[0].hits_rate, (after - before) as f64 / elapsed as f64);
        }
    }

    #[test]
    fn test_rows_are_unclassified() {
        let previous = snap(T0, &[]);
        let current = snap(T0 + 1, &[("h", 1, 1)]);

        let rows = rates(compute(&current, Some(&previous)).unwrap());
        assert!(!rows[0].is_relay);
        assert!(rows[0].site.is_unknown());
    }
}
