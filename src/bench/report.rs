//! Latency collection and percentile reporting

use serde::Serialize;
use std::time::Duration;

/// Percentiles printed in a report: the first ten, then the usual landmarks
pub const REPORTED_PERCENTILES: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 25, 50, 75, 90, 95, 99];

/// Fastest and slowest sample inside one percentile bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PercentileRow {
    pub percentile: u8,
    pub fastest_ns: u64,
    pub slowest_ns: u64,
}

/// One latency sample per timed operation
#[derive(Debug, Default)]
pub struct LatencyReport {
    samples: Vec<Duration>,
}

impl LatencyReport {
    pub fn with_capacity(capacity: usize) -> Self {
        LatencyReport {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Record the latency of one operation
    pub fn record(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sort the samples and compute the reported percentile buckets
    ///
    /// Bucket `p` covers the sorted samples from index `p * n / 100` up to
    /// (excluding) `(p + 1) * n / 100`. Buckets left empty because there are
    /// fewer than 100 samples are skipped.
    pub fn percentiles(&mut self) -> Vec<PercentileRow> {
        self.samples.sort_unstable();
        let n = self.samples.len();

        REPORTED_PERCENTILES
            .iter()
            .filter_map(|&p| {
                let start = p as usize * n / 100;
                let end = (p as usize + 1) * n / 100;
                if start >= end {
                    return None;
                }

                Some(PercentileRow {
                    percentile: p,
                    fastest_ns: as_nanos(self.samples[start]),
                    slowest_ns: as_nanos(self.samples[end - 1]),
                })
            })
            .collect()
    }
}

fn as_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_has_no_rows() {
        let mut report = LatencyReport::default();
        assert!(report.is_empty());
        assert!(report.percentiles().is_empty());
    }

    #[test]
    fn test_percentiles_over_sorted_samples() {
        let mut report = LatencyReport::with_capacity(200);
        // Recorded in reverse to check sorting
        for ns in (1..=200u64).rev() {
            report.record(Duration::from_nanos(ns));
        }

        let rows = report.percentiles();
        assert_eq!(rows.len(), REPORTED_PERCENTILES.len());

        assert_eq!(
            rows[0],
            PercentileRow { percentile: 0, fastest_ns: 1, slowest_ns: 2 }
        );

        let p50 = rows.iter().find(|r| r.percentile == 50).unwrap();
        assert_eq!((p50.fastest_ns, p50.slowest_ns), (101, 102));

        let p99 = rows.last().unwrap();
        assert_eq!((p99.percentile, p99.fastest_ns, p99.slowest_ns), (99, 199, 200));
    }

    #[test]
    fn test_small_sample_skips_empty_buckets() {
        let mut report = LatencyReport::default();
        for ns in 0..10u64 {
            report.record(Duration::from_nanos(ns * 10));
        }

        let rows = report.percentiles();
        // With 10 samples only every tenth percentile has a sample
        let reported: Vec<u8> = rows.iter().map(|r| r.percentile).collect();
        assert_eq!(reported, vec![9, 99]);
    }
}
