//! Benchmark workloads
//!
//! Each timed operation runs in its own tokio task, so the store sees as
//! many concurrent callers as the runtime can schedule.

use super::report::{LatencyReport, PercentileRow};
use crate::KeyStore;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinSet;
use tracing::debug;

/// Value stored by the string workloads
const SENTENCE: &str = "abcdefghijklmnopkqrstuvwxyznowiknowmyabcsnexttimewontyousingwithme";

/// A benchmark scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workload {
    /// Parallel `put` of `-i` under integer key `i`
    IntWrites,
    /// Parallel `get` of every key of a pre-filled integer store
    IntReads,
    /// Parallel `put` of a fixed sentence under `u64` keys
    StringWrites,
    /// Parallel `get` of every key of a pre-filled string store
    StringReads,
    /// Like `StringWrites`, with at most `permits` writes in flight
    BufferedStringWrites { permits: usize },
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workload::IntWrites => write!(f, "writes with ints"),
            Workload::IntReads => write!(f, "reads with ints"),
            Workload::StringWrites => write!(f, "writes with strings"),
            Workload::StringReads => write!(f, "reads with strings"),
            Workload::BufferedStringWrites { permits } => {
                write!(f, "writes with strings in batches of {}", permits)
            }
        }
    }
}

/// Result of one benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct BenchOutcome {
    pub workload: Workload,
    pub ops: u64,
    pub total_ms: u64,
    pub percentiles: Vec<PercentileRow>,
}

impl fmt::Display for BenchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "benchmarking {} {}", self.ops, self.workload)?;
        writeln!(f, "total time {} ms", self.total_ms)?;
        for row in &self.percentiles {
            writeln!(
                f,
                "p:{} start {} nanoseconds, end {} nanoseconds",
                row.percentile, row.fastest_ns, row.slowest_ns
            )?;
        }
        Ok(())
    }
}

/// Run `workload` with `ops` timed operations
///
/// Must be called from within a tokio runtime.
pub async fn run(workload: Workload, ops: u64) -> anyhow::Result<BenchOutcome> {
    debug!("Running {} ({} ops)", workload, ops);

    let (total, mut report) = match workload {
        Workload::IntWrites => {
            let store = KeyStore::<i64, i64>::new();
            time_ops(ops, None, move |i| {
                let key = i as i64;
                store.put(key, -key);
            })
            .await?
        }
        Workload::IntReads => {
            let store = KeyStore::<i64, i64>::new();
            for i in 0..ops as i64 {
                store.put(i, -i);
            }
            time_ops(ops, None, move |i| {
                black_box(store.get(&(i as i64)));
            })
            .await?
        }
        Workload::StringWrites => {
            let store = KeyStore::<u64, Bytes>::new();
            time_ops(ops, None, move |i| {
                store.put(i, Bytes::from_static(SENTENCE.as_bytes()));
            })
            .await?
        }
        Workload::StringReads => {
            let store = KeyStore::<u64, Bytes>::new();
            for i in 0..ops {
                store.put(i, Bytes::from_static(SENTENCE.as_bytes()));
            }
            time_ops(ops, None, move |i| {
                black_box(store.get(&i));
            })
            .await?
        }
        Workload::BufferedStringWrites { permits } => {
            anyhow::ensure!(permits > 0, "buffered writes need at least one permit");
            let store = KeyStore::<u64, Bytes>::new();
            time_ops(ops, Some(permits), move |i| {
                store.put(i, Bytes::from_static(SENTENCE.as_bytes()));
            })
            .await?
        }
    };

    Ok(BenchOutcome {
        workload,
        ops,
        total_ms: u64::try_from(total.as_millis()).unwrap_or(u64::MAX),
        percentiles: report.percentiles(),
    })
}

/// Spawn one task per operation and collect each task's latency
///
/// With `permits`, a semaphore bounds how many operations run at once.
async fn time_ops<F>(
    ops: u64,
    permits: Option<usize>,
    op: F,
) -> anyhow::Result<(Duration, LatencyReport)>
where
    F: Fn(u64) + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let semaphore = permits.map(|p| Arc::new(Semaphore::new(p)));
    let mut tasks = JoinSet::new();

    let started = Instant::now();
    for i in 0..ops {
        let op = Arc::clone(&op);
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let _permit = match semaphore {
                Some(s) => Some(s.acquire_owned().await?),
                None => None,
            };

            let t = Instant::now();
            op(i);
            Ok::<_, AcquireError>(t.elapsed())
        });
    }

    let mut report = LatencyReport::with_capacity(ops as usize);
    while let Some(joined) = tasks.join_next().await {
        report.record(joined??);
    }

    Ok((started.elapsed(), report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_writes() {
        let outcome = tokio_test::block_on(run(Workload::IntWrites, 500)).unwrap();

        assert_eq!(outcome.ops, 500);
        assert_eq!(outcome.workload, Workload::IntWrites);
        assert!(!outcome.percentiles.is_empty());
    }

    #[test]
    fn test_string_reads() {
        let outcome = tokio_test::block_on(run(Workload::StringReads, 300)).unwrap();

        assert_eq!(outcome.ops, 300);
        for row in &outcome.percentiles {
            assert!(row.fastest_ns <= row.slowest_ns);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_buffered_writes() {
        let outcome = run(Workload::BufferedStringWrites { permits: 8 }, 1000)
            .await
            .unwrap();

        assert_eq!(outcome.ops, 1000);
        assert_eq!(outcome.percentiles.len(), 17);
    }

    #[tokio::test]
    async fn test_buffered_writes_reject_zero_permits() {
        let result = run(Workload::BufferedStringWrites { permits: 0 }, 10).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_outcome_serializes_to_json() {
        let outcome = BenchOutcome {
            workload: Workload::BufferedStringWrites { permits: 500 },
            ops: 2,
            total_ms: 1,
            percentiles: vec![],
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["workload"]["kind"], "buffered_string_writes");
        assert_eq!(json["workload"]["permits"], 500);
        assert_eq!(json["ops"], 2);
    }

    #[test]
    fn test_outcome_display() {
        let outcome = BenchOutcome {
            workload: Workload::IntReads,
            ops: 10,
            total_ms: 3,
            percentiles: vec![PercentileRow { percentile: 9, fastest_ns: 5, slowest_ns: 7 }],
        };

        let text = outcome.to_string();
        assert!(text.starts_with("benchmarking 10 reads with ints\n"));
        assert!(text.contains("p:9 start 5 nanoseconds, end 7 nanoseconds"));
    }
}
