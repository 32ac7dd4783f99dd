//! Benchmark harness
//!
//! Times bulk parallel `put`/`get` calls against fresh stores and reports
//! total wall time plus per-operation latency percentiles. Uses only the
//! store's public operations.

mod report;
mod workload;

pub use report::{LatencyReport, PercentileRow, REPORTED_PERCENTILES};
pub use workload::{run, BenchOutcome, Workload};

/// The default sequence: reads, then writes, then rate-limited writes
pub fn default_suite() -> Vec<Workload> {
    vec![
        Workload::IntReads,
        Workload::StringReads,
        Workload::IntWrites,
        Workload::StringWrites,
        Workload::BufferedStringWrites { permits: 10_000 },
        Workload::BufferedStringWrites { permits: 500 },
    ]
}
