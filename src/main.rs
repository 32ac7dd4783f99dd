use anyhow::Context;
use keystore::bench::{self, Workload};
use tracing::info;

/// Operations per workload when none is given
const DEFAULT_OPS: u64 = 1_000_000;

/// Command line: `keystore-bench [OPS] [--json]`
struct Args {
    ops: u64,
    json: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut args = Args {
            ops: DEFAULT_OPS,
            json: false,
        };

        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--json" => args.json = true,
                ops => {
                    args.ops = ops
                        .replace('_', "")
                        .parse()
                        .with_context(|| format!("invalid operation count '{}'", ops))?;
                }
            }
        }

        Ok(args)
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging (INFO by default, override with RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;

    let workers = num_cpus::get();
    info!("Detected {} CPU cores, benchmarking with {} ops per workload", workers, args.ops);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("failed to build benchmark runtime")?;

    runtime.block_on(run_suite(bench::default_suite(), &args))
}

async fn run_suite(suite: Vec<Workload>, args: &Args) -> anyhow::Result<()> {
    for workload in suite {
        let outcome = bench::run(workload, args.ops)
            .await
            .with_context(|| format!("benchmark '{}' failed", workload))?;

        if args.json {
            println!("{}", serde_json::to_string(&outcome)?);
        } else {
            println!("{}", outcome);
        }
    }

    Ok(())
}
