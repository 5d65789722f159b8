use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use collision_bench::BenchOptions;
use collision_bench::config::DEFAULT_CHECKPOINTS;
use collision_bench::config::DEFAULT_INITIAL_CAPACITY;
use collision_bench::config::DEFAULT_KEY_COUNT;
use collision_bench::config::DEFAULT_OPERATIONS;
use collision_bench::config::DEFAULT_SEED;
use collision_bench::config::DEFAULT_VALUE_SIZE;
use collision_bench::key_space::DEFAULT_CLUSTERS;
use collision_bench::key_space::DEFAULT_CLUSTER_WIDTH;
use collision_bench::run_benchmark;
use log::info;

/// Replays a deterministic workload against one hash map layout and prints
/// a report. Wrap the process in a profiler to capture hardware counters.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// load_factor, key_distribution, operation_mix or phases.
    #[arg(short = 'w', long)]
    workload: String,

    /// chaining, open_addressing or open_addressing_compact.
    #[arg(short = 'i', long)]
    implementation: String,

    /// uniform, clustered or sequential (key_distribution only).
    #[arg(long)]
    key_pattern: Option<String>,

    /// read_heavy, write_heavy, balanced or typical_web (operation_mix only).
    #[arg(long)]
    operation_pattern: Option<String>,

    /// foldhash, siphash or identity.
    #[arg(long)]
    hash: Option<String>,

    #[arg(short = 'c', long, default_value_t = DEFAULT_INITIAL_CAPACITY)]
    initial_capacity: usize,

    #[arg(short = 'n', long, default_value_t = DEFAULT_KEY_COUNT)]
    key_count: usize,

    #[arg(long, default_value_t = DEFAULT_OPERATIONS)]
    operations: usize,

    #[arg(short = 's', long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Bytes stored per value.
    #[arg(long, default_value_t = DEFAULT_VALUE_SIZE)]
    value_size: usize,

    /// Target load factors for load_factor, ascending.
    #[arg(long, value_delimiter = ',')]
    checkpoints: Option<Vec<f64>>,

    #[arg(long, default_value_t = DEFAULT_CLUSTERS)]
    clusters: usize,

    #[arg(long, default_value_t = DEFAULT_CLUSTER_WIDTH)]
    cluster_width: usize,

    /// Print the probe-length histogram of the final table.
    #[arg(long)]
    histogram: bool,
}

impl Args {
    fn into_options(self) -> BenchOptions {
        BenchOptions {
            workload: self.workload,
            implementation: self.implementation,
            key_pattern: self.key_pattern,
            operation_pattern: self.operation_pattern,
            hash: self.hash,
            initial_capacity: self.initial_capacity,
            key_count: self.key_count,
            operations: self.operations,
            seed: self.seed,
            value_size: self.value_size,
            checkpoints: self
                .checkpoints
                .unwrap_or_else(|| DEFAULT_CHECKPOINTS.to_vec()),
            clusters: self.clusters,
            cluster_width: self.cluster_width,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let histogram = args.histogram;
    let config = args
        .into_options()
        .into_config()
        .context("invalid benchmark configuration")?;
    info!("running {config:?}");

    let report = run_benchmark(&config);
    print!("{report}");
    if histogram {
        print!("{}", report.probe_stats.render_histogram());
    }
    Ok(())
}
