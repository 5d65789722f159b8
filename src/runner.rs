//! Replaying workloads against a map.
//!
//! [`BenchmarkRunner`] owns one map and replays an operation sequence
//! against it in order. [`BenchmarkRunner::run`] times the replay, pausing
//! the clock at each checkpoint while it snapshots the map, and returns a
//! [`BenchReport`]. [`run_benchmark`] is where a validated configuration is
//! turned into a concrete map type; from there on every call is statically
//! dispatched.

use core::fmt;
use core::hash::BuildHasher;
use core::hint::black_box;
use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::info;

use crate::chaining::ChainingMap;
use crate::compact::CompactOpenAddressingMap;
use crate::config::BenchConfig;
use crate::config::DEFAULT_VALUE_SIZE;
use crate::config::Implementation;
use crate::hash::HashKind;
use crate::hash::IdentityHashBuilder;
use crate::hash::SipHashBuilder;
use crate::map::HashMapCore;
use crate::open_addressing::OpenAddressingMap;
use crate::stats::ProbeStats;
use crate::workload::Marker;
use crate::workload::Operation;
use crate::workload::WorkloadGenerator;

/// The value type stored by benchmark runs.
pub type Payload = Box<[u8]>;

/// Expands a value seed into a payload of `size` bytes.
#[inline]
pub fn make_payload(seed: u64, size: usize) -> Payload {
    seed.to_le_bytes().into_iter().cycle().take(size).collect()
}

/// Outcomes of the operations in a replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpCounts {
    /// Inserts of a new key.
    pub inserts: usize,
    /// Inserts that replaced an existing value.
    pub updates: usize,
    /// Lookups that found their key.
    pub get_hits: usize,
    /// Lookups that did not.
    pub get_misses: usize,
    /// Removes that found their key.
    pub remove_hits: usize,
    /// Removes that did not.
    pub remove_misses: usize,
}

impl OpCounts {
    /// Number of map operations counted.
    pub fn total(&self) -> usize {
        self.inserts
            + self.updates
            + self.get_hits
            + self.get_misses
            + self.remove_hits
            + self.remove_misses
    }
}

impl fmt::Display for OpCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (inserts {}, updates {}, get hits {}, get misses {}, remove hits {}, remove \
             misses {})",
            self.total(),
            self.inserts,
            self.updates,
            self.get_hits,
            self.get_misses,
            self.remove_hits,
            self.remove_misses
        )
    }
}

/// Map state at a checkpoint, and the cost of the segment that ended there.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointReport {
    /// The checkpoint.
    pub marker: Marker,
    /// Live entries.
    pub len: usize,
    /// Table capacity.
    pub capacity: usize,
    /// Load factor.
    pub load_factor: f64,
    /// Time spent in the segment.
    pub elapsed: Duration,
    /// Map operations in the segment.
    pub operations: usize,
    /// Mean probe length over the live entries.
    pub mean_probe_length: f64,
}

impl fmt::Display for CheckpointReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: len {}, capacity {}, load factor {:.4}, {} ops in {:?}, mean probe {:.3}",
            self.marker,
            self.len,
            self.capacity,
            self.load_factor,
            self.operations,
            self.elapsed,
            self.mean_probe_length
        )
    }
}

/// The result of one benchmark run.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchReport {
    /// Layout name.
    pub implementation: &'static str,
    /// Hash used, if the runner was labeled with one.
    pub hash: Option<HashKind>,
    /// Workload label.
    pub workload: String,
    /// Operation outcomes.
    pub counts: OpCounts,
    /// Time spent replaying, excluding checkpoint snapshots.
    pub elapsed: Duration,
    /// Final number of live entries.
    pub len: usize,
    /// Final capacity.
    pub capacity: usize,
    /// Final load factor.
    pub load_factor: f64,
    /// The layout's growth threshold.
    pub max_load_factor: f64,
    /// Probe lengths over the final layout.
    pub probe_stats: ProbeStats,
    /// One entry per checkpoint, in order.
    pub checkpoints: Vec<CheckpointReport>,
}

impl BenchReport {
    /// Map operations per second of replay time.
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.counts.total() as f64 / secs
        }
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "implementation: {}", self.implementation)?;
        if let Some(hash) = self.hash {
            writeln!(f, "hash: {hash}")?;
        }
        writeln!(f, "workload: {}", self.workload)?;
        writeln!(f, "operations: {}", self.counts)?;
        writeln!(
            f,
            "elapsed: {:?} ({:.0} ops/s)",
            self.elapsed,
            self.ops_per_sec()
        )?;
        writeln!(f, "final size: {}", self.len)?;
        writeln!(f, "final capacity: {}", self.capacity)?;
        writeln!(
            f,
            "final load factor: {:.4} (max {:.2})",
            self.load_factor, self.max_load_factor
        )?;
        writeln!(
            f,
            "probe length: mean {:.3}, max {}",
            self.probe_stats.mean(),
            self.probe_stats.max()
        )?;
        for checkpoint in &self.checkpoints {
            writeln!(f, "checkpoint {checkpoint}")?;
        }
        Ok(())
    }
}

/// Replays operation sequences against one map.
pub struct BenchmarkRunner<M> {
    map: M,
    value_size: usize,
    workload: String,
    hash: Option<HashKind>,
}

impl<M> BenchmarkRunner<M>
where
    M: HashMapCore<u64, Payload>,
{
    /// A runner over `map`, storing payloads of the default size.
    pub fn new(map: M) -> Self {
        Self {
            map,
            value_size: DEFAULT_VALUE_SIZE,
            workload: String::new(),
            hash: None,
        }
    }

    /// Sets the size in bytes of every stored payload.
    pub fn with_value_size(mut self, value_size: usize) -> Self {
        self.value_size = value_size;
        self
    }

    /// Names the workload and hash in the report.
    pub fn labeled(mut self, workload: impl Into<String>, hash: HashKind) -> Self {
        self.workload = workload.into();
        self.hash = Some(hash);
        self
    }

    /// The map under test.
    pub fn map(&self) -> &M {
        &self.map
    }

    /// Consumes the runner, returning the map.
    pub fn into_map(self) -> M {
        self.map
    }

    #[inline(always)]
    fn apply(&mut self, op: Operation, counts: &mut OpCounts) {
        match op {
            Operation::Insert { key, value } => {
                let payload = make_payload(value, self.value_size);
                match self.map.insert(key, payload) {
                    Some(old) => {
                        black_box(old);
                        counts.updates += 1;
                    }
                    None => counts.inserts += 1,
                }
            }
            Operation::Get { key } => match black_box(self.map.get(&key)) {
                Some(_) => counts.get_hits += 1,
                None => counts.get_misses += 1,
            },
            Operation::Remove { key } => match self.map.remove(&key) {
                Some(old) => {
                    black_box(old);
                    counts.remove_hits += 1;
                }
                None => counts.remove_misses += 1,
            },
            Operation::Checkpoint(_) => {}
        }
    }

    /// Replays `ops` with no timing or snapshots. Checkpoints are skipped.
    pub fn replay(&mut self, ops: &[Operation]) -> OpCounts {
        let mut counts = OpCounts::default();
        for &op in ops {
            self.apply(op, &mut counts);
        }
        counts
    }

    /// Replays `ops`, timing each segment between checkpoints.
    pub fn run(&mut self, ops: &[Operation]) -> BenchReport {
        let mut counts = OpCounts::default();
        let mut checkpoints = Vec::new();
        let mut elapsed = Duration::ZERO;
        let mut segment_ops = 0;
        let mut segment_start = Instant::now();

        for &op in ops {
            if let Operation::Checkpoint(marker) = op {
                let segment = segment_start.elapsed();
                elapsed += segment;

                let checkpoint = CheckpointReport {
                    marker,
                    len: self.map.len(),
                    capacity: self.map.capacity(),
                    load_factor: self.map.load_factor(),
                    elapsed: segment,
                    operations: segment_ops,
                    mean_probe_length: self.map.probe_stats().mean(),
                };
                debug!("{}: {checkpoint}", M::NAME);
                checkpoints.push(checkpoint);

                segment_ops = 0;
                segment_start = Instant::now();
            } else {
                self.apply(op, &mut counts);
                segment_ops += 1;
            }
        }
        elapsed += segment_start.elapsed();

        info!(
            "{}: replayed {} operations in {elapsed:?}, final len {} capacity {}",
            M::NAME,
            counts.total(),
            self.map.len(),
            self.map.capacity()
        );

        BenchReport {
            implementation: M::NAME,
            hash: self.hash,
            workload: self.workload.clone(),
            counts,
            elapsed,
            len: self.map.len(),
            capacity: self.map.capacity(),
            load_factor: self.map.load_factor(),
            max_load_factor: self.map.max_load_factor(),
            probe_stats: self.map.probe_stats(),
            checkpoints,
        }
    }
}

/// Generates the configured workload and runs it against the configured
/// map and hash.
pub fn run_benchmark(config: &BenchConfig) -> BenchReport {
    let generator = WorkloadGenerator::new(config.seed);
    let ops = generator.generate(&config.workload);
    info!(
        "generated {} operations for {} (seed {:#x})",
        ops.len(),
        config.workload.label(),
        generator.seed()
    );

    match config.hash {
        #[cfg(feature = "foldhash")]
        HashKind::Fold => with_hasher(config, &ops, crate::hash::FoldHashBuilder::default()),
        HashKind::Sip => with_hasher(config, &ops, SipHashBuilder::default()),
        HashKind::Identity => with_hasher(config, &ops, IdentityHashBuilder::default()),
    }
}

fn with_hasher<S: BuildHasher>(
    config: &BenchConfig,
    ops: &[Operation],
    hash_builder: S,
) -> BenchReport {
    let capacity = config.initial_capacity;
    match config.implementation {
        Implementation::Chaining => run_map(
            config,
            ops,
            ChainingMap::with_capacity_and_hasher(capacity, hash_builder),
        ),
        Implementation::OpenAddressing => run_map(
            config,
            ops,
            OpenAddressingMap::with_capacity_and_hasher(capacity, hash_builder),
        ),
        Implementation::OpenAddressingCompact => run_map(
            config,
            ops,
            CompactOpenAddressingMap::with_capacity_and_hasher(capacity, hash_builder),
        ),
    }
}

fn run_map<M>(config: &BenchConfig, ops: &[Operation], map: M) -> BenchReport
where
    M: HashMapCore<u64, Payload>,
{
    BenchmarkRunner::new(map)
        .with_value_size(config.value_size)
        .labeled(config.workload.label(), config.hash)
        .run(ops)
}
