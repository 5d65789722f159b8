//! Deterministic operation sequences.
//!
//! [`WorkloadGenerator::generate`] seeds a fresh [`SmallRng`] on every call,
//! so the sequence depends only on the seed and the [`Workload`]. Every
//! layout under comparison replays the identical sequence.

use core::fmt;
use core::str::FromStr;
use std::collections::HashSet;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::error::ConfigError;
use crate::key_space::KeyPattern;
use crate::key_space::KeySpace;
use crate::map::table_capacity;

/// Most keys a single load-factor checkpoint may ask for.
pub const MAX_CHECKPOINT_KEYS: u64 = 1 << 32;

/// Number of keys present when `capacity` slots reach the `target` load
/// factor.
pub(crate) fn checkpoint_goal(target: f64, capacity: usize) -> f64 {
    (target * capacity as f64).round()
}

/// A point in an operation sequence where the runner snapshots map state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Marker {
    /// The target load factor of the segment that just ended.
    LoadFactor(f64),
    /// The named phase that just ended.
    Phase(&'static str),
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::LoadFactor(target) => write!(f, "load factor {target:.2}"),
            Marker::Phase(name) => write!(f, "phase {name}"),
        }
    }
}

/// One step of a workload.
///
/// Insert values are seeds: the runner expands them into the stored
/// payload, so the sequence itself stays small.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operation {
    /// Insert or overwrite `key`.
    Insert {
        /// The key.
        key: u64,
        /// Seed of the value to store.
        value: u64,
    },
    /// Look `key` up.
    Get {
        /// The key.
        key: u64,
    },
    /// Remove `key`.
    Remove {
        /// The key.
        key: u64,
    },
    /// End of a measured segment.
    Checkpoint(Marker),
}

/// Percentages of reads and writes in an operation mix; the remainder are
/// removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationMix {
    /// Percentage of `Get` operations.
    pub read_pct: u8,
    /// Percentage of `Insert` operations.
    pub write_pct: u8,
}

impl OperationMix {
    /// Percentage of `Remove` operations.
    pub fn delete_pct(self) -> u8 {
        100 - self.read_pct - self.write_pct
    }
}

/// Named operation mixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationPreset {
    /// 90% reads, 5% writes, 5% removes.
    ReadHeavy,
    /// 5% reads, 90% writes, 5% removes.
    WriteHeavy,
    /// 33% reads, 33% writes, 34% removes.
    Balanced,
    /// 80% reads, 15% writes, 5% removes, like a cache in front of a
    /// database.
    TypicalWeb,
}

impl OperationPreset {
    /// Every preset, in the order they are listed on the command line.
    pub const ALL: [OperationPreset; 4] = [
        OperationPreset::ReadHeavy,
        OperationPreset::WriteHeavy,
        OperationPreset::Balanced,
        OperationPreset::TypicalWeb,
    ];

    /// The name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            OperationPreset::ReadHeavy => "read_heavy",
            OperationPreset::WriteHeavy => "write_heavy",
            OperationPreset::Balanced => "balanced",
            OperationPreset::TypicalWeb => "typical_web",
        }
    }

    /// The read and write percentages of this preset.
    pub fn mix(self) -> OperationMix {
        let (read_pct, write_pct) = match self {
            OperationPreset::ReadHeavy => (90, 5),
            OperationPreset::WriteHeavy => (5, 90),
            OperationPreset::Balanced => (33, 33),
            OperationPreset::TypicalWeb => (80, 15),
        };
        OperationMix {
            read_pct,
            write_pct,
        }
    }
}

impl fmt::Display for OperationPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationPreset::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| ConfigError::UnknownOperationPattern(s.to_string()))
    }
}

/// The workload families, without their parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    /// Lookups at increasing load-factor plateaus.
    LoadFactor,
    /// Insert then look up keys of one [`KeyPattern`].
    KeyDistribution,
    /// A fixed universe of keys under an [`OperationPreset`].
    OperationMix,
    /// Growth, overwrite and churn phases.
    Phases,
}

impl WorkloadKind {
    /// Every workload, in the order they are listed on the command line.
    pub const ALL: [WorkloadKind; 4] = [
        WorkloadKind::LoadFactor,
        WorkloadKind::KeyDistribution,
        WorkloadKind::OperationMix,
        WorkloadKind::Phases,
    ];

    /// The name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            WorkloadKind::LoadFactor => "load_factor",
            WorkloadKind::KeyDistribution => "key_distribution",
            WorkloadKind::OperationMix => "operation_mix",
            WorkloadKind::Phases => "phases",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkloadKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigError::UnknownWorkload(s.to_string()))
    }
}

/// A fully parameterized workload.
#[derive(Clone, Debug, PartialEq)]
pub enum Workload {
    /// For each target load factor `t`, in ascending order: insert fresh
    /// uniform keys until `round(t * capacity)` keys are present, look up
    /// every key inserted so far in shuffled order, then checkpoint.
    ///
    /// `capacity` is `initial_capacity` rounded the way the maps round it.
    LoadFactor {
        /// Requested initial capacity of the map under test.
        initial_capacity: usize,
        /// Ascending target load factors.
        checkpoints: Vec<f64>,
    },
    /// Insert `key_count` keys from `key_space`, then look each up in
    /// insertion order.
    KeyDistribution {
        /// Number of keys.
        key_count: usize,
        /// Where the keys come from.
        key_space: KeySpace,
    },
    /// Insert `initial_size` uniform keys, then run `operations` operations
    /// drawn from `preset` over that key universe.
    OperationMix {
        /// Size of the key universe, all inserted up front.
        initial_size: usize,
        /// Number of mixed operations after the populate phase.
        operations: usize,
        /// The read/write/remove mix.
        preset: OperationPreset,
    },
    /// Insert `key_count` keys, overwrite them all, then alternate removes
    /// of existing keys with inserts of fresh ones over 15% of the keys.
    Phases {
        /// Number of keys in the growth phase.
        key_count: usize,
    },
}

impl Workload {
    /// The family this workload belongs to.
    pub fn kind(&self) -> WorkloadKind {
        match self {
            Workload::LoadFactor { .. } => WorkloadKind::LoadFactor,
            Workload::KeyDistribution { .. } => WorkloadKind::KeyDistribution,
            Workload::OperationMix { .. } => WorkloadKind::OperationMix,
            Workload::Phases { .. } => WorkloadKind::Phases,
        }
    }

    /// A short label naming the workload and its pattern.
    pub fn label(&self) -> String {
        match self {
            Workload::KeyDistribution { key_space, .. } => {
                format!("{}/{}", self.kind(), key_space.pattern())
            }
            Workload::OperationMix { preset, .. } => format!("{}/{preset}", self.kind()),
            Workload::LoadFactor { .. } | Workload::Phases { .. } => self.kind().to_string(),
        }
    }
}

/// Builds operation sequences from a fixed seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkloadGenerator {
    seed: u64,
}

impl WorkloadGenerator {
    /// A generator for `seed`.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The seed every sequence starts from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates the full operation sequence for `workload`.
    pub fn generate(&self, workload: &Workload) -> Vec<Operation> {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut sink = OpSink::default();
        match workload {
            Workload::LoadFactor {
                initial_capacity,
                checkpoints,
            } => load_factor(
                &mut rng,
                &mut sink,
                table_capacity(*initial_capacity),
                checkpoints,
            ),
            Workload::KeyDistribution {
                key_count,
                key_space,
            } => key_distribution(&mut rng, &mut sink, *key_count, key_space),
            Workload::OperationMix {
                initial_size,
                operations,
                preset,
            } => operation_mix(&mut rng, &mut sink, *initial_size, *operations, *preset),
            Workload::Phases { key_count } => phases(&mut rng, &mut sink, *key_count),
        }
        sink.ops
    }
}

/// Collects operations and hands out value seeds in order.
#[derive(Default)]
struct OpSink {
    ops: Vec<Operation>,
    next_value: u64,
}

impl OpSink {
    fn insert(&mut self, key: u64) {
        let value = self.next_value;
        self.next_value += 1;
        self.ops.push(Operation::Insert { key, value });
    }

    fn get(&mut self, key: u64) {
        self.ops.push(Operation::Get { key });
    }

    fn remove(&mut self, key: u64) {
        self.ops.push(Operation::Remove { key });
    }

    fn checkpoint(&mut self, marker: Marker) {
        self.ops.push(Operation::Checkpoint(marker));
    }
}

fn load_factor(rng: &mut SmallRng, sink: &mut OpSink, capacity: usize, checkpoints: &[f64]) {
    let mut present = HashSet::new();
    let mut inserted = Vec::new();
    for &target in checkpoints {
        let goal = checkpoint_goal(target, capacity) as usize;
        while inserted.len() < goal {
            let key = rng.random::<u64>();
            if present.insert(key) {
                inserted.push(key);
                sink.insert(key);
            }
        }

        let mut lookups = inserted.clone();
        lookups.shuffle(rng);
        for key in lookups {
            sink.get(key);
        }
        sink.checkpoint(Marker::LoadFactor(target));
    }
}

fn key_distribution(rng: &mut SmallRng, sink: &mut OpSink, key_count: usize, space: &KeySpace) {
    let keys = space.keys(rng, key_count);
    for &key in &keys {
        sink.insert(key);
    }
    sink.checkpoint(Marker::Phase("insert"));
    for &key in &keys {
        sink.get(key);
    }
    sink.checkpoint(Marker::Phase("lookup"));
}

fn operation_mix(
    rng: &mut SmallRng,
    sink: &mut OpSink,
    initial_size: usize,
    operations: usize,
    preset: OperationPreset,
) {
    let keys = KeySpace::new(KeyPattern::Uniform).keys(rng, initial_size);
    for &key in &keys {
        sink.insert(key);
    }
    sink.checkpoint(Marker::Phase("populate"));
    if keys.is_empty() {
        return;
    }

    let mix = preset.mix();
    let reads = u32::from(mix.read_pct);
    let writes = reads + u32::from(mix.write_pct);
    for _ in 0..operations {
        let key = keys[rng.random_range(0..keys.len())];
        let roll = rng.random_range(0..100u32);
        if roll < reads {
            sink.get(key);
        } else if roll < writes {
            sink.insert(key);
        } else {
            sink.remove(key);
        }
    }
    sink.checkpoint(Marker::Phase("mixed"));
}

fn phases(rng: &mut SmallRng, sink: &mut OpSink, key_count: usize) {
    let uniform = KeySpace::new(KeyPattern::Uniform);
    let keys = uniform.keys(rng, key_count);
    for &key in &keys {
        sink.insert(key);
    }
    sink.checkpoint(Marker::Phase("growth"));

    for &key in &keys {
        sink.insert(key);
    }
    sink.checkpoint(Marker::Phase("overwrite"));

    let churn = key_count * 15 / 100;
    let fresh = uniform.keys(rng, churn / 2);
    for i in 0..churn {
        if i % 2 == 0 {
            sink.remove(keys[i]);
        } else {
            sink.insert(fresh[i / 2]);
        }
    }
    sink.checkpoint(Marker::Phase("churn"));
}
