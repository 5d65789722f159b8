//! Benchmark configuration.
//!
//! [`BenchOptions`] holds the options as an external driver supplies them,
//! names and all. [`BenchOptions::into_config`] validates them into a
//! [`BenchConfig`] before any benchmark work starts.

use core::fmt;
use core::str::FromStr;

use crate::error::ConfigError;
use crate::error::Result;
use crate::hash::HashKind;
use crate::key_space::CLUSTER_SPAN;
use crate::key_space::KeyPattern;
use crate::key_space::KeySpace;
use crate::map::table_capacity;
use crate::workload::MAX_CHECKPOINT_KEYS;
use crate::workload::OperationPreset;
use crate::workload::Workload;
use crate::workload::WorkloadKind;
use crate::workload::checkpoint_goal;

/// Default requested table capacity.
pub const DEFAULT_INITIAL_CAPACITY: usize = 65_536;
/// Default number of keys.
pub const DEFAULT_KEY_COUNT: usize = 100_000;
/// Default number of mixed operations.
pub const DEFAULT_OPERATIONS: usize = 1_000_000;
/// Default workload seed.
pub const DEFAULT_SEED: u64 = 0x5EED;
/// Default size in bytes of each stored value.
pub const DEFAULT_VALUE_SIZE: usize = 8;
/// Default load-factor checkpoints.
pub const DEFAULT_CHECKPOINTS: [f64; 3] = [0.25, 0.5, 0.75];

/// The map layouts a benchmark can run against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Implementation {
    /// [`ChainingMap`](crate::ChainingMap).
    Chaining,
    /// [`OpenAddressingMap`](crate::OpenAddressingMap).
    OpenAddressing,
    /// [`CompactOpenAddressingMap`](crate::CompactOpenAddressingMap).
    OpenAddressingCompact,
}

impl Implementation {
    /// Every implementation, in the order they are listed on the command
    /// line.
    pub const ALL: [Implementation; 3] = [
        Implementation::Chaining,
        Implementation::OpenAddressing,
        Implementation::OpenAddressingCompact,
    ];

    /// The name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Implementation::Chaining => "chaining",
            Implementation::OpenAddressing => "open_addressing",
            Implementation::OpenAddressingCompact => "open_addressing_compact",
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Implementation {
    type Err = ConfigError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Implementation::ALL
            .into_iter()
            .find(|implementation| implementation.name() == s)
            .ok_or_else(|| ConfigError::UnknownImplementation(s.to_string()))
    }
}

/// Benchmark options before validation.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchOptions {
    /// Workload name.
    pub workload: String,
    /// Implementation name.
    pub implementation: String,
    /// Key pattern name, for `key_distribution` only.
    pub key_pattern: Option<String>,
    /// Operation preset name, for `operation_mix` only.
    pub operation_pattern: Option<String>,
    /// Hash name; the default hash when `None`.
    pub hash: Option<String>,
    /// Requested table capacity, rounded up to a power of two.
    pub initial_capacity: usize,
    /// Keys inserted by `key_distribution`, `operation_mix` and `phases`.
    pub key_count: usize,
    /// Mixed operations run by `operation_mix`.
    pub operations: usize,
    /// Workload seed.
    pub seed: u64,
    /// Bytes per stored value.
    pub value_size: usize,
    /// Target load factors for `load_factor`.
    pub checkpoints: Vec<f64>,
    /// Dense ranges in the clustered key pattern.
    pub clusters: usize,
    /// Width of each dense range in the clustered key pattern.
    pub cluster_width: usize,
}

impl BenchOptions {
    /// Options for `workload` against `implementation`, everything else at
    /// its default.
    pub fn new(workload: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            workload: workload.into(),
            implementation: implementation.into(),
            key_pattern: None,
            operation_pattern: None,
            hash: None,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            key_count: DEFAULT_KEY_COUNT,
            operations: DEFAULT_OPERATIONS,
            seed: DEFAULT_SEED,
            value_size: DEFAULT_VALUE_SIZE,
            checkpoints: DEFAULT_CHECKPOINTS.to_vec(),
            clusters: crate::key_space::DEFAULT_CLUSTERS,
            cluster_width: crate::key_space::DEFAULT_CLUSTER_WIDTH,
        }
    }

    /// Validates the options.
    ///
    /// Names are checked first (workload, implementation, hash), then
    /// whether each pattern option fits the workload, then the pattern
    /// names, then numeric values.
    pub fn into_config(self) -> Result<BenchConfig> {
        let kind: WorkloadKind = self.workload.parse()?;
        let implementation: Implementation = self.implementation.parse()?;
        let hash = match &self.hash {
            Some(name) => name.parse()?,
            None => HashKind::default(),
        };

        if self.key_pattern.is_some() && kind != WorkloadKind::KeyDistribution {
            return Err(ConfigError::PatternWithoutWorkload {
                option: "key_pattern",
                expected: WorkloadKind::KeyDistribution.name(),
                workload: kind.name(),
            });
        }
        if self.operation_pattern.is_some() && kind != WorkloadKind::OperationMix {
            return Err(ConfigError::PatternWithoutWorkload {
                option: "operation_pattern",
                expected: WorkloadKind::OperationMix.name(),
                workload: kind.name(),
            });
        }

        if self.initial_capacity.checked_next_power_of_two().is_none() {
            return Err(ConfigError::InvalidValue {
                option: "initial_capacity",
                reason: format!("{} cannot be rounded to a power of two", self.initial_capacity),
            });
        }

        let workload = match kind {
            WorkloadKind::LoadFactor => {
                validate_checkpoints(&self.checkpoints, self.initial_capacity)?;
                Workload::LoadFactor {
                    initial_capacity: self.initial_capacity,
                    checkpoints: self.checkpoints,
                }
            }
            WorkloadKind::KeyDistribution => {
                let pattern: KeyPattern = self
                    .key_pattern
                    .as_deref()
                    .ok_or(ConfigError::MissingPattern {
                        workload: kind.name(),
                        option: "key_pattern",
                    })?
                    .parse()?;
                validate_key_count(self.key_count)?;
                let key_space = if pattern == KeyPattern::Clustered {
                    validate_positive("clusters", self.clusters)?;
                    validate_positive("cluster_width", self.cluster_width)?;
                    validate_within_span("clusters", self.clusters)?;
                    validate_within_span("cluster_width", self.cluster_width)?;
                    let per_cluster = self.key_count.div_ceil(self.clusters);
                    if per_cluster as u64 > CLUSTER_SPAN {
                        return Err(ConfigError::InvalidValue {
                            option: "key_count",
                            reason: format!(
                                "{} keys need {per_cluster} per cluster, more than {CLUSTER_SPAN}",
                                self.key_count
                            ),
                        });
                    }
                    KeySpace::new(pattern).with_clusters(self.clusters, self.cluster_width)
                } else {
                    KeySpace::new(pattern)
                };
                Workload::KeyDistribution {
                    key_count: self.key_count,
                    key_space,
                }
            }
            WorkloadKind::OperationMix => {
                let preset: OperationPreset = self
                    .operation_pattern
                    .as_deref()
                    .ok_or(ConfigError::MissingPattern {
                        workload: kind.name(),
                        option: "operation_pattern",
                    })?
                    .parse()?;
                validate_key_count(self.key_count)?;
                Workload::OperationMix {
                    initial_size: self.key_count,
                    operations: self.operations,
                    preset,
                }
            }
            WorkloadKind::Phases => {
                validate_key_count(self.key_count)?;
                Workload::Phases {
                    key_count: self.key_count,
                }
            }
        };

        Ok(BenchConfig {
            workload,
            implementation,
            hash,
            initial_capacity: self.initial_capacity,
            seed: self.seed,
            value_size: self.value_size,
        })
    }
}

fn validate_checkpoints(checkpoints: &[f64], initial_capacity: usize) -> Result<()> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        option: "checkpoints",
        reason,
    };

    if checkpoints.is_empty() {
        return Err(invalid("at least one checkpoint is required".to_string()));
    }
    if let Some(bad) = checkpoints.iter().find(|t| !t.is_finite() || **t <= 0.0) {
        return Err(invalid(format!("{bad} is not a positive load factor")));
    }
    let capacity = table_capacity(initial_capacity);
    if let Some(bad) = checkpoints
        .iter()
        .find(|&&t| checkpoint_goal(t, capacity) > MAX_CHECKPOINT_KEYS as f64)
    {
        return Err(invalid(format!(
            "{bad} needs more than {MAX_CHECKPOINT_KEYS} keys at capacity {capacity}"
        )));
    }
    if let Some(pair) = checkpoints.windows(2).find(|pair| pair[1] <= pair[0]) {
        return Err(invalid(format!(
            "{} does not follow {} in ascending order",
            pair[1], pair[0]
        )));
    }
    Ok(())
}

fn validate_key_count(key_count: usize) -> Result<()> {
    validate_positive("key_count", key_count)
}

fn validate_within_span(option: &'static str, value: usize) -> Result<()> {
    if value as u64 > CLUSTER_SPAN {
        return Err(ConfigError::InvalidValue {
            option,
            reason: format!("{value} exceeds {CLUSTER_SPAN}"),
        });
    }
    Ok(())
}

fn validate_positive(option: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            option,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// A validated benchmark configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    /// The workload to generate.
    pub workload: Workload,
    /// The layout to run it against.
    pub implementation: Implementation,
    /// The hash every map in the run uses.
    pub hash: HashKind,
    /// Requested table capacity.
    pub initial_capacity: usize,
    /// Workload seed.
    pub seed: u64,
    /// Bytes per stored value.
    pub value_size: usize,
}
