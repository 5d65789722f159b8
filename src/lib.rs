#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Separate chaining: an array of buckets, each a contiguous entry list.
pub mod chaining;

/// Open addressing with a dense control-byte array beside the entries.
pub mod compact;

pub mod config;
pub mod error;
pub mod hash;
pub mod key_space;
pub mod map;

/// Open addressing with linear probing and tombstones.
pub mod open_addressing;

pub mod runner;
pub mod stats;
pub mod workload;

pub use chaining::ChainingMap;
pub use compact::CompactOpenAddressingMap;
pub use config::BenchConfig;
pub use config::BenchOptions;
pub use config::Implementation;
pub use error::ConfigError;
pub use hash::HashKind;
pub use key_space::KeyPattern;
pub use key_space::KeySpace;
pub use map::Entry;
pub use map::HashMapCore;
pub use open_addressing::OpenAddressingMap;
pub use open_addressing::Slot;
pub use runner::BenchReport;
pub use runner::BenchmarkRunner;
pub use runner::run_benchmark;
pub use stats::ProbeStats;
pub use workload::Operation;
pub use workload::OperationPreset;
pub use workload::Workload;
pub use workload::WorkloadGenerator;
