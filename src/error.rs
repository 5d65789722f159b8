//! Configuration errors.
//!
//! These are the only recoverable errors in the crate. Everything they
//! describe is detected before a benchmark starts.

use thiserror::Error;

/// Result type alias for configuration handling.
pub type Result<T> = core::result::Result<T, ConfigError>;

/// A benchmark configuration that cannot be run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The workload name is not recognized.
    #[error(
        "unknown workload '{0}', expected one of: load_factor, key_distribution, operation_mix, phases"
    )]
    UnknownWorkload(String),

    /// The implementation name is not recognized.
    #[error(
        "unknown implementation '{0}', expected one of: chaining, open_addressing, open_addressing_compact"
    )]
    UnknownImplementation(String),

    /// The key pattern name is not recognized.
    #[error("unknown key pattern '{0}', expected one of: uniform, clustered, sequential")]
    UnknownKeyPattern(String),

    /// The operation pattern name is not recognized.
    #[error(
        "unknown operation pattern '{0}', expected one of: read_heavy, write_heavy, balanced, typical_web"
    )]
    UnknownOperationPattern(String),

    /// The hash name is not recognized.
    #[error("unknown hash '{name}', expected one of: {accepted}")]
    UnknownHash {
        /// The rejected name.
        name: String,
        /// The names this build accepts.
        accepted: &'static str,
    },

    /// A pattern option was given for a workload that does not use it.
    #[error("{option} only applies to the {expected} workload, not {workload}")]
    PatternWithoutWorkload {
        /// The option that was given.
        option: &'static str,
        /// The workload the option belongs to.
        expected: &'static str,
        /// The workload that was selected.
        workload: &'static str,
    },

    /// A workload that needs a pattern was selected without one.
    #[error("the {workload} workload requires {option}")]
    MissingPattern {
        /// The selected workload.
        workload: &'static str,
        /// The missing option.
        option: &'static str,
    },

    /// A numeric option is out of range.
    #[error("invalid {option}: {reason}")]
    InvalidValue {
        /// The offending option.
        option: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
