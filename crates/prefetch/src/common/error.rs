//! Configuration error definitions.
//!
//! The engine has no recoverable errors once it is running: every access is
//! accepted. The only failure surface is construction, where a configuration
//! that would break an invariant of the history store, the instruction index
//! or the aggressiveness controller is rejected up front.

use thiserror::Error;

/// Reasons a prefetcher configuration is rejected at construction.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A capacity, degree or interval that must be positive was zero.
    #[error("`{field}` must be greater than zero")]
    Zero {
        /// Name of the offending configuration field.
        field: &'static str,
    },

    /// Stride detection needs at least two addresses to compare.
    #[error("`sequence_length` must be at least 2, got {0}")]
    SequenceTooShort(usize),

    /// The history store cannot hold one full chain of `sequence_length` accesses.
    #[error("`ghb_capacity` ({capacity}) must be at least `sequence_length` ({sequence_length})")]
    HistoryTooSmall {
        /// Configured history store capacity.
        capacity: usize,
        /// Configured chain length used for stride detection.
        sequence_length: usize,
    },

    /// Block size must be a power of two so block numbers are a shift away.
    #[error("`block_bytes` must be a power of two, got {0}")]
    BlockSizeNotPowerOfTwo(u64),

    /// The initial aggressiveness level lies outside the level table.
    #[error("`initial_level` must be in {min}..={max}, got {level}")]
    LevelOutOfRange {
        /// Requested initial level.
        level: u8,
        /// Lowest valid level.
        min: u8,
        /// Highest valid level.
        max: u8,
    },

    /// An entry of the aggressiveness table has a zero distance or degree.
    #[error("aggressiveness level {level} has zero {what}")]
    EmptyLevel {
        /// One-based level whose entry is invalid.
        level: u8,
        /// Which component was zero (`"distance"` or `"degree"`).
        what: &'static str,
    },

    /// Accuracy and lateness thresholds must be ordered fractions.
    #[error("feedback thresholds must satisfy 0 <= low <= high <= 1 and lateness >= 0 (low={low}, high={high}, lateness={lateness})")]
    Thresholds {
        /// Lower accuracy band boundary.
        low: f64,
        /// Upper accuracy band boundary.
        high: f64,
        /// Lateness threshold.
        lateness: f64,
    },
}
