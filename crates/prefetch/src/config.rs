//! Configuration for the GHB stride prefetcher.
//!
//! This module defines every parameter the engine reads at construction. It provides:
//! 1. **Defaults:** Baseline table sizes, lookahead, degree and the aggressiveness table.
//! 2. **Structures:** `PrefetchConfig` for the predictor and an optional `FeedbackConfig`
//!    that turns on feedback-directed aggressiveness control.
//! 3. **Validation:** `PrefetchConfig::validate` rejects configurations that would break
//!    an engine invariant.
//!
//! Configuration is supplied as JSON by the host or built in code from
//! `PrefetchConfig::default()` (plain variant) or `PrefetchConfig::feedback_directed()`.

use serde::Deserialize;

use crate::common::ConfigError;

/// Number of aggressiveness levels in the feedback table.
pub const LEVEL_COUNT: usize = 5;

/// Lowest (most conservative) aggressiveness level.
pub const MIN_LEVEL: u8 = 1;

/// Highest (most aggressive) aggressiveness level.
pub const MAX_LEVEL: u8 = LEVEL_COUNT as u8;

/// Default configuration constants for the prefetcher.
mod defaults {
    use super::AggressivenessLevel;

    /// Instruction index entries (distinct PCs tracked at once).
    pub const INDEX_CAPACITY: usize = 256;

    /// Global history buffer slots.
    pub const GHB_CAPACITY: usize = 256;

    /// Extra strides skipped before the first prefetch target.
    pub const LOOKAHEAD: u64 = 4;

    /// Prefetches emitted per trigger in the plain variant.
    pub const DEGREE: usize = 4;

    /// Accesses compared when deciding whether a stride is consistent.
    pub const SEQUENCE_LENGTH: usize = 3;

    /// Cache line size in bytes.
    pub const BLOCK_BYTES: u64 = 64;

    /// Index entries used by the feedback-directed preset.
    pub const FDP_INDEX_CAPACITY: usize = 2048;

    /// History slots used by the feedback-directed preset.
    pub const FDP_GHB_CAPACITY: usize = 2048 * 16;

    /// Lookahead used by the feedback-directed preset.
    pub const FDP_LOOKAHEAD: u64 = 0;

    /// Qualifying evictions per feedback interval.
    pub const INTERVAL: u64 = 1000;

    /// Level the controller starts at ("middle of the road").
    pub const INITIAL_LEVEL: u8 = 3;

    /// Accuracy at or above which a prefetcher is considered highly accurate.
    pub const HIGH_ACCURACY: f64 = 0.75;

    /// Accuracy below which a prefetcher is considered inaccurate.
    pub const LOW_ACCURACY: f64 = 0.40;

    /// Lateness above which the controller reacts at all.
    pub const LATENESS_THRESHOLD: f64 = 0.01;

    /// Level 1 (very conservative) through level 5 (very aggressive).
    pub const LEVELS: [AggressivenessLevel; super::LEVEL_COUNT] = [
        AggressivenessLevel { distance: 4, degree: 3 },
        AggressivenessLevel { distance: 8, degree: 3 },
        AggressivenessLevel { distance: 16, degree: 4 },
        AggressivenessLevel { distance: 32, degree: 5 },
        AggressivenessLevel { distance: 48, degree: 6 },
    ];
}

/// Unit in which addresses are recorded and strides are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Granularity {
    /// Cache-block numbers (`addr >> log2(block_bytes)`); prefetch targets are block starts.
    #[default]
    Block,
    /// Raw byte addresses; strides are byte deltas.
    Raw,
}

/// One row of the aggressiveness table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AggressivenessLevel {
    /// Maximum distance, in address units, a prefetch may run ahead of its trigger.
    pub distance: u64,
    /// Number of prefetches emitted per trigger at this level.
    pub degree: usize,
}

/// Prefetcher configuration.
///
/// # Examples
///
/// ```
/// use ghbsim_core::config::{Granularity, PrefetchConfig};
///
/// let json = r#"{
///     "index_capacity": 64,
///     "ghb_capacity": 512,
///     "lookahead": 0,
///     "granularity": "Raw",
///     "feedback": { "interval": 200 }
/// }"#;
///
/// let config: PrefetchConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.granularity, Granularity::Raw);
/// assert_eq!(config.sequence_length, 3);
/// assert_eq!(config.feedback.unwrap().initial_level, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrefetchConfig {
    /// Maximum number of distinct PCs tracked by the instruction index
    #[serde(default = "PrefetchConfig::default_index_capacity")]
    pub index_capacity: usize,

    /// Number of slots in the global history buffer
    #[serde(default = "PrefetchConfig::default_ghb_capacity")]
    pub ghb_capacity: usize,

    /// Strides skipped before the first prefetch target
    #[serde(default = "PrefetchConfig::default_lookahead")]
    pub lookahead: u64,

    /// Prefetches per trigger (plain variant; the feedback table overrides it)
    #[serde(default = "PrefetchConfig::default_degree")]
    pub degree: usize,

    /// Consecutive accesses that must share one stride
    #[serde(default = "PrefetchConfig::default_sequence_length")]
    pub sequence_length: usize,

    /// Cache line size in bytes (power of two)
    #[serde(default = "PrefetchConfig::default_block_bytes")]
    pub block_bytes: u64,

    /// Address unit for history and stride arithmetic
    #[serde(default)]
    pub granularity: Granularity,

    /// Emit prefetches for a zero stride (repeated same-unit accesses)
    #[serde(default)]
    pub emit_zero_stride: bool,

    /// Ask the host to fill issued prefetches into the triggering cache level
    #[serde(default = "PrefetchConfig::default_fill_this_level")]
    pub fill_this_level: bool,

    /// Feedback-directed aggressiveness control; `None` selects the plain variant
    #[serde(default)]
    pub feedback: Option<FeedbackConfig>,
}

impl PrefetchConfig {
    fn default_index_capacity() -> usize {
        defaults::INDEX_CAPACITY
    }

    fn default_ghb_capacity() -> usize {
        defaults::GHB_CAPACITY
    }

    fn default_lookahead() -> u64 {
        defaults::LOOKAHEAD
    }

    fn default_degree() -> usize {
        defaults::DEGREE
    }

    fn default_sequence_length() -> usize {
        defaults::SEQUENCE_LENGTH
    }

    fn default_block_bytes() -> u64 {
        defaults::BLOCK_BYTES
    }

    fn default_fill_this_level() -> bool {
        true
    }

    /// Preset for the feedback-directed variant.
    ///
    /// Large index and history tables, no lookahead, and the default
    /// aggressiveness table starting at level 3.
    pub fn feedback_directed() -> Self {
        Self {
            index_capacity: defaults::FDP_INDEX_CAPACITY,
            ghb_capacity: defaults::FDP_GHB_CAPACITY,
            lookahead: defaults::FDP_LOOKAHEAD,
            feedback: Some(FeedbackConfig::default()),
            ..Self::default()
        }
    }

    /// Number of low address bits dropped to form an address unit.
    pub const fn unit_shift(&self) -> u32 {
        match self.granularity {
            Granularity::Block => self.block_bytes.trailing_zeros(),
            Granularity::Raw => 0,
        }
    }

    /// Checks every construction precondition.
    ///
    /// # Errors
    ///
    /// Returns the first violated precondition as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "index_capacity",
            });
        }
        if self.ghb_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "ghb_capacity",
            });
        }
        if self.degree == 0 {
            return Err(ConfigError::Zero { field: "degree" });
        }
        if self.sequence_length < 2 {
            return Err(ConfigError::SequenceTooShort(self.sequence_length));
        }
        if self.ghb_capacity < self.sequence_length {
            return Err(ConfigError::HistoryTooSmall {
                capacity: self.ghb_capacity,
                sequence_length: self.sequence_length,
            });
        }
        if !self.block_bytes.is_power_of_two() {
            return Err(ConfigError::BlockSizeNotPowerOfTwo(self.block_bytes));
        }
        if let Some(feedback) = &self.feedback {
            feedback.validate()?;
        }
        Ok(())
    }
}

impl Default for PrefetchConfig {
    /// Plain GHB stride prefetcher: 256-entry index, 256-slot history,
    /// lookahead 4, degree 4, three-access stride confirmation.
    fn default() -> Self {
        Self {
            index_capacity: defaults::INDEX_CAPACITY,
            ghb_capacity: defaults::GHB_CAPACITY,
            lookahead: defaults::LOOKAHEAD,
            degree: defaults::DEGREE,
            sequence_length: defaults::SEQUENCE_LENGTH,
            block_bytes: defaults::BLOCK_BYTES,
            granularity: Granularity::default(),
            emit_zero_stride: false,
            fill_this_level: true,
            feedback: None,
        }
    }
}

/// Feedback-directed aggressiveness control parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedbackConfig {
    /// Qualifying evictions that close one sampling interval
    #[serde(default = "FeedbackConfig::default_interval")]
    pub interval: u64,

    /// Aggressiveness level at start and after every reset (1..=5)
    #[serde(default = "FeedbackConfig::default_initial_level")]
    pub initial_level: u8,

    /// Distance and degree for levels 1 through 5
    #[serde(default = "FeedbackConfig::default_levels")]
    pub levels: [AggressivenessLevel; LEVEL_COUNT],

    /// Accuracy at or above which prefetching counts as highly accurate
    #[serde(default = "FeedbackConfig::default_high_accuracy")]
    pub high_accuracy: f64,

    /// Accuracy below which prefetching counts as inaccurate
    #[serde(default = "FeedbackConfig::default_low_accuracy")]
    pub low_accuracy: f64,

    /// Lateness above which the level is moved
    #[serde(default = "FeedbackConfig::default_lateness_threshold")]
    pub lateness_threshold: f64,
}

impl FeedbackConfig {
    fn default_interval() -> u64 {
        defaults::INTERVAL
    }

    fn default_initial_level() -> u8 {
        defaults::INITIAL_LEVEL
    }

    fn default_levels() -> [AggressivenessLevel; LEVEL_COUNT] {
        defaults::LEVELS
    }

    fn default_high_accuracy() -> f64 {
        defaults::HIGH_ACCURACY
    }

    fn default_low_accuracy() -> f64 {
        defaults::LOW_ACCURACY
    }

    fn default_lateness_threshold() -> f64 {
        defaults::LATENESS_THRESHOLD
    }

    /// Returns the table row for a one-based `level`, clamped into range.
    pub fn level(&self, level: u8) -> AggressivenessLevel {
        let idx = usize::from(level.clamp(MIN_LEVEL, MAX_LEVEL) - 1);
        self.levels[idx]
    }

    /// Checks the feedback parameters.
    ///
    /// # Errors
    ///
    /// Returns the first violated precondition as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::Zero { field: "interval" });
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.initial_level) {
            return Err(ConfigError::LevelOutOfRange {
                level: self.initial_level,
                min: MIN_LEVEL,
                max: MAX_LEVEL,
            });
        }
        for (level, row) in (MIN_LEVEL..).zip(self.levels.iter()) {
            if row.distance == 0 {
                return Err(ConfigError::EmptyLevel {
                    level,
                    what: "distance",
                });
            }
            if row.degree == 0 {
                return Err(ConfigError::EmptyLevel {
                    level,
                    what: "degree",
                });
            }
        }
        let ordered = (0.0..=1.0).contains(&self.low_accuracy)
            && (0.0..=1.0).contains(&self.high_accuracy)
            && self.low_accuracy <= self.high_accuracy
            && self.lateness_threshold >= 0.0;
        if !ordered {
            return Err(ConfigError::Thresholds {
                low: self.low_accuracy,
                high: self.high_accuracy,
                lateness: self.lateness_threshold,
            });
        }
        Ok(())
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            interval: defaults::INTERVAL,
            initial_level: defaults::INITIAL_LEVEL,
            levels: defaults::LEVELS,
            high_accuracy: defaults::HIGH_ACCURACY,
            low_accuracy: defaults::LOW_ACCURACY,
            lateness_threshold: defaults::LATENESS_THRESHOLD,
        }
    }
}
