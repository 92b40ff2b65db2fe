//! Feedback-Directed Aggressiveness Controller.
//!
//! Watches how well the engine's own prefetches perform and moves a small
//! aggressiveness level up or down. Each level maps to a fixed
//! `(distance, degree)` operating point from the configured table.
//!
//! Three signals are counted per sampling interval:
//! * **total**: every prefetch the engine issues.
//! * **useful**: the host reports a demand hit on a prefetched line.
//! * **late**: a demand miss still carries the outstanding-prefetch tag.
//!
//! An interval closes after `interval` qualifying evictions. At that point
//! each smoothed counter becomes the mean of its old value and the interval
//! count (half-life of one interval), the interval counts restart from zero,
//! and the level is re-evaluated from
//! `accuracy = useful / total` and `lateness = late / useful`:
//!
//! | accuracy            | lateness > threshold | otherwise |
//! |---------------------|----------------------|-----------|
//! | high (≥ 0.75)       | level + 1            | unchanged |
//! | medium (0.40..0.75) | level + 1            | unchanged |
//! | low (< 0.40)        | level − 1            | unchanged |
//!
//! High and medium accuracy share one rule; only the low band differs.

use crate::config::{FeedbackConfig, MAX_LEVEL, MIN_LEVEL};

/// Current aggressiveness and the operating point it selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperatingPoint {
    /// One-based aggressiveness level.
    pub level: u8,
    /// Maximum unit distance between a trigger and any prefetch it emits.
    pub distance: u64,
    /// Prefetches per trigger.
    pub degree: usize,
}

/// Smoothed counters and the accumulators of the open interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedbackCounters {
    /// Smoothed useful prefetches.
    pub useful: u64,
    /// Smoothed late prefetches.
    pub late: u64,
    /// Smoothed issued prefetches.
    pub total: u64,
    /// Useful prefetches in the open interval.
    pub useful_interval: u64,
    /// Late prefetches in the open interval.
    pub late_interval: u64,
    /// Issued prefetches in the open interval.
    pub total_interval: u64,
    /// Qualifying evictions since the last interval boundary.
    pub eviction_count: u64,
}

impl FeedbackCounters {
    /// Folds the open interval into the smoothed counters and restarts it.
    fn close_interval(&mut self) {
        self.useful = smooth(self.useful, self.useful_interval);
        self.late = smooth(self.late, self.late_interval);
        self.total = smooth(self.total, self.total_interval);
        self.useful_interval = 0;
        self.late_interval = 0;
        self.total_interval = 0;
    }
}

/// `½·old + ½·sample`, truncated.
#[inline]
const fn smooth(old: u64, sample: u64) -> u64 {
    old / 2 + sample / 2 + (old % 2 + sample % 2) / 2
}

/// Accuracy band of the last closed interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccuracyBand {
    /// Accuracy at or above the high threshold.
    High,
    /// Accuracy between the low and high thresholds.
    Medium,
    /// Accuracy below the low threshold.
    Low,
}

/// Interval-based controller of prefetch distance and degree.
#[derive(Clone, Debug)]
pub struct FeedbackController {
    config: FeedbackConfig,
    level: u8,
    counters: FeedbackCounters,
}

impl FeedbackController {
    /// Creates a controller at the configured initial level with zeroed counters.
    pub fn new(config: FeedbackConfig) -> Self {
        let level = config.initial_level.clamp(MIN_LEVEL, MAX_LEVEL);
        Self {
            config,
            level,
            counters: FeedbackCounters::default(),
        }
    }

    /// Returns to the initial level and zeroes every counter.
    pub fn reset(&mut self) {
        self.level = self.config.initial_level.clamp(MIN_LEVEL, MAX_LEVEL);
        self.counters = FeedbackCounters::default();
    }

    /// Current level with its table distance and degree.
    pub fn operating_point(&self) -> OperatingPoint {
        let row = self.config.level(self.level);
        OperatingPoint {
            level: self.level,
            distance: row.distance,
            degree: row.degree,
        }
    }

    /// Current one-based aggressiveness level.
    #[inline]
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Snapshot of all counters.
    #[inline]
    pub const fn counters(&self) -> FeedbackCounters {
        self.counters
    }

    /// Whether a candidate `offset` units away from its trigger is within the current distance.
    #[inline]
    pub fn admits(&self, offset: i64) -> bool {
        offset.unsigned_abs() <= self.config.level(self.level).distance
    }

    /// Counts one issued prefetch.
    #[inline]
    pub const fn record_issued(&mut self) {
        self.counters.total_interval += 1;
    }

    /// Counts one prefetch the host reported as useful.
    #[inline]
    pub const fn record_useful(&mut self) {
        self.counters.useful_interval += 1;
    }

    /// Counts one prefetch that arrived after its demand access missed.
    #[inline]
    pub const fn record_late(&mut self) {
        self.counters.late_interval += 1;
    }

    /// Counts one qualifying eviction; closes the interval when the threshold is reached.
    ///
    /// Returns `true` if an interval closed.
    pub fn record_eviction(&mut self) -> bool {
        self.counters.eviction_count += 1;
        if self.counters.eviction_count < self.config.interval {
            return false;
        }
        self.end_interval();
        self.counters.eviction_count = 0;
        true
    }

    /// Smoothed accuracy (`useful / total`, 0 with no issued prefetches).
    pub fn accuracy(&self) -> f64 {
        ratio(self.counters.useful, self.counters.total)
    }

    /// Smoothed lateness (`late / useful`, 0 with no useful prefetches).
    pub fn lateness(&self) -> f64 {
        ratio(self.counters.late, self.counters.useful)
    }

    /// Accuracy band the current smoothed accuracy falls in.
    pub fn band(&self) -> AccuracyBand {
        let accuracy = self.accuracy();
        if accuracy >= self.config.high_accuracy {
            AccuracyBand::High
        } else if accuracy >= self.config.low_accuracy {
            AccuracyBand::Medium
        } else {
            AccuracyBand::Low
        }
    }

    fn end_interval(&mut self) {
        self.counters.close_interval();

        let band = self.band();
        let late = self.lateness() > self.config.lateness_threshold;
        let previous = self.level;
        self.level = match (band, late) {
            (AccuracyBand::High | AccuracyBand::Medium, true) => (self.level + 1).min(MAX_LEVEL),
            (AccuracyBand::Low, true) => self.level.saturating_sub(1).max(MIN_LEVEL),
            (_, false) => self.level,
        };

        if self.level != previous {
            let point = self.operating_point();
            tracing::debug!(
                from = previous,
                to = self.level,
                ?band,
                accuracy = self.accuracy(),
                lateness = self.lateness(),
                distance = point.distance,
                degree = point.degree,
                "prefetch aggressiveness changed"
            );
        }
    }
}

#[inline]
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
