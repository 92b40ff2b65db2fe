//! Stride Detector.
//!
//! Decides whether one instruction's recent accesses follow a constant stride.
//! The detector is fed the instruction's history chain, most recent access
//! first, and compares the last `sequence_length` address units: the stride
//! is `unit[i] - unit[i + 1]` and it is consistent only if every consecutive
//! pair yields the same signed value.
//!
//! Once a stride is confirmed, [`prefetch_offsets`] yields the unit offsets
//! `(lookahead + i) * stride` for `i = 1..=degree` relative to the trigger.
//!
//! # Performance
//!
//! - **Time Complexity:** O(L) per access where L is the sequence length
//! - **Space Complexity:** O(L) scratch, reused across calls
//! - **Best Case:** Array traversals, fixed-stride struct walks
//! - **Worst Case:** Pointer chasing, hash-table probes (never consistent)

use crate::common::ConfigError;

/// Outcome of one detection attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detection {
    /// Fewer than `sequence_length` accesses are chained for this instruction.
    Insufficient,
    /// The deltas disagree.
    Inconsistent,
    /// Every delta was zero and zero strides are configured off.
    ZeroStride,
    /// All deltas equal this signed stride, in address units.
    Stride(i64),
}

/// Constant-stride detector with a reusable comparison window.
#[derive(Clone, Debug)]
pub struct StrideDetector {
    sequence_length: usize,
    emit_zero_stride: bool,
    window: Vec<u64>,
}

impl StrideDetector {
    /// Creates a detector comparing `sequence_length` accesses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SequenceTooShort`] if `sequence_length < 2`.
    pub fn new(sequence_length: usize, emit_zero_stride: bool) -> Result<Self, ConfigError> {
        if sequence_length < 2 {
            return Err(ConfigError::SequenceTooShort(sequence_length));
        }
        Ok(Self {
            sequence_length,
            emit_zero_stride,
            window: Vec::with_capacity(sequence_length),
        })
    }

    /// Number of accesses a stride must hold across.
    #[inline]
    pub const fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Examines the chain (most recent first) and classifies its stride.
    ///
    /// Only the first `sequence_length` units of `chain` are consumed.
    pub fn detect<I>(&mut self, chain: I) -> Detection
    where
        I: IntoIterator<Item = u64>,
    {
        self.window.clear();
        self.window
            .extend(chain.into_iter().take(self.sequence_length));
        debug_assert!(self.window.len() <= self.sequence_length);

        if self.window.len() < self.sequence_length {
            return Detection::Insufficient;
        }

        let stride = delta(self.window[0], self.window[1]);
        let consistent = self
            .window
            .windows(2)
            .skip(1)
            .all(|pair| delta(pair[0], pair[1]) == stride);

        match (consistent, stride) {
            (false, _) => Detection::Inconsistent,
            (true, 0) if !self.emit_zero_stride => Detection::ZeroStride,
            (true, s) => Detection::Stride(s),
        }
    }
}

/// Signed distance from `older` to `newer` in address units.
#[inline]
fn delta(newer: u64, older: u64) -> i64 {
    newer.wrapping_sub(older) as i64
}

/// Unit offsets of the prefetch targets for a confirmed stride.
///
/// Yields `(lookahead + i) * stride` for `i = 1..=degree`, stopping at the
/// first offset that does not fit in an `i64`.
pub fn prefetch_offsets(stride: i64, lookahead: u64, degree: usize) -> impl Iterator<Item = i64> {
    (1..=degree as u64).map_while(move |i| {
        let multiple = i64::try_from(lookahead.checked_add(i)?).ok()?;
        multiple.checked_mul(stride)
    })
}
