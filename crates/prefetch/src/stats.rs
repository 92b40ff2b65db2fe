//! Prefetch engine event counters.
//!
//! Raw counts only; rates and reports are left to the host.

/// Counters maintained by a [`GhbPrefetcher`](crate::prefetch::GhbPrefetcher).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Demand accesses observed.
    pub accesses: u64,
    /// Accesses whose chain showed a consistent non-suppressed stride.
    pub predictions: u64,
    /// Prefetch requests handed to the host.
    pub issued: u64,
    /// Candidates dropped for running past the feedback distance.
    pub distance_rejected: u64,
    /// Candidates dropped because the target fell outside the address space.
    pub out_of_range: u64,
    /// Consistent zero strides that were not emitted.
    pub zero_stride_suppressed: u64,
    /// PCs evicted from the instruction index.
    pub index_evictions: u64,
    /// Feedback intervals closed.
    pub intervals: u64,
}

impl EngineStats {
    /// Fraction of accesses that produced a stride prediction.
    pub fn prediction_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.predictions as f64 / self.accesses as f64
        }
    }
}
