//! GHB Stride Prefetcher.
//!
//! Ties the history store, the instruction index and the stride detector
//! into one engine driven once per demand access:
//!
//! 1. Look up the instruction's previous history slot (touching it in the index).
//! 2. Record the access, link it back to that slot, and make it the
//!    instruction's new head.
//! 3. Walk the last `sequence_length` accesses of the instruction.
//! 4. On a consistent stride, issue `degree` prefetches at
//!    `unit + (lookahead + i) * stride`.
//!
//! With a feedback controller present, degree comes from the controller's
//! operating point, candidates farther than its distance are dropped, and
//! fill notifications drive its sampling intervals. Without one, the engine
//! is the plain GHB stride prefetcher and fills are ignored.

use std::num::NonZeroUsize;

use super::feedback::{FeedbackController, OperatingPoint};
use super::history::HistoryStore;
use super::index::InstructionIndex;
use super::stride::{Detection, StrideDetector, prefetch_offsets};
use super::{AccessInfo, FillInfo, PrefetchHost, PrefetchRequest, Prefetcher};
use crate::common::{Addr, ConfigError, InFlightTag};
use crate::config::PrefetchConfig;
use crate::stats::EngineStats;

/// Global History Buffer stride prefetcher with optional feedback control.
#[derive(Debug)]
pub struct GhbPrefetcher {
    history: HistoryStore,
    index: InstructionIndex,
    detector: StrideDetector,
    controller: Option<FeedbackController>,
    /// Low address bits dropped to form an address unit.
    shift: u32,
    lookahead: u64,
    degree: usize,
    fill_this_level: bool,
    stats: EngineStats,
}

impl GhbPrefetcher {
    /// Creates an engine from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration violates a precondition
    /// (zero capacities, `sequence_length < 2`, history smaller than one chain,
    /// non-power-of-two block size, or an invalid feedback table).
    pub fn new(config: &PrefetchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let index_capacity = NonZeroUsize::new(config.index_capacity).ok_or(ConfigError::Zero {
            field: "index_capacity",
        })?;
        let ghb_capacity = NonZeroUsize::new(config.ghb_capacity).ok_or(ConfigError::Zero {
            field: "ghb_capacity",
        })?;

        Ok(Self {
            history: HistoryStore::new(ghb_capacity),
            index: InstructionIndex::new(index_capacity),
            detector: StrideDetector::new(config.sequence_length, config.emit_zero_stride)?,
            controller: config.feedback.clone().map(FeedbackController::new),
            shift: config.unit_shift(),
            lookahead: config.lookahead,
            degree: config.degree,
            fill_this_level: config.fill_this_level,
            stats: EngineStats::default(),
        })
    }

    /// Observes `access` and returns the prefetches it triggered.
    pub fn observe(&mut self, access: AccessInfo) -> Vec<PrefetchRequest> {
        let mut issued = Vec::new();
        let _ = self.on_access(access, &mut issued);
        issued
    }

    /// The global history buffer.
    pub const fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The instruction index.
    pub const fn index(&self) -> &InstructionIndex {
        &self.index
    }

    /// The feedback controller, if this is the feedback-directed variant.
    pub const fn controller(&self) -> Option<&FeedbackController> {
        self.controller.as_ref()
    }

    /// Current feedback operating point, if feedback is enabled.
    pub fn operating_point(&self) -> Option<OperatingPoint> {
        self.controller.as_ref().map(FeedbackController::operating_point)
    }

    /// Prefetches issued per trigger at the current operating point.
    pub fn degree(&self) -> usize {
        self.operating_point().map_or(self.degree, |p| p.degree)
    }

    /// Event counters since construction or the last reset.
    pub const fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Byte address `offset` units from `unit`, if it lies inside the address space.
    fn target(&self, unit: u64, offset: i64) -> Option<Addr> {
        let unit = unit.checked_add_signed(offset)?;
        (unit <= u64::MAX >> self.shift).then_some(Addr::from_unit(unit, self.shift))
    }

    /// Issues the prefetches for a confirmed `stride` triggered at `unit`.
    fn emit(&mut self, unit: u64, stride: i64, incoming: InFlightTag, host: &mut dyn PrefetchHost) {
        // Feedback-directed prefetches are always tagged so late ones can be spotted.
        let tag = if self.controller.is_some() {
            InFlightTag::Outstanding
        } else {
            incoming
        };

        for offset in prefetch_offsets(stride, self.lookahead, self.degree()) {
            if let Some(controller) = &self.controller {
                if !controller.admits(offset) {
                    self.stats.distance_rejected += 1;
                    continue;
                }
            }

            let Some(target) = self.target(unit, offset) else {
                self.stats.out_of_range += 1;
                continue;
            };
            tracing::trace!(%target, stride, offset, "issue prefetch");
            host.issue_prefetch(target, self.fill_this_level, tag);
            self.stats.issued += 1;

            if let Some(controller) = &mut self.controller {
                controller.record_issued();
            }
        }
    }
}

impl Prefetcher for GhbPrefetcher {
    /// Records the access in the history buffer and issues prefetches for a
    /// consistent stride.
    ///
    /// With feedback enabled, also counts a useful prefetch when the host
    /// flags one and a late prefetch when a miss still carries the
    /// outstanding tag.
    ///
    /// # Returns
    ///
    /// The incoming tag, unchanged.
    fn on_access(&mut self, access: AccessInfo, host: &mut dyn PrefetchHost) -> InFlightTag {
        self.stats.accesses += 1;

        if let Some(controller) = &mut self.controller {
            if access.useful_prefetch {
                controller.record_useful();
            }
            if !access.hit && access.tag.is_outstanding() {
                controller.record_late();
            }
        }

        let unit = access.addr.unit(self.shift);
        let prev = self.index.lookup_and_touch(access.pc);
        let slot = self.history.record(unit);
        // A previous head equal to the new slot was just overwritten.
        self.history.link(slot, prev.filter(|&p| p != slot));
        if self.index.insert_or_update(access.pc, slot).is_some() {
            self.stats.index_evictions += 1;
        }

        let limit = self.detector.sequence_length();
        match self.detector.detect(self.history.chain(slot, limit)) {
            Detection::Stride(stride) => {
                self.stats.predictions += 1;
                self.emit(unit, stride, access.tag, host);
            }
            Detection::ZeroStride => self.stats.zero_stride_suppressed += 1,
            Detection::Insufficient | Detection::Inconsistent => {}
        }

        access.tag
    }

    /// Clears the tag of a completed prefetch and counts qualifying evictions
    /// toward the feedback interval. A no-op without feedback control.
    fn on_fill(&mut self, fill: FillInfo) -> InFlightTag {
        let Some(controller) = &mut self.controller else {
            return fill.tag;
        };

        if fill.evicted.is_some() && controller.record_eviction() {
            self.stats.intervals += 1;
        }

        if fill.was_prefetch {
            InFlightTag::Idle
        } else {
            fill.tag
        }
    }

    fn initialise(&mut self) {
        self.history.clear();
        self.index.clear();
        if let Some(controller) = &mut self.controller {
            controller.reset();
        }
        self.stats = EngineStats::default();
        tracing::debug!(
            ghb_capacity = self.history.capacity(),
            index_capacity = self.index.capacity(),
            feedback = self.controller.is_some(),
            "prefetcher state reset"
        );
    }
}
