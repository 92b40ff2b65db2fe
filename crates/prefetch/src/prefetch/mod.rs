//! Hardware prefetcher interface and the GHB stride prefetcher.
//!
//! This module contains the host-facing contract every prefetcher speaks and
//! the Global History Buffer implementation built from:
//! 1. **History:** circular access log chained per instruction.
//! 2. **Index:** LRU-bounded PC → history-slot map.
//! 3. **Stride:** constant-stride detection over a chain.
//! 4. **Feedback:** optional interval-based aggressiveness control.

/// Feedback-directed aggressiveness controller.
pub mod feedback;

/// GHB stride prefetcher engine.
pub mod ghb;

/// Global history buffer.
pub mod history;

/// LRU-bounded instruction index.
pub mod index;

/// Constant-stride detection.
pub mod stride;

pub use self::feedback::{FeedbackController, FeedbackCounters, OperatingPoint};
pub use self::ghb::GhbPrefetcher;
pub use self::history::{HistoryEntry, HistoryStore};
pub use self::index::InstructionIndex;
pub use self::stride::{Detection, StrideDetector};

use crate::common::{Addr, InFlightTag, Pc};

/// One demand access as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessInfo {
    /// Accessed byte address.
    pub addr: Addr,
    /// Program counter of the accessing instruction.
    pub pc: Pc,
    /// Whether the access hit in the cache this prefetcher is attached to.
    pub hit: bool,
    /// Whether the access hit a line brought in by one of this engine's prefetches.
    pub useful_prefetch: bool,
    /// Metadata the host stored with the line or request being accessed.
    pub tag: InFlightTag,
}

impl AccessInfo {
    /// A missing demand access with no prefetch metadata.
    pub const fn new(addr: Addr, pc: Pc) -> Self {
        Self {
            addr,
            pc,
            hit: false,
            useful_prefetch: false,
            tag: InFlightTag::Idle,
        }
    }

    /// Sets the hit flag.
    #[must_use]
    pub const fn with_hit(mut self, hit: bool) -> Self {
        self.hit = hit;
        self
    }

    /// Sets the useful-prefetch flag.
    #[must_use]
    pub const fn with_useful(mut self, useful: bool) -> Self {
        self.useful_prefetch = useful;
        self
    }

    /// Sets the in-flight metadata.
    #[must_use]
    pub const fn with_tag(mut self, tag: InFlightTag) -> Self {
        self.tag = tag;
        self
    }
}

/// One cache fill as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillInfo {
    /// Byte address of the filled line.
    pub addr: Addr,
    /// Whether the fill completes a prefetch request.
    pub was_prefetch: bool,
    /// Address of the line the fill displaced, if it displaced one.
    pub evicted: Option<Addr>,
    /// Metadata the host stored with the filling request.
    pub tag: InFlightTag,
}

/// A prefetch request handed to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefetchRequest {
    /// Byte address to prefetch.
    pub addr: Addr,
    /// Fill into the cache level that triggered the prefetch.
    pub fill_this_level: bool,
    /// Metadata to store with the request.
    pub tag: InFlightTag,
}

/// The memory hierarchy a prefetcher issues requests into.
///
/// Requests are fire-and-forget: the host may drop, merge or delay them and
/// reports outcomes only through later access and fill notifications.
pub trait PrefetchHost {
    /// Issues one prefetch request.
    fn issue_prefetch(&mut self, addr: Addr, fill_this_level: bool, tag: InFlightTag);
}

impl PrefetchHost for Vec<PrefetchRequest> {
    fn issue_prefetch(&mut self, addr: Addr, fill_this_level: bool, tag: InFlightTag) {
        self.push(PrefetchRequest {
            addr,
            fill_this_level,
            tag,
        });
    }
}

/// Trait for cache prefetcher implementations.
///
/// The host calls the notifications synchronously, one at a time, in the
/// order the events happen. Implementations own all of their state; a
/// multi-threaded host wraps each instance in its own lock.
pub trait Prefetcher: Send {
    /// Observes a demand access and issues any prefetches it triggers.
    ///
    /// # Returns
    ///
    /// The metadata the host should keep with the access.
    fn on_access(&mut self, access: AccessInfo, host: &mut dyn PrefetchHost) -> InFlightTag;

    /// Observes a cache fill.
    ///
    /// # Returns
    ///
    /// The metadata the host should keep with the filled line.
    fn on_fill(&mut self, fill: FillInfo) -> InFlightTag;

    /// Reinitialises all internal state.
    fn initialise(&mut self);
}
