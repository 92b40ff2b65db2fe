//! In-flight metadata carried on host requests.
//!
//! The host persists one small metadata word alongside every access and
//! prefetch it tracks. The engine uses it as a single-bit marker that tells
//! its own outstanding prefetches apart from everything else, which is what
//! makes a later demand miss attributable as a *late* prefetch.

/// Marker stored by the host next to an access or prefetch request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InFlightTag {
    /// Demand access, or a prefetch that has already filled.
    #[default]
    Idle,
    /// A prefetch issued by this engine that has not yet filled.
    Outstanding,
}

impl InFlightTag {
    /// Returns `true` for [`InFlightTag::Outstanding`].
    #[inline]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Outstanding)
    }
}
