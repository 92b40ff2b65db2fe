//! Instruction Index.
//!
//! Maps an instruction's program counter to the history slot of its most
//! recent access. The map is bounded: once `capacity` PCs are resident,
//! inserting a new one evicts the least recently touched PC first. Both a
//! lookup hit and an insert count as a touch.
//!
//! # Performance
//!
//! - **Time Complexity:** O(1) for lookup, insert and eviction
//! - **Space Complexity:** O(I) where I is the index capacity

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::common::Pc;

/// Capacity-bounded PC → history-slot map with LRU eviction.
#[derive(Debug)]
pub struct InstructionIndex {
    map: LruCache<Pc, usize>,
}

impl InstructionIndex {
    /// Creates an empty index that holds at most `capacity` PCs.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            map: LruCache::new(capacity),
        }
    }

    /// Maximum number of resident PCs.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.map.cap().get()
    }

    /// Number of resident PCs.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when no PC is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns `true` if `pc` is resident. Does not change recency.
    pub fn contains(&self, pc: Pc) -> bool {
        self.map.contains(&pc)
    }

    /// Returns the slot for `pc` and makes it most recent.
    ///
    /// An absent PC leaves the index untouched.
    pub fn lookup_and_touch(&mut self, pc: Pc) -> Option<usize> {
        self.map.get(&pc).copied()
    }

    /// Stores `slot` as the head of `pc`'s chain and makes `pc` most recent.
    ///
    /// If `pc` is new and the index is full, the least recent PC is evicted
    /// first and returned.
    pub fn insert_or_update(&mut self, pc: Pc, slot: usize) -> Option<Pc> {
        let evicted = match self.map.push(pc, slot) {
            Some((old, _)) if old != pc => {
                tracing::trace!(evicted = %old, inserted = %pc, "instruction index full");
                Some(old)
            }
            _ => None,
        };
        debug_assert!(self.map.len() <= self.capacity());
        evicted
    }

    /// Resident PCs and their slots, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = (Pc, usize)> + '_ {
        self.map.iter().map(|(&pc, &slot)| (pc, slot))
    }

    /// PC that would be evicted next, if any.
    pub fn least_recent(&self) -> Option<Pc> {
        self.map.peek_lru().map(|(&pc, _)| pc)
    }

    /// Drops every entry. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}
