//! Global History Buffer.
//!
//! A fixed-capacity circular log of the most recent accesses. Every entry
//! holds the address unit that was accessed and a back-link to the previous
//! entry written by the *same* instruction, so each instruction's accesses
//! form a singly-linked chain threaded backwards through time.
//!
//! Entries are overwritten in place when the write cursor wraps. A back-link
//! may therefore point at a slot that has since been reused by a different
//! instruction; callers treat links as opaque slot indices and bound every
//! walk by length instead of trusting link validity.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `record()`: O(1)
//!   - `chain()`: O(L) where L is the walk limit
//! - **Space Complexity:** O(G) where G is the buffer capacity

use std::num::NonZeroUsize;

/// One slot of the history buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Address unit (block number or raw address) of the access.
    pub unit: u64,
    /// Slot of the previous access by the same instruction, if any.
    pub prev_link: Option<usize>,
}

/// Circular history buffer with a single write cursor.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    /// Most recently written slot; `None` until the first record.
    head: Option<usize>,
}

impl HistoryStore {
    /// Creates a store with `capacity` empty slots.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: vec![HistoryEntry::default(); capacity.get()],
            head: None,
        }
    }

    /// Number of slots in the buffer. Constant for the lifetime of the store.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Slot written by the most recent `record`, if any.
    #[inline]
    pub const fn head(&self) -> Option<usize> {
        self.head
    }

    /// Writes `unit` into the slot after `head` and returns that slot.
    ///
    /// The new entry starts with no back-link; the caller sets it with
    /// [`HistoryStore::link`] once it has consulted the instruction index.
    pub fn record(&mut self, unit: u64) -> usize {
        let slot = self.head.map_or(0, |head| (head + 1) % self.entries.len());
        self.entries[slot] = HistoryEntry {
            unit,
            prev_link: None,
        };
        self.head = Some(slot);
        slot
    }

    /// Sets the back-link of `slot`.
    ///
    /// Links outside the buffer are dropped rather than stored.
    pub fn link(&mut self, slot: usize, prev: Option<usize>) {
        let capacity = self.entries.len();
        debug_assert!(slot < capacity, "slot {slot} out of range");
        if let Some(entry) = self.entries.get_mut(slot) {
            entry.prev_link = prev.filter(|&p| p < capacity);
        }
    }

    /// Returns a copy of the entry at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= capacity()`. Slots handed out by `record` are always in range.
    #[inline]
    pub fn read(&self, slot: usize) -> HistoryEntry {
        self.entries[slot]
    }

    /// Iterates over the chain starting at `start`, most recent first.
    ///
    /// The walk visits at most `limit` entries regardless of the links it
    /// follows, so stale or cyclic links can never make it unbounded.
    pub fn chain(&self, start: usize, limit: usize) -> Chain<'_> {
        Chain {
            store: self,
            next: Some(start).filter(|&s| s < self.entries.len()),
            remaining: limit,
        }
    }

    /// All slots in buffer order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Empties every slot and rewinds the cursor. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.entries.fill(HistoryEntry::default());
        self.head = None;
    }
}

/// Bounded walk over one instruction's back-link chain.
#[derive(Debug)]
pub struct Chain<'a> {
    store: &'a HistoryStore,
    next: Option<usize>,
    remaining: usize,
}

impl Iterator for Chain<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.next?;
        let entry = self.store.entries.get(slot)?;
        self.remaining -= 1;
        self.next = entry.prev_link;
        Some(entry.unit)
    }
}
