//! Address and program-counter types.
//!
//! This module defines strong types for the two values every access carries:
//! 1. **Data Address:** The byte address touched by the access.
//! 2. **Program Counter:** The address of the instruction that made the access.
//!
//! Keeping them apart prevents a PC from being recorded into the history store
//! or an address from being used as an index key.

/// A byte address observed on the demand access stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Addr(pub u64);

/// Program counter of the instruction that issued an access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pc(pub u64);

impl Addr {
    /// Creates a new address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Converts the address to a unit number by dropping `shift` low bits.
    ///
    /// With `shift == log2(line_bytes)` this is the cache block number; with
    /// `shift == 0` it is the raw byte address.
    #[inline(always)]
    pub const fn unit(&self, shift: u32) -> u64 {
        self.0 >> shift
    }

    /// Rebuilds the byte address of the first byte of unit `unit`.
    #[inline(always)]
    pub const fn from_unit(unit: u64, shift: u32) -> Self {
        Self(unit << shift)
    }
}

impl Pc {
    /// Creates a new program counter from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(pc: u64) -> Self {
        Self(pc)
    }

    /// Returns the raw 64-bit program counter value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl std::fmt::Display for Pc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
