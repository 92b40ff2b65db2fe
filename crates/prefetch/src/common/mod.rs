//! Common types shared by every part of the prefetch engine.
//!
//! This module provides:
//! 1. **Address Types:** Strong types for data addresses and program counters.
//! 2. **In-Flight Metadata:** The tag the host persists next to each request.
//! 3. **Error Handling:** Construction-time configuration errors.

/// Address and program-counter types.
pub mod addr;

/// In-flight metadata tag.
pub mod data;

/// Error types.
pub mod error;

pub use addr::{Addr, Pc};
pub use data::InFlightTag;
pub use error::ConfigError;
