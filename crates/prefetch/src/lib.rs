//! Global History Buffer stride prefetcher.
//!
//! This crate implements a PC-localised stride prefetcher for cache simulators with the following:
//! 1. **History:** A circular Global History Buffer chaining each instruction's accesses.
//! 2. **Index:** An LRU-bounded map from program counter to the instruction's latest history slot.
//! 3. **Prediction:** Constant-stride detection over the last N accesses of an instruction.
//! 4. **Feedback:** Optional accuracy/lateness-driven control of prefetch distance and degree.
//! 5. **Host Interface:** Access and fill notifications in, fire-and-forget prefetch requests out.

/// Common types (addresses, program counters, in-flight tags, errors).
pub mod common;
/// Prefetcher configuration (defaults, presets, validation).
pub mod config;
/// Prefetcher trait, host interface and the GHB engine.
pub mod prefetch;
/// Engine event counters.
pub mod stats;

/// Root configuration type; use `PrefetchConfig::default()` or deserialize from JSON.
pub use crate::config::PrefetchConfig;
/// The GHB stride prefetcher; construct with `GhbPrefetcher::new`.
pub use crate::prefetch::GhbPrefetcher;
/// Host-facing prefetcher contract.
pub use crate::prefetch::{PrefetchHost, Prefetcher};
