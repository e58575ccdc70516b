//! Successor-chain prefetch engine library.
//!
//! This crate implements a Markov-style data prefetcher and the minimal host
//! needed to exercise it:
//! 1. **Prefetch:** Confidence-bounded successor table, chain walker,
//!    lookahead scheduling and saturation control.
//! 2. **Cache:** Set-associative host cache with an MSHR pressure model.
//! 3. **Simulation:** Trace loading and replay.
//! 4. **Configuration:** Defaults, presets and JSON loading.
//! 5. **Statistics:** Predictor and cache counters with sectioned reports.

/// Set-associative host cache.
pub mod cache;
/// Common helpers (block addressing, error types).
pub mod common;
/// Engine and host configuration (defaults, policies, JSON loading).
pub mod config;
/// Successor-chain prefetch engine.
pub mod prefetch;
/// Trace loading and replay.
pub mod sim;
/// Statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or load it from JSON.
pub use crate::config::Config;
/// The prefetch engine; attach it to any [`prefetch::PrefetchHost`].
pub use crate::prefetch::MarkovPrefetcher;
/// Trace driver; construct with `Simulator::from_config`.
pub use crate::sim::Simulator;
