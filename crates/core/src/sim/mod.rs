//! Trace-driven simulation.
//!
//! Drives a host cache, and the prefetch engine attached to it, through a
//! recorded address stream:
//! 1. **Trace:** Loading and parsing address traces.
//! 2. **Simulator:** Replaying a trace with a fixed tick cadence.

/// Replays a trace through a host cache.
pub mod simulator;

/// Address trace loader.
pub mod trace;

pub use simulator::Simulator;
pub use trace::{AccessKind, TraceRecord, load_trace, parse_trace};
