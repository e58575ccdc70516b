//! Successor-chain prefetch engine.
//!
//! This module contains the prediction engine and the two interfaces that
//! connect it to a host cache:
//! 1. **Table:** Confidence-bounded successor lists per source address.
//! 2. **Walker:** One-step chain advance with confidence decay.
//! 3. **Lookahead:** Single-cursor or queued scheduling of in-flight chains.
//! 4. **Saturation:** Periodic confidence reset.
//! 5. **Markov:** The predictor that owns all of the above.

/// Successor-chain (Markov) prefetcher.
pub mod markov;

/// Lookahead scheduler (single cursor or bounded chain queue).
pub mod lookahead;

/// Periodic confidence reset.
pub mod saturation;

/// Confidence-bounded successor table.
pub mod table;

/// One-step chain advance.
pub mod walker;

pub use self::lookahead::{IssueReason, IssueRequest, Lookahead, SeedOutcome, SingleCursor};
pub use self::markov::MarkovPrefetcher;
pub use self::saturation::SaturationControl;
pub use self::table::{Confidence, RecordOutcome, SuccessorEntry, SuccessorTable};
pub use self::walker::{ChainWalker, LookaheadCursor, Step, TerminationReason};

use crate::stats::PrefetchStats;

/// Services a host cache provides to the prefetch engine.
///
/// The engine consults the host but never owns it: every call is
/// non-blocking, and an issued prefetch is fire-and-forget apart from the
/// acceptance flag.
pub trait PrefetchHost {
    /// Masks `addr` to the start of its containing block.
    fn block_align(&self, addr: u64) -> u64;

    /// Current occupancy of the resources that gate speculative requests, in `[0, 1]`.
    fn resource_pressure(&self) -> f64;

    /// Requests that `addr` be fetched speculatively.
    ///
    /// # Arguments
    ///
    /// * `addr` - Block-aligned address to prefetch.
    /// * `fill_priority_hint` - `false` asks for a low-priority fill because
    ///   the host reported high resource pressure.
    /// * `metadata` - Chain depth of the prefetched node (1 = direct successor).
    ///
    /// # Returns
    ///
    /// `true` if the host accepted the request.
    fn issue_prefetch(&mut self, addr: u64, fill_priority_hint: bool, metadata: u32) -> bool;
}

/// Trait for cache prefetcher implementations.
///
/// A host calls `on_access` once per demand access, in stream order, and
/// `on_tick` once per time step. Neither call blocks.
pub trait Prefetcher: Send + Sync {
    /// Observes a demand access.
    ///
    /// # Arguments
    ///
    /// * `addr` - The address that was accessed.
    /// * `host` - The cache this prefetcher is attached to.
    fn on_access(&mut self, addr: u64, host: &mut dyn PrefetchHost);

    /// Advances speculative work by one time step.
    fn on_tick(&mut self, host: &mut dyn PrefetchHost);

    /// Counters collected so far.
    fn stats(&self) -> &PrefetchStats;
}
