//! Successor-Chain (Markov) Prefetcher.
//!
//! Learns, per address, which addresses tend to follow it and walks those
//! predictions forward several steps to prefetch ahead of demand.
//!
//! * **Access:** record `previous -> current` in the successor table, then
//!   offer a chain rooted at `current` to the lookahead scheduler.
//! * **Tick:** advance in-flight chains, issue their requests to the host,
//!   and run the saturation clock.
//!
//! One instance belongs to one host cache; nothing is shared between
//! instances.

use tracing::{debug, trace};

use super::lookahead::{ChainSink, IssueRequest, Lookahead, SeedOutcome};
use super::saturation::SaturationControl;
use super::table::{RecordOutcome, SuccessorTable};
use super::walker::{ChainWalker, LookaheadCursor, TerminationReason};
use super::{PrefetchHost, Prefetcher};
use crate::common::addr::{block_base, same_block};
use crate::config::PrefetcherConfig;
use crate::stats::PrefetchStats;

/// Markov prefetcher state.
#[derive(Debug, Clone)]
pub struct MarkovPrefetcher {
    /// Learned successor model.
    table: SuccessorTable,
    /// Chain stepping logic.
    walker: ChainWalker,
    /// In-flight chains.
    lookahead: Lookahead,
    /// Periodic confidence reset.
    saturation: SaturationControl,
    /// Previous access (table key form), `None` before the first access.
    last_access: Option<u64>,
    /// Degree given to new chains.
    degree: u32,
    /// Block size for filtering and block-granular training.
    block_bytes: u64,
    /// Skip transitions within one block.
    filter_same_block: bool,
    /// Key the table by block address.
    train_on_blocks: bool,
    /// Pressure below which requests carry the fill-priority hint.
    fill_pressure_threshold: f64,
    /// Counters.
    stats: PrefetchStats,
}

impl MarkovPrefetcher {
    /// Creates a prefetcher with an empty model.
    ///
    /// # Arguments
    ///
    /// * `config` - Predictor parameters. Expected to have passed
    ///   [`PrefetcherConfig::validate`]; out-of-range sizes are clamped.
    pub fn new(config: &PrefetcherConfig) -> Self {
        Self {
            table: SuccessorTable::from_config(config),
            walker: ChainWalker::from_config(config),
            lookahead: Lookahead::from_config(config),
            saturation: SaturationControl::from_config(config),
            last_access: None,
            degree: config.degree,
            block_bytes: config.block_bytes,
            filter_same_block: config.filter_same_block,
            train_on_blocks: config.train_on_blocks,
            fill_pressure_threshold: config.fill_pressure_threshold,
            stats: PrefetchStats::default(),
        }
    }

    /// The learned successor model.
    pub const fn table(&self) -> &SuccessorTable {
        &self.table
    }

    /// The lookahead scheduler.
    pub const fn lookahead(&self) -> &Lookahead {
        &self.lookahead
    }

    /// The saturation clock.
    pub const fn saturation(&self) -> &SaturationControl {
        &self.saturation
    }

    /// Previous access as seen by the learning step.
    pub const fn last_access(&self) -> Option<u64> {
        self.last_access
    }

    /// Maps a raw address to its table key.
    const fn key(&self, addr: u64) -> u64 {
        if self.train_on_blocks {
            block_base(addr, self.block_bytes)
        } else {
            addr
        }
    }

    /// Zeroes table confidence and neutralises carried confidence.
    fn apply_saturation_reset(&mut self) {
        self.table.reset_confidence();
        self.lookahead.reset_carried(self.walker.neutral());
        self.stats.saturation_resets += 1;
        debug!(
            resets = self.stats.saturation_resets,
            sources = self.table.len(),
            "saturation control reset confidences"
        );
    }
}

impl Prefetcher for MarkovPrefetcher {
    fn on_access(&mut self, addr: u64, host: &mut dyn PrefetchHost) {
        self.stats.accesses += 1;
        let current = self.key(addr);
        let Some(previous) = self.last_access.replace(current) else {
            return;
        };

        if self.filter_same_block && same_block(previous, current, self.block_bytes) {
            self.stats.transitions_filtered += 1;
            return;
        }

        let outcome = self.table.record(previous, current);
        self.stats.transitions_recorded += 1;
        if let RecordOutcome::Replaced { evicted } = outcome {
            self.stats.successors_evicted += 1;
            trace!(
                source = format_args!("{previous:#x}"),
                evicted = format_args!("{:#x}", evicted.address),
                "successor evicted"
            );
        }
        trace!(
            source = format_args!("{previous:#x}"),
            successor = format_args!("{current:#x}"),
            ?outcome,
            "transition recorded"
        );

        let cursor = LookaheadCursor::seed(current, self.degree, self.walker.neutral());
        let mut port = IssuePort {
            host,
            stats: &mut self.stats,
            saturation: &mut self.saturation,
            fill_pressure_threshold: self.fill_pressure_threshold,
            reset_due: false,
        };
        let seeded = self.lookahead.seed(cursor, &mut port);
        let reset_due = port.reset_due;

        match seeded {
            SeedOutcome::Seeded => self.stats.chains_seeded += 1,
            SeedOutcome::Superseded => self.stats.chains_superseded += 1,
            SeedOutcome::Busy => self.stats.seeds_ignored += 1,
            SeedOutcome::Overflowed { flushed } => {
                self.stats.chains_seeded += 1;
                self.stats.queue_overflows += 1;
                debug!(
                    flushed = format_args!("{flushed:#x}"),
                    "lookahead queue full, oldest chain flushed"
                );
            }
        }

        if reset_due {
            self.apply_saturation_reset();
        }
    }

    fn on_tick(&mut self, host: &mut dyn PrefetchHost) {
        let mut port = IssuePort {
            host,
            stats: &mut self.stats,
            saturation: &mut self.saturation,
            fill_pressure_threshold: self.fill_pressure_threshold,
            reset_due: false,
        };
        self.lookahead.tick(&self.walker, &self.table, &mut port);
        let reset_due = port.reset_due;

        if self.saturation.on_tick() || reset_due {
            self.apply_saturation_reset();
        }
    }

    fn stats(&self) -> &PrefetchStats {
        &self.stats
    }
}

/// Bridges scheduler output to the host for the duration of one call-in.
struct IssuePort<'a, 'h> {
    host: &'a mut (dyn PrefetchHost + 'h),
    stats: &'a mut PrefetchStats,
    saturation: &'a mut SaturationControl,
    fill_pressure_threshold: f64,
    /// Set when an issue-clocked saturation reset fell due.
    reset_due: bool,
}

impl ChainSink for IssuePort<'_, '_> {
    fn issue(&mut self, request: IssueRequest) -> bool {
        let address = self.host.block_align(request.address);
        let fill_hint = self.host.resource_pressure() < self.fill_pressure_threshold;
        let accepted = self.host.issue_prefetch(address, fill_hint, request.depth);

        self.stats.prefetches_issued += 1;
        if accepted {
            self.stats.prefetches_accepted += 1;
        } else {
            self.stats.prefetches_rejected += 1;
        }
        if !fill_hint {
            self.stats.low_priority_requests += 1;
        }
        if self.saturation.on_issue() {
            self.reset_due = true;
        }

        trace!(
            address = format_args!("{address:#x}"),
            depth = request.depth,
            reason = ?request.reason,
            fill_hint,
            accepted,
            "prefetch issued"
        );
        accepted
    }

    fn candidate(&mut self, _address: u64) {
        self.stats.candidates += 1;
    }

    fn chain_terminated(&mut self, cursor: &LookaheadCursor, reason: TerminationReason) {
        self.stats.record_termination(reason);
        debug!(
            root = format_args!("{:#x}", cursor.root),
            depth = cursor.depth,
            ?reason,
            "chain terminated"
        );
    }
}
