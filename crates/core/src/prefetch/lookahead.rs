//! Lookahead Scheduler.
//!
//! Holds the in-flight prediction chains between ticks and decides when a
//! chain's progress turns into an actual prefetch request. Two strategies are
//! supported:
//!
//! * **Single:** one cursor at most. Each step that passes the degree and
//!   confidence checks is issued at once, and the chain only moves forward
//!   when the host accepts the request.
//! * **Queued:** a bounded FIFO of cursors, all advanced once per tick. Only
//!   the last node a chain qualified for is issued (or every node, when
//!   intermediates are enabled), and a full queue flushes its oldest chain to
//!   make room.
//!
//! A candidate whose step ran out of degree or fell under the confidence
//! threshold is never issued. A chain of degree `d` issues at most `d`
//! requests, not counting an overflow flush.
//!
//! Requests leave through a [`ChainSink`], which keeps this module free of any
//! knowledge about the host.

use std::collections::VecDeque;

use super::table::{Confidence, SuccessorTable};
use super::walker::{ChainWalker, LookaheadCursor, TerminationReason};
use crate::config::{LookaheadMode, PrefetcherConfig};

/// Why a request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueReason {
    /// Single mode: the next node of the active chain.
    Step,
    /// Queued mode with intermediate prefetching: a node the chain just reached.
    Intermediate,
    /// Queued mode: the last node a terminated chain qualified for.
    Terminal,
    /// Queued mode: the oldest chain was flushed to admit a new one.
    Overflow,
}

/// A prefetch the scheduler wants issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueRequest {
    /// Address to prefetch (not yet block aligned).
    pub address: u64,
    /// Chain steps between the trigger and `address`.
    pub depth: u32,
    /// What prompted the request.
    pub reason: IssueReason,
}

/// Receiver for everything the scheduler produces.
pub trait ChainSink {
    /// Issues a prefetch.
    ///
    /// # Returns
    ///
    /// `true` if the host accepted the request.
    fn issue(&mut self, request: IssueRequest) -> bool;

    /// Reports that a chain step produced a candidate.
    fn candidate(&mut self, _address: u64) {}

    /// Reports that a chain ended.
    fn chain_terminated(&mut self, _cursor: &LookaheadCursor, _reason: TerminationReason) {}
}

/// What happened when a trigger was offered to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// A new chain was started.
    Seeded,
    /// A queued chain with the same trigger was restarted in place.
    Superseded,
    /// Single mode already had an active chain; the trigger was ignored.
    Busy,
    /// A new chain was started and the oldest one was flushed to make room.
    Overflowed {
        /// Address that was force-issued for the flushed chain.
        flushed: u64,
    },
}

/// Single-cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleCursor {
    /// No chain in flight.
    #[default]
    Idle,
    /// One chain in flight.
    Active(LookaheadCursor),
}

/// Bounded FIFO of chains.
#[derive(Debug, Clone)]
pub struct CursorQueue {
    cursors: VecDeque<LookaheadCursor>,
    capacity: usize,
    prefetch_intermediate: bool,
}

impl CursorQueue {
    /// Creates an empty queue.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum in-flight chains (clamped to at least 1).
    /// * `prefetch_intermediate` - Issue every chain node, not only the last.
    pub fn new(capacity: usize, prefetch_intermediate: bool) -> Self {
        let capacity = capacity.max(1);
        Self {
            cursors: VecDeque::with_capacity(capacity + 1),
            capacity,
            prefetch_intermediate,
        }
    }

    /// Maximum in-flight chains.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The lookahead strategy of one predictor instance.
#[derive(Debug, Clone)]
pub enum Lookahead {
    /// At most one chain.
    Single(SingleCursor),
    /// Many chains in admission order.
    Queued(CursorQueue),
}

impl Lookahead {
    /// Creates the scheduler selected by the configuration.
    pub fn from_config(config: &PrefetcherConfig) -> Self {
        match config.mode {
            LookaheadMode::Single => Self::Single(SingleCursor::Idle),
            LookaheadMode::Queued => Self::Queued(CursorQueue::new(
                config.queue_size,
                config.prefetch_intermediate,
            )),
        }
    }

    /// Offers a freshly seeded chain.
    ///
    /// Single mode only accepts it when idle. Queued mode restarts an existing
    /// chain with the same trigger, or appends and flushes the head on
    /// overflow.
    ///
    /// # Arguments
    ///
    /// * `cursor` - The new chain, as built by [`LookaheadCursor::seed`].
    /// * `sink` - Receives the forced issue of a flushed chain.
    pub fn seed(&mut self, cursor: LookaheadCursor, sink: &mut dyn ChainSink) -> SeedOutcome {
        match self {
            Self::Single(state) => match *state {
                SingleCursor::Idle => {
                    *state = SingleCursor::Active(cursor);
                    SeedOutcome::Seeded
                }
                SingleCursor::Active(_) => SeedOutcome::Busy,
            },
            Self::Queued(queue) => {
                if let Some(existing) = queue.cursors.iter_mut().find(|c| c.root == cursor.root) {
                    *existing = cursor;
                    return SeedOutcome::Superseded;
                }
                queue.cursors.push_back(cursor);
                if queue.cursors.len() > queue.capacity {
                    if let Some(head) = queue.cursors.pop_front() {
                        let _ = sink.issue(IssueRequest {
                            address: head.address,
                            depth: head.depth,
                            reason: IssueReason::Overflow,
                        });
                        return SeedOutcome::Overflowed {
                            flushed: head.address,
                        };
                    }
                }
                SeedOutcome::Seeded
            }
        }
    }

    /// Advances every in-flight chain by one step.
    ///
    /// # Arguments
    ///
    /// * `walker` - Stepping logic.
    /// * `table` - The learned successor model.
    /// * `sink` - Receives issued requests and chain events.
    pub fn tick(&mut self, walker: &ChainWalker, table: &SuccessorTable, sink: &mut dyn ChainSink) {
        match self {
            Self::Single(state) => Self::tick_single(state, walker, table, sink),
            Self::Queued(queue) => Self::tick_queued(queue, walker, table, sink),
        }
    }

    fn tick_single(
        state: &mut SingleCursor,
        walker: &ChainWalker,
        table: &SuccessorTable,
        sink: &mut dyn ChainSink,
    ) {
        let SingleCursor::Active(cursor) = *state else {
            return;
        };

        let step = walker.advance(table, &cursor);
        if let Some(candidate) = step.candidate {
            sink.candidate(candidate);
        }

        let Some(next) = step.next else {
            sink.chain_terminated(
                &cursor,
                step.termination.unwrap_or(TerminationReason::DeadEnd),
            );
            *state = SingleCursor::Idle;
            return;
        };

        let accepted = sink.issue(IssueRequest {
            address: next.address,
            depth: next.depth,
            reason: IssueReason::Step,
        });
        if accepted {
            *state = SingleCursor::Active(next);
        }
        // Otherwise the same step is retried next tick.
    }

    fn tick_queued(
        queue: &mut CursorQueue,
        walker: &ChainWalker,
        table: &SuccessorTable,
        sink: &mut dyn ChainSink,
    ) {
        let pending = queue.cursors.len();
        for _ in 0..pending {
            let Some(cursor) = queue.cursors.pop_front() else {
                break;
            };

            let step = walker.advance(table, &cursor);
            if let Some(candidate) = step.candidate {
                sink.candidate(candidate);
            }

            if let Some(next) = step.next {
                if queue.prefetch_intermediate {
                    let accepted = sink.issue(IssueRequest {
                        address: next.address,
                        depth: next.depth,
                        reason: IssueReason::Intermediate,
                    });
                    if !accepted {
                        queue.cursors.push_back(cursor);
                        continue;
                    }
                }
                queue.cursors.push_back(next);
                continue;
            }

            // The cursor's own address is the last node that qualified. With
            // intermediates on it was issued when the chain reached it.
            if !queue.prefetch_intermediate && !cursor.at_root() {
                let _ = sink.issue(IssueRequest {
                    address: cursor.address,
                    depth: cursor.depth,
                    reason: IssueReason::Terminal,
                });
            }
            sink.chain_terminated(
                &cursor,
                step.termination.unwrap_or(TerminationReason::DeadEnd),
            );
        }
    }

    /// Restores every in-flight chain's carried confidence to `neutral`.
    pub fn reset_carried(&mut self, neutral: Confidence) {
        match self {
            Self::Single(SingleCursor::Active(cursor)) => cursor.carried_confidence = neutral,
            Self::Single(SingleCursor::Idle) => {}
            Self::Queued(queue) => {
                for cursor in &mut queue.cursors {
                    cursor.carried_confidence = neutral;
                }
            }
        }
    }

    /// Snapshot of the in-flight chains, oldest first.
    pub fn cursors(&self) -> Vec<LookaheadCursor> {
        match self {
            Self::Single(SingleCursor::Active(cursor)) => vec![*cursor],
            Self::Single(SingleCursor::Idle) => Vec::new(),
            Self::Queued(queue) => queue.cursors.iter().copied().collect(),
        }
    }

    /// Number of in-flight chains.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(SingleCursor::Active(_)) => 1,
            Self::Single(SingleCursor::Idle) => 0,
            Self::Queued(queue) => queue.cursors.len(),
        }
    }

    /// Returns `true` if no chain is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured strategy.
    pub const fn mode(&self) -> LookaheadMode {
        match self {
            Self::Single(_) => LookaheadMode::Single,
            Self::Queued(_) => LookaheadMode::Queued,
        }
    }
}
