//! Chain Walker.
//!
//! Advances a prediction chain one step through the successor table: follow
//! the highest-confidence edge out of the cursor's address, fold that edge's
//! confidence into the chain's carried confidence, and decide whether the
//! chain may continue.
//!
//! The degree bound keeps the work per chain at O(degree) over its lifetime,
//! and the carried-confidence threshold stops chains from wandering down
//! low-value paths.

use super::table::{Confidence, SuccessorTable};
use crate::config::{DecayPolicy, PrefetcherConfig};

/// One in-flight prediction chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookaheadCursor {
    /// Most recently reached node of the chain.
    pub address: u64,
    /// Steps left before the chain is forced to terminate.
    pub remaining_degree: u32,
    /// Confidence compounded along the chain so far.
    pub carried_confidence: Confidence,
    /// Trigger address the chain was seeded from.
    pub root: u64,
    /// Steps taken from `root` to reach `address`.
    pub depth: u32,
}

impl LookaheadCursor {
    /// Creates a fresh cursor sitting on its trigger address.
    ///
    /// # Arguments
    ///
    /// * `trigger` - The address that seeded the chain.
    /// * `degree` - Steps the chain may take.
    /// * `neutral` - Carried confidence at which the first decay is the identity.
    pub const fn seed(trigger: u64, degree: u32, neutral: Confidence) -> Self {
        Self {
            address: trigger,
            remaining_degree: degree,
            carried_confidence: neutral,
            root: trigger,
            depth: 0,
        }
    }

    /// Returns `true` while the cursor has not left its trigger.
    pub const fn at_root(&self) -> bool {
        self.depth == 0
    }
}

/// Why a chain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The cursor's address has no tracked successors.
    DeadEnd,
    /// The cursor had no degree left.
    DegreeExhausted,
    /// The carried confidence fell below the threshold.
    LowConfidence,
}

/// Result of advancing a cursor by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Predicted next address, emitted whenever a successor exists.
    ///
    /// Only a step that also yields `next` may be turned into a request.
    pub candidate: Option<u64>,
    /// Cursor for the following step, `None` once the chain has terminated.
    pub next: Option<LookaheadCursor>,
    /// Set exactly when `next` is `None`.
    pub termination: Option<TerminationReason>,
}

impl Step {
    /// Returns `true` if the chain ended with this step.
    pub const fn terminated(&self) -> bool {
        self.next.is_none()
    }
}

/// Stateless stepping logic shared by both lookahead modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainWalker {
    decay: DecayPolicy,
    threshold: Confidence,
    confidence_max: Confidence,
}

impl ChainWalker {
    /// Creates a walker.
    ///
    /// # Arguments
    ///
    /// * `decay` - How edge confidence folds into carried confidence.
    /// * `threshold` - Carried confidence below which chains stop.
    /// * `confidence_max` - Counter saturation point (clamped to at least 1).
    pub fn new(decay: DecayPolicy, threshold: Confidence, confidence_max: Confidence) -> Self {
        Self {
            decay,
            threshold,
            confidence_max: confidence_max.max(1),
        }
    }

    /// Creates a walker from the predictor configuration.
    pub fn from_config(config: &PrefetcherConfig) -> Self {
        Self::new(
            config.decay,
            config.confidence_threshold,
            config.confidence_max,
        )
    }

    /// Carried confidence of a freshly seeded or freshly reset chain.
    ///
    /// Multiplying by `confidence_max` and dividing by it again is the
    /// identity, so the first step of a chain is judged on its edge alone.
    pub const fn neutral(&self) -> Confidence {
        self.confidence_max
    }

    /// Folds an edge's confidence into a chain's carried confidence.
    ///
    /// The result never exceeds `carried` as long as `edge <= confidence_max`.
    pub fn decay(&self, carried: Confidence, edge: Confidence) -> Confidence {
        match self.decay {
            DecayPolicy::Multiplicative => {
                let scaled = (carried as u64 * edge as u64) / self.confidence_max as u64;
                scaled.min(Confidence::MAX as u64) as Confidence
            }
            DecayPolicy::None => edge,
        }
    }

    /// Advances `cursor` by one step.
    ///
    /// # Arguments
    ///
    /// * `table` - The learned successor model (read only).
    /// * `cursor` - The chain to advance.
    ///
    /// # Returns
    ///
    /// The candidate (if any) and the follow-up cursor (if the chain lives on).
    pub fn advance(&self, table: &SuccessorTable, cursor: &LookaheadCursor) -> Step {
        let Some(best) = table.best_successor(cursor.address) else {
            return Step {
                candidate: None,
                next: None,
                termination: Some(TerminationReason::DeadEnd),
            };
        };

        let carried = self.decay(cursor.carried_confidence, best.confidence);

        let termination = if cursor.remaining_degree == 0 {
            Some(TerminationReason::DegreeExhausted)
        } else if carried < self.threshold {
            Some(TerminationReason::LowConfidence)
        } else {
            None
        };

        let next = match termination {
            Some(_) => None,
            None => Some(LookaheadCursor {
                address: best.address,
                remaining_degree: cursor.remaining_degree - 1,
                carried_confidence: carried,
                root: cursor.root,
                depth: cursor.depth.saturating_add(1),
            }),
        };

        Step {
            candidate: Some(best.address),
            next,
            termination,
        }
    }
}
