//! Confidence-Bounded Successor Table.
//!
//! Maps every observed source address to a short list of addresses that have
//! been seen to follow it, each with a saturating confidence counter. This is
//! the learned first-order Markov model the chain walker traverses.
//!
//! Each list holds at most K entries (default 4) and is kept newest-first.
//! Ranking is by confidence only; list position matters solely as the
//! deterministic tie-break for selection and eviction.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `record()`: O(K) after one hash lookup
//!   - `best_successor()`: O(K)
//!   - `reset_confidence()`: O(S × K) where S is the number of tracked sources
//! - **Space Complexity:** O(S × K)
//! - **Best Case:** Pointer-chasing and other irregular but repeating streams
//! - **Worst Case:** Streams with no repetition, where every list thrashes

use std::collections::HashMap;

use crate::config::{EvictionTieBreak, PrefetcherConfig};

/// Saturating confidence counter value.
pub type Confidence = u32;

/// One learned `source -> address` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessorEntry {
    /// The successor address.
    pub address: u64,
    /// How often this transition has been observed since the last reset.
    pub confidence: Confidence,
}

/// What [`SuccessorTable::record`] did with a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The successor was already tracked; its confidence is now `confidence`.
    Reinforced {
        /// Confidence after the increment (saturated).
        confidence: Confidence,
    },
    /// The successor was added to a list with a free slot.
    Inserted,
    /// The list was full; `evicted` made room for the new successor.
    Replaced {
        /// The lowest-confidence entry that was dropped.
        evicted: SuccessorEntry,
    },
}

/// Successor table state.
#[derive(Debug, Clone)]
pub struct SuccessorTable {
    /// Per-source successor lists, newest entry first.
    entries: HashMap<u64, Vec<SuccessorEntry>>,
    /// Maximum successors per source (K).
    capacity: usize,
    /// Saturation point of every counter.
    confidence_max: Confidence,
    /// Confidence of a freshly inserted successor.
    initial_confidence: Confidence,
    /// Which tied minimum is evicted.
    tie_break: EvictionTieBreak,
}

impl SuccessorTable {
    /// Creates an empty table.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Successors kept per source. Clamped to at least 1.
    /// * `confidence_max` - Counter saturation point. Clamped to at least 1.
    /// * `initial_confidence` - Confidence of new entries. Clamped to `confidence_max`.
    /// * `tie_break` - Which of several lowest-confidence entries is evicted.
    pub fn new(
        capacity: usize,
        confidence_max: Confidence,
        initial_confidence: Confidence,
        tie_break: EvictionTieBreak,
    ) -> Self {
        let confidence_max = confidence_max.max(1);
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            confidence_max,
            initial_confidence: initial_confidence.min(confidence_max),
            tie_break,
        }
    }

    /// Creates an empty table sized by the predictor configuration.
    pub fn from_config(config: &PrefetcherConfig) -> Self {
        Self::new(
            config.successors_per_source,
            config.confidence_max,
            config.initial_confidence,
            config.eviction_tie_break,
        )
    }

    /// Records one observed `source -> successor` transition.
    ///
    /// Reinforces an existing entry, fills a free slot, or replaces the
    /// lowest-confidence entry, in that order of preference.
    ///
    /// # Arguments
    ///
    /// * `source` - The address accessed first.
    /// * `successor` - The address accessed next.
    ///
    /// # Returns
    ///
    /// What happened to the table.
    pub fn record(&mut self, source: u64, successor: u64) -> RecordOutcome {
        let capacity = self.capacity;
        let list = self
            .entries
            .entry(source)
            .or_insert_with(|| Vec::with_capacity(capacity));

        if let Some(entry) = list.iter_mut().find(|e| e.address == successor) {
            entry.confidence = entry.confidence.saturating_add(1).min(self.confidence_max);
            return RecordOutcome::Reinforced {
                confidence: entry.confidence,
            };
        }

        let fresh = SuccessorEntry {
            address: successor,
            confidence: self.initial_confidence,
        };

        if list.len() < capacity {
            list.insert(0, fresh);
            return RecordOutcome::Inserted;
        }

        let victim = Self::victim_index(list, self.tie_break);
        let evicted = list.remove(victim);
        list.insert(0, fresh);
        RecordOutcome::Replaced { evicted }
    }

    /// Picks the lowest-confidence slot of a full list.
    ///
    /// The list is newest-first, so the first tied minimum is the newest.
    fn victim_index(list: &[SuccessorEntry], tie_break: EvictionTieBreak) -> usize {
        let Some(min) = list.iter().map(|e| e.confidence).min() else {
            return 0;
        };
        let mut tied = list
            .iter()
            .enumerate()
            .filter(|(_, e)| e.confidence == min)
            .map(|(i, _)| i);
        let pick = match tie_break {
            EvictionTieBreak::Newest => tied.next(),
            EvictionTieBreak::Oldest => tied.last(),
        };
        pick.unwrap_or(0)
    }

    /// Returns the highest-confidence successor of `source`.
    ///
    /// Among exact ties the entry nearest the front of the list (the most
    /// recently inserted) wins.
    ///
    /// # Returns
    ///
    /// The best entry, or `None` if `source` has never been recorded.
    pub fn best_successor(&self, source: u64) -> Option<SuccessorEntry> {
        let list = self.entries.get(&source)?;
        let mut best: Option<SuccessorEntry> = None;
        for entry in list {
            match best {
                Some(b) if b.confidence >= entry.confidence => {}
                _ => best = Some(*entry),
            }
        }
        best
    }

    /// Returns the successors tracked for `source`, newest first.
    pub fn successors(&self, source: u64) -> &[SuccessorEntry] {
        self.entries.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the confidence of one transition, if tracked.
    pub fn confidence(&self, source: u64, successor: u64) -> Option<Confidence> {
        self.successors(source)
            .iter()
            .find(|e| e.address == successor)
            .map(|e| e.confidence)
    }

    /// Zeroes every confidence counter while keeping every tracked transition.
    pub fn reset_confidence(&mut self) {
        for list in self.entries.values_mut() {
            for entry in list {
                entry.confidence = 0;
            }
        }
    }

    /// Iterates over every `(source, successors)` pair in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[SuccessorEntry])> + '_ {
        self.entries.iter().map(|(src, list)| (*src, list.as_slice()))
    }

    /// Number of tracked source addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no transition has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of tracked transitions across all sources.
    pub fn transition_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Successors kept per source (K).
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Counter saturation point.
    pub const fn confidence_max(&self) -> Confidence {
        self.confidence_max
    }
}
