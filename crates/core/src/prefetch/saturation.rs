//! Saturation Control.
//!
//! Confidence counters only ever grow between resets, so over a long run most
//! transitions drift to `confidence_max` and "highest confidence" stops
//! meaning anything. This clock fires every `period` events; the predictor
//! then zeroes all table confidences and restores chain-carried confidence to
//! neutral, trading long-term memory for responsiveness to phase changes.

use crate::config::{PrefetcherConfig, SaturationClock};

/// Periodic reset clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaturationControl {
    /// Events seen since the last reset.
    counter: u32,
    /// Events between resets, `None` when disabled.
    period: Option<u32>,
    /// Event kind that advances the counter.
    clock: SaturationClock,
    /// Resets fired so far.
    resets: u64,
}

impl SaturationControl {
    /// Creates a clock.
    ///
    /// # Arguments
    ///
    /// * `period` - Events between resets; `None` or `Some(0)` disables the clock.
    /// * `clock` - Which event advances the counter.
    pub fn new(period: Option<u32>, clock: SaturationClock) -> Self {
        Self {
            counter: 0,
            period: period.filter(|p| *p > 0),
            clock,
            resets: 0,
        }
    }

    /// Creates the clock described by the predictor configuration.
    pub fn from_config(config: &PrefetcherConfig) -> Self {
        Self::new(config.saturation_period(), config.saturation.clock)
    }

    /// Counts a host tick.
    ///
    /// # Returns
    ///
    /// `true` if a reset is due now.
    pub fn on_tick(&mut self) -> bool {
        self.clock == SaturationClock::Tick && self.advance()
    }

    /// Counts a prefetch issue attempt.
    ///
    /// # Returns
    ///
    /// `true` if a reset is due now.
    pub fn on_issue(&mut self) -> bool {
        self.clock == SaturationClock::Issue && self.advance()
    }

    fn advance(&mut self) -> bool {
        let Some(period) = self.period else {
            return false;
        };
        self.counter += 1;
        if self.counter >= period {
            self.counter = 0;
            self.resets += 1;
            true
        } else {
            false
        }
    }

    /// Events counted since the last reset.
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Events between resets, `None` when disabled.
    pub const fn period(&self) -> Option<u32> {
        self.period
    }

    /// Resets fired so far.
    pub const fn resets(&self) -> u64 {
        self.resets
    }
}
