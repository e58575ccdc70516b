//! Simulator: replays an address trace through a host cache.
//!
//! Every access is followed by a fixed number of host ticks, so chains get
//! `ticks_per_access` steps of lookahead between demand accesses. Extra
//! drain ticks at the end let in-flight chains finish.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use super::trace::{AccessKind, TraceRecord, load_trace};
use crate::cache::CacheSim;
use crate::common::error::SimError;
use crate::config::{Config, SimConfig};
use crate::stats::SimStats;

/// Top-level trace driver.
#[derive(Debug)]
pub struct Simulator {
    /// Host cache with the prefetch engine attached.
    cache: CacheSim,
    /// Tick cadence.
    config: SimConfig,
    /// Ticks delivered so far.
    ticks: u64,
    /// Trace loads replayed.
    reads: u64,
    /// Trace stores replayed.
    writes: u64,
}

impl Simulator {
    /// Creates a simulator without validating `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            cache: CacheSim::new(&config.cache, &config.prefetcher),
            config: config.sim.clone(),
            ticks: 0,
            reads: 0,
            writes: 0,
        }
    }

    /// Validates `config` and creates a simulator.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if any parameter is out of range.
    pub fn from_config(config: &Config) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Replays one demand access followed by `ticks_per_access` ticks.
    ///
    /// # Returns
    ///
    /// A tuple `(hit, latency)` for the demand access.
    pub fn step(&mut self, addr: u64) -> (bool, u64) {
        let outcome = self.cache.access(addr);
        for _ in 0..self.config.ticks_per_access {
            self.tick();
        }
        outcome
    }

    /// Delivers one host tick.
    pub fn tick(&mut self) {
        self.cache.tick();
        self.ticks += 1;
    }

    /// Replays `trace`, then the configured drain ticks.
    ///
    /// # Returns
    ///
    /// Counters for the whole run, including wall-clock time.
    pub fn run(&mut self, trace: &[TraceRecord]) -> SimStats {
        info!(
            accesses = trace.len(),
            ticks_per_access = self.config.ticks_per_access,
            "replaying trace"
        );
        let start = Instant::now();

        for record in trace {
            match record.kind {
                AccessKind::Read => self.reads += 1,
                AccessKind::Write => self.writes += 1,
            }
            let _ = self.step(record.address);
        }
        for _ in 0..self.config.drain_ticks {
            self.tick();
        }

        let mut stats = self.stats();
        stats.host_seconds = start.elapsed().as_secs_f64();
        info!(
            ticks = stats.ticks,
            hits = stats.cache.hits,
            misses = stats.cache.misses,
            prefetches = stats.prefetch.prefetches_issued,
            "trace replay finished"
        );
        stats
    }

    /// Loads the trace at `path` and replays it with a validated `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] for invalid parameters and
    /// [`SimError::Trace`] when the trace cannot be loaded.
    pub fn run_file(config: &Config, path: impl AsRef<Path>) -> Result<SimStats, SimError> {
        let mut sim = Self::from_config(config)?;
        let trace = load_trace(path)?;
        Ok(sim.run(&trace))
    }

    /// Snapshot of the counters so far (`host_seconds` is left at zero).
    pub fn stats(&self) -> SimStats {
        SimStats {
            ticks: self.ticks,
            host_seconds: 0.0,
            reads: self.reads,
            writes: self.writes,
            prefetch: self.cache.prefetch_stats().cloned().unwrap_or_default(),
            cache: self.cache.stats().clone(),
        }
    }

    /// The host cache.
    pub const fn cache(&self) -> &CacheSim {
        &self.cache
    }

    /// Ticks delivered so far.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}
