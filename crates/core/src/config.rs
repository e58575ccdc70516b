//! Configuration system for the prefetch engine and its trace-driven host.
//!
//! This module defines all configuration structures and enums used to
//! parameterize a run. It provides:
//! 1. **Defaults:** Baseline constants for the predictor, host cache and driver.
//! 2. **Structures:** Hierarchical config for the prefetcher, cache and simulator.
//! 3. **Policies:** Lookahead mode, eviction tie-break, decay function and
//!    saturation clock, each a named variant rather than a separate engine.
//!
//! Configuration is supplied as JSON (`Config::from_json_file`) or built in
//! code from `Config::default()` and the presets on [`PrefetcherConfig`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::ConfigError;

/// Default configuration constants.
mod defaults {
    /// Successor entries tracked per source address.
    pub const SUCCESSORS_PER_SOURCE: usize = 4;

    /// Saturation point of every confidence counter.
    pub const CONFIDENCE_MAX: u32 = 1000;

    /// Confidence given to a freshly inserted successor.
    pub const INITIAL_CONFIDENCE: u32 = 1;

    /// Steps a queued chain may take past its trigger.
    pub const DEGREE: u32 = 3;

    /// Steps a single-cursor chain may take past its trigger.
    pub const SINGLE_CHAIN_DEGREE: u32 = 10;

    /// Carried confidence below which a chain stops extending.
    pub const CONFIDENCE_THRESHOLD: u32 = 100;

    /// Maximum number of in-flight chains in queued mode.
    pub const QUEUE_SIZE: usize = 16;

    /// Block size used for same-block filtering and training keys.
    pub const BLOCK_BYTES: u64 = 64;

    /// Resource pressure at or above which prefetches are demoted to low-priority fills.
    pub const FILL_PRESSURE_THRESHOLD: f64 = 0.9;

    /// Default host cache size in bytes (32 KiB).
    pub const CACHE_SIZE: usize = 32 * 1024;

    /// Default host cache line size in bytes.
    pub const CACHE_LINE: usize = 64;

    /// Default host cache associativity.
    pub const CACHE_WAYS: usize = 8;

    /// Default host cache hit latency in ticks.
    pub const CACHE_LATENCY: u64 = 1;

    /// Default latency of a fill from the next level, in ticks.
    pub const MISS_LATENCY: u64 = 100;

    /// Default number of miss-status holding registers.
    pub const MSHR_ENTRIES: usize = 16;

    /// Default number of host ticks delivered after every access.
    pub const TICKS_PER_ACCESS: u32 = 1;
}

/// How in-flight prediction chains are held between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LookaheadMode {
    /// At most one active chain; each candidate is issued as soon as it is produced.
    Single,
    /// A bounded FIFO of chains advanced together; only terminal addresses are issued.
    #[default]
    Queued,
}

/// Which entry loses when several successors tie for the lowest confidence.
///
/// Successor lists are kept newest-first, so both policies are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EvictionTieBreak {
    /// Evict the most recently inserted of the tied entries.
    #[default]
    Newest,
    /// Evict the least recently inserted of the tied entries.
    Oldest,
}

/// How confidence compounds along a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DecayPolicy {
    /// `carried * confidence / confidence_max`.
    #[default]
    Multiplicative,
    /// No compounding: each step is judged on the raw confidence of its edge.
    None,
}

/// What advances the saturation-control counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SaturationClock {
    /// One count per host tick.
    #[default]
    Tick,
    /// One count per prefetch issue attempt.
    Issue,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use chainpf_core::config::{Config, LookaheadMode};
///
/// let config = Config::default();
/// assert_eq!(config.prefetcher.mode, LookaheadMode::Queued);
/// assert_eq!(config.prefetcher.successors_per_source, 4);
/// assert!(config.validate().is_ok());
/// ```
///
/// Partial JSON documents fall back to defaults field by field:
///
/// ```
/// use chainpf_core::config::{Config, DecayPolicy, LookaheadMode};
///
/// let json = r#"{
///     "prefetcher": { "mode": "Single", "degree": 10, "decay": "None" },
///     "cache": { "ways": 4 }
/// }"#;
///
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.prefetcher.mode, LookaheadMode::Single);
/// assert_eq!(config.prefetcher.decay, DecayPolicy::None);
/// assert_eq!(config.prefetcher.confidence_max, 1000);
/// assert_eq!(config.cache.ways, 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Prediction engine parameters
    #[serde(default)]
    pub prefetcher: PrefetcherConfig,
    /// Host cache parameters
    #[serde(default)]
    pub cache: CacheConfig,
    /// Trace driver parameters
    #[serde(default)]
    pub sim: SimConfig,
}

impl Config {
    /// Parses and validates a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed documents and
    /// [`ConfigError::Invalid`] for out-of-range parameters.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise
    /// the errors of [`Config::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks every section for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.prefetcher.validate()?;
        self.cache.validate()
    }
}

/// Prediction engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetcherConfig {
    /// Lookahead strategy
    #[serde(default)]
    pub mode: LookaheadMode,

    /// Successor entries kept per source address (K)
    #[serde(default = "PrefetcherConfig::default_successors")]
    pub successors_per_source: usize,

    /// Saturation point of confidence counters
    #[serde(default = "PrefetcherConfig::default_confidence_max")]
    pub confidence_max: u32,

    /// Confidence assigned to a newly inserted successor
    #[serde(default = "PrefetcherConfig::default_initial_confidence")]
    pub initial_confidence: u32,

    /// Steps a chain may take before it is forced to terminate
    #[serde(default = "PrefetcherConfig::default_degree")]
    pub degree: u32,

    /// Chains whose carried confidence drops below this stop extending
    #[serde(default = "PrefetcherConfig::default_threshold")]
    pub confidence_threshold: u32,

    /// Capacity of the chain queue (queued mode only)
    #[serde(default = "PrefetcherConfig::default_queue_size")]
    pub queue_size: usize,

    /// Issue every intermediate chain node, not only the terminal one
    #[serde(default)]
    pub prefetch_intermediate: bool,

    /// Ignore transitions between two addresses in the same block
    #[serde(default = "PrefetcherConfig::default_filter_same_block")]
    pub filter_same_block: bool,

    /// Block size used for filtering and block-granular training
    #[serde(default = "PrefetcherConfig::default_block_bytes")]
    pub block_bytes: u64,

    /// Key the successor table by block-aligned rather than raw addresses
    #[serde(default)]
    pub train_on_blocks: bool,

    /// Tie-break for lowest-confidence eviction
    #[serde(default)]
    pub eviction_tie_break: EvictionTieBreak,

    /// How confidence compounds along a chain
    #[serde(default)]
    pub decay: DecayPolicy,

    /// Pressure below which prefetches request a normal-priority fill
    #[serde(default = "PrefetcherConfig::default_fill_pressure")]
    pub fill_pressure_threshold: f64,

    /// Periodic confidence reset
    #[serde(default)]
    pub saturation: SaturationConfig,
}

impl PrefetcherConfig {
    /// Returns the default successor capacity per source.
    fn default_successors() -> usize {
        defaults::SUCCESSORS_PER_SOURCE
    }

    /// Returns the default confidence saturation point.
    fn default_confidence_max() -> u32 {
        defaults::CONFIDENCE_MAX
    }

    /// Returns the default confidence of a new successor.
    fn default_initial_confidence() -> u32 {
        defaults::INITIAL_CONFIDENCE
    }

    /// Returns the default chain degree.
    fn default_degree() -> u32 {
        defaults::DEGREE
    }

    /// Returns the default carried-confidence threshold.
    fn default_threshold() -> u32 {
        defaults::CONFIDENCE_THRESHOLD
    }

    /// Returns the default chain queue capacity.
    fn default_queue_size() -> usize {
        defaults::QUEUE_SIZE
    }

    /// Same-block filtering is on unless disabled.
    fn default_filter_same_block() -> bool {
        true
    }

    /// Returns the default block size.
    fn default_block_bytes() -> u64 {
        defaults::BLOCK_BYTES
    }

    /// Returns the default fill-priority pressure threshold.
    fn default_fill_pressure() -> f64 {
        defaults::FILL_PRESSURE_THRESHOLD
    }

    /// One long chain, issuing every step, judged on raw edge confidence.
    ///
    /// Degree 10, no threshold, no decay, single-cursor lookahead.
    pub fn single_chain() -> Self {
        Self {
            mode: LookaheadMode::Single,
            degree: defaults::SINGLE_CHAIN_DEGREE,
            confidence_threshold: 0,
            decay: DecayPolicy::None,
            ..Self::default()
        }
    }

    /// Sixteen short chains with multiplicative decay and a confidence floor.
    ///
    /// This is the default configuration.
    pub fn queued_chains() -> Self {
        Self::default()
    }

    /// Period of the saturation counter, or `None` when saturation control is off.
    pub const fn saturation_period(&self) -> Option<u32> {
        if !self.saturation.enabled {
            return None;
        }
        match self.saturation.period {
            Some(p) => Some(p),
            None => Some(self.confidence_max),
        }
    }

    /// Checks predictor parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.successors_per_source == 0 {
            return Err(ConfigError::invalid(
                "prefetcher.successors_per_source",
                "must be at least 1",
            ));
        }
        if self.confidence_max == 0 {
            return Err(ConfigError::invalid(
                "prefetcher.confidence_max",
                "must be at least 1",
            ));
        }
        if self.initial_confidence > self.confidence_max {
            return Err(ConfigError::invalid(
                "prefetcher.initial_confidence",
                format!("must not exceed confidence_max ({})", self.confidence_max),
            ));
        }
        if self.confidence_threshold > self.confidence_max {
            return Err(ConfigError::invalid(
                "prefetcher.confidence_threshold",
                format!("must not exceed confidence_max ({})", self.confidence_max),
            ));
        }
        if self.mode == LookaheadMode::Queued && self.queue_size == 0 {
            return Err(ConfigError::invalid(
                "prefetcher.queue_size",
                "must be at least 1 in queued mode",
            ));
        }
        if !self.block_bytes.is_power_of_two() {
            return Err(ConfigError::invalid(
                "prefetcher.block_bytes",
                format!("must be a power of two, got {}", self.block_bytes),
            ));
        }
        if !(0.0..=1.0).contains(&self.fill_pressure_threshold) {
            return Err(ConfigError::invalid(
                "prefetcher.fill_pressure_threshold",
                format!("must lie in [0, 1], got {}", self.fill_pressure_threshold),
            ));
        }
        if self.saturation.period == Some(0) {
            return Err(ConfigError::invalid(
                "prefetcher.saturation.period",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for PrefetcherConfig {
    fn default() -> Self {
        Self {
            mode: LookaheadMode::default(),
            successors_per_source: defaults::SUCCESSORS_PER_SOURCE,
            confidence_max: defaults::CONFIDENCE_MAX,
            initial_confidence: defaults::INITIAL_CONFIDENCE,
            degree: defaults::DEGREE,
            confidence_threshold: defaults::CONFIDENCE_THRESHOLD,
            queue_size: defaults::QUEUE_SIZE,
            prefetch_intermediate: false,
            filter_same_block: true,
            block_bytes: defaults::BLOCK_BYTES,
            train_on_blocks: false,
            eviction_tie_break: EvictionTieBreak::default(),
            decay: DecayPolicy::default(),
            fill_pressure_threshold: defaults::FILL_PRESSURE_THRESHOLD,
            saturation: SaturationConfig::default(),
        }
    }
}

/// Saturation control configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturationConfig {
    /// Enable periodic confidence zeroing
    #[serde(default = "SaturationConfig::default_enabled")]
    pub enabled: bool,

    /// Event that advances the counter
    #[serde(default)]
    pub clock: SaturationClock,

    /// Counts between resets; `None` uses `confidence_max`
    #[serde(default)]
    pub period: Option<u32>,
}

impl SaturationConfig {
    /// Saturation control is on unless disabled.
    fn default_enabled() -> bool {
        true
    }
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clock: SaturationClock::default(),
            period: None,
        }
    }
}

/// Host cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Total cache size in bytes
    #[serde(default = "CacheConfig::default_size")]
    pub size_bytes: usize,

    /// Cache line size in bytes
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: usize,

    /// Associativity (number of ways)
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: usize,

    /// Hit latency in ticks
    #[serde(default = "CacheConfig::default_latency")]
    pub latency: u64,

    /// Fill latency from the next level in ticks
    #[serde(default = "CacheConfig::default_miss_latency")]
    pub miss_latency: u64,

    /// Miss-status holding registers shared by demand misses and prefetches
    #[serde(default = "CacheConfig::default_mshr_entries")]
    pub mshr_entries: usize,

    /// Attach the prediction engine to this cache
    #[serde(default = "CacheConfig::default_prefetch_enabled")]
    pub prefetch_enabled: bool,
}

impl CacheConfig {
    /// Returns the default cache size in bytes.
    fn default_size() -> usize {
        defaults::CACHE_SIZE
    }

    /// Returns the default cache line size in bytes.
    fn default_line() -> usize {
        defaults::CACHE_LINE
    }

    /// Returns the default associativity.
    fn default_ways() -> usize {
        defaults::CACHE_WAYS
    }

    /// Returns the default hit latency.
    fn default_latency() -> u64 {
        defaults::CACHE_LATENCY
    }

    /// Returns the default fill latency.
    fn default_miss_latency() -> u64 {
        defaults::MISS_LATENCY
    }

    /// Returns the default MSHR count.
    fn default_mshr_entries() -> usize {
        defaults::MSHR_ENTRIES
    }

    /// Prefetching is on unless disabled.
    fn default_prefetch_enabled() -> bool {
        true
    }

    /// Number of sets implied by size, line size and associativity.
    pub const fn num_sets(&self) -> usize {
        if self.line_bytes == 0 || self.ways == 0 {
            0
        } else {
            self.size_bytes / self.line_bytes / self.ways
        }
    }

    /// Checks cache geometry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.line_bytes.is_power_of_two() {
            return Err(ConfigError::invalid(
                "cache.line_bytes",
                format!("must be a power of two, got {}", self.line_bytes),
            ));
        }
        if self.ways == 0 {
            return Err(ConfigError::invalid("cache.ways", "must be at least 1"));
        }
        if self.mshr_entries == 0 {
            return Err(ConfigError::invalid(
                "cache.mshr_entries",
                "must be at least 1",
            ));
        }
        let set_bytes = self.line_bytes * self.ways;
        if self.size_bytes == 0 || self.size_bytes % set_bytes != 0 {
            return Err(ConfigError::invalid(
                "cache.size_bytes",
                format!("must be a non-zero multiple of line_bytes * ways ({set_bytes})"),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_bytes: defaults::CACHE_SIZE,
            line_bytes: defaults::CACHE_LINE,
            ways: defaults::CACHE_WAYS,
            latency: defaults::CACHE_LATENCY,
            miss_latency: defaults::MISS_LATENCY,
            mshr_entries: defaults::MSHR_ENTRIES,
            prefetch_enabled: true,
        }
    }
}

/// Trace driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Host ticks delivered after each access
    #[serde(default = "SimConfig::default_ticks_per_access")]
    pub ticks_per_access: u32,

    /// Extra ticks delivered after the last access
    #[serde(default)]
    pub drain_ticks: u64,
}

impl SimConfig {
    /// Returns the default ticks per access.
    fn default_ticks_per_access() -> u32 {
        defaults::TICKS_PER_ACCESS
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_access: defaults::TICKS_PER_ACCESS,
            drain_ticks: 0,
        }
    }
}
