//! Set-Associative Host Cache.
//!
//! A small trace-driven cache the prefetch engine can be attached to. It
//! models what the engine needs from a host and little else:
//! 1. **Lookup:** Set-associative tags with LRU replacement.
//! 2. **Misses:** A fixed pool of MSHRs whose occupancy is the resource
//!    pressure reported to the engine.
//! 3. **Prefetch fills:** Installed immediately, tracked in an MSHR until the
//!    fill latency elapses, and placed at the LRU position when the engine
//!    asks for a low-priority fill.

/// LRU replacement state with low-priority demotion.
pub mod lru;

use std::fmt;

use tracing::trace;

use self::lru::LruStack;
use crate::config::{CacheConfig, PrefetcherConfig};
use crate::prefetch::{MarkovPrefetcher, PrefetchHost, Prefetcher};
use crate::stats::{CacheStats, PrefetchStats};

/// Cache line entry containing tag, validity, and prefetch bits.
#[derive(Debug, Clone, Copy, Default)]
struct CacheLine {
    tag: u64,
    valid: bool,
    /// Installed by a prefetch and not yet touched by demand.
    prefetched: bool,
}

/// Outstanding fill.
#[derive(Debug, Clone, Copy)]
struct Mshr {
    block: u64,
    ready_at: u64,
}

/// Tag array, replacement state and MSHR pool.
///
/// This is the part of the cache the prefetch engine sees through
/// [`PrefetchHost`].
#[derive(Debug, Clone)]
pub struct CacheArray {
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: usize,
    lru: LruStack,
    /// Hit latency in ticks.
    latency: u64,
    /// Fill latency in ticks.
    miss_latency: u64,
    mshr_capacity: usize,
    mshrs: Vec<Mshr>,
    /// Current tick.
    now: u64,
    stats: CacheStats,
}

impl CacheArray {
    /// Creates an empty cache.
    ///
    /// # Arguments
    ///
    /// * `config` - Cache geometry and timing. Expected to have passed
    ///   [`CacheConfig::validate`]; degenerate values fall back to a single
    ///   set, one way and 64-byte lines.
    pub fn new(config: &CacheConfig) -> Self {
        let ways = config.ways.max(1);
        let line_bytes = if config.line_bytes.is_power_of_two() {
            config.line_bytes
        } else {
            64
        };
        let num_sets = (config.size_bytes / line_bytes / ways).max(1);
        let mshr_capacity = config.mshr_entries.max(1);

        Self {
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
            line_bytes,
            lru: LruStack::new(num_sets, ways),
            latency: config.latency,
            miss_latency: config.miss_latency,
            mshr_capacity,
            mshrs: Vec::with_capacity(mshr_capacity),
            now: 0,
            stats: CacheStats::default(),
        }
    }

    /// Splits an address into set index and tag.
    const fn locate(&self, addr: u64) -> (usize, u64) {
        let block = addr / self.line_bytes as u64;
        let set = (block % self.num_sets as u64) as usize;
        (set, block / self.num_sets as u64)
    }

    fn find_way(&self, set: usize, tag: u64) -> Option<usize> {
        let base = set * self.ways;
        self.lines[base..base + self.ways]
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    fn pending(&self, block: u64) -> Option<&Mshr> {
        self.mshrs.iter().find(|m| m.block == block)
    }

    /// Installs `addr` over the LRU way of its set.
    ///
    /// # Returns
    ///
    /// The way the line was written to.
    fn install(&mut self, addr: u64, prefetched: bool) -> usize {
        let (set, tag) = self.locate(addr);
        let way = self.lru.victim(set);
        let idx = set * self.ways + way;

        let victim = self.lines[idx];
        if victim.valid && victim.prefetched {
            self.stats.unused_prefetch_evictions += 1;
        }

        self.lines[idx] = CacheLine {
            tag,
            valid: true,
            prefetched,
        };
        self.lru.touch(set, way);
        way
    }

    /// Claims an MSHR for `block`, if one is free.
    fn allocate_mshr(&mut self, block: u64) -> bool {
        if self.mshrs.len() >= self.mshr_capacity {
            return false;
        }
        self.mshrs.push(Mshr {
            block,
            ready_at: self.now + self.miss_latency,
        });
        true
    }

    /// Performs a demand access.
    ///
    /// A hit on a line whose fill is still in flight waits for the rest of
    /// the fill. A miss installs the line and claims an MSHR when one is free.
    ///
    /// # Returns
    ///
    /// A tuple `(hit, latency)`.
    pub fn demand(&mut self, addr: u64) -> (bool, u64) {
        let block = self.block_align(addr);
        let (set, tag) = self.locate(addr);

        let (hit, latency) = if let Some(way) = self.find_way(set, tag) {
            self.lru.touch(set, way);
            let idx = set * self.ways + way;
            let was_prefetched = std::mem::replace(&mut self.lines[idx].prefetched, false);

            let mut latency = self.latency;
            let now = self.now;
            if let Some(remaining) = self.pending(block).map(|m| m.ready_at.saturating_sub(now)) {
                latency += remaining;
                if was_prefetched {
                    self.stats.late_prefetches += 1;
                }
            }
            if was_prefetched {
                self.stats.useful_prefetches += 1;
            }
            self.stats.hits += 1;
            (true, latency)
        } else {
            self.stats.misses += 1;
            let _ = self.install(block, false);
            let _ = self.allocate_mshr(block);
            (false, self.latency + self.miss_latency)
        };

        self.stats.total_latency += latency;
        (hit, latency)
    }

    /// Advances time by one tick and retires completed fills.
    pub fn tick(&mut self) {
        self.now += 1;
        let now = self.now;
        self.mshrs.retain(|m| m.ready_at > now);
    }

    /// Checks if the cache holds the line containing `addr`.
    pub fn contains(&self, addr: u64) -> bool {
        let (set, tag) = self.locate(addr);
        self.find_way(set, tag).is_some()
    }

    /// Fills still in flight.
    pub fn in_flight(&self) -> usize {
        self.mshrs.len()
    }

    /// Current tick.
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Number of sets.
    pub const fn num_sets(&self) -> usize {
        self.num_sets
    }

    /// Line size in bytes.
    pub const fn line_bytes(&self) -> usize {
        self.line_bytes
    }

    /// Counters collected so far.
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl PrefetchHost for CacheArray {
    fn block_align(&self, addr: u64) -> u64 {
        addr & !(self.line_bytes as u64 - 1)
    }

    fn resource_pressure(&self) -> f64 {
        self.mshrs.len() as f64 / self.mshr_capacity as f64
    }

    fn issue_prefetch(&mut self, addr: u64, fill_priority_hint: bool, metadata: u32) -> bool {
        self.stats.prefetch_requests += 1;
        let block = self.block_align(addr);

        if self.contains(block) {
            self.stats.prefetch_redundant += 1;
            return true;
        }
        if !self.allocate_mshr(block) {
            self.stats.prefetch_dropped += 1;
            trace!(
                address = format_args!("{block:#x}"),
                "prefetch dropped, no free MSHR"
            );
            return false;
        }

        let way = self.install(block, true);
        if !fill_priority_hint {
            let (set, _) = self.locate(block);
            self.lru.demote(set, way);
            self.stats.low_priority_fills += 1;
        }
        self.stats.prefetch_fills += 1;

        trace!(
            address = format_args!("{block:#x}"),
            depth = metadata,
            fill_priority_hint,
            "prefetch fill"
        );
        true
    }
}

/// Host cache with an optional prefetch engine attached.
pub struct CacheSim {
    array: CacheArray,
    /// Optional prefetch engine (boxed for dynamic dispatch).
    prefetcher: Option<Box<dyn Prefetcher>>,
}

impl CacheSim {
    /// Creates a cache, attaching a [`MarkovPrefetcher`] when
    /// `cache.prefetch_enabled` is set.
    ///
    /// # Arguments
    ///
    /// * `cache` - Cache geometry and timing.
    /// * `prefetcher` - Engine parameters.
    pub fn new(cache: &CacheConfig, prefetcher: &PrefetcherConfig) -> Self {
        let engine: Option<Box<dyn Prefetcher>> = if cache.prefetch_enabled {
            Some(Box::new(MarkovPrefetcher::new(prefetcher)))
        } else {
            None
        };
        Self::with_prefetcher(cache, engine)
    }

    /// Creates a cache with a caller-supplied prefetcher (or none).
    pub fn with_prefetcher(cache: &CacheConfig, prefetcher: Option<Box<dyn Prefetcher>>) -> Self {
        Self {
            array: CacheArray::new(cache),
            prefetcher,
        }
    }

    /// Accesses the cache, then lets the prefetcher observe the access.
    ///
    /// # Returns
    ///
    /// A tuple `(hit, latency)`.
    pub fn access(&mut self, addr: u64) -> (bool, u64) {
        let outcome = self.array.demand(addr);
        if let Some(pf) = self.prefetcher.as_mut() {
            pf.on_access(addr, &mut self.array);
        }
        outcome
    }

    /// Advances the cache and then the prefetcher by one tick.
    pub fn tick(&mut self) {
        self.array.tick();
        if let Some(pf) = self.prefetcher.as_mut() {
            pf.on_tick(&mut self.array);
        }
    }

    /// Checks if the cache holds the line containing `addr`.
    pub fn contains(&self, addr: u64) -> bool {
        self.array.contains(addr)
    }

    /// The tag array and MSHR pool.
    pub const fn array(&self) -> &CacheArray {
        &self.array
    }

    /// Cache counters.
    pub const fn stats(&self) -> &CacheStats {
        self.array.stats()
    }

    /// Prefetcher counters, `None` when no prefetcher is attached.
    pub fn prefetch_stats(&self) -> Option<&PrefetchStats> {
        self.prefetcher.as_ref().map(|pf| pf.stats())
    }
}

impl fmt::Debug for CacheSim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSim")
            .field("array", &self.array)
            .field("prefetcher", &self.prefetcher.is_some())
            .finish()
    }
}
