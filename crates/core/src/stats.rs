//! Statistics collection and reporting.
//!
//! This module tracks what the engine and its host cache did during a run:
//! 1. **Learning:** Accesses seen, transitions recorded or filtered, evictions.
//! 2. **Lookahead:** Chains seeded, superseded, flushed, and why they ended.
//! 3. **Issue:** Prefetches issued, accepted, rejected, demoted to low priority.
//! 4. **Cache:** Demand hit/miss counts and prefetch usefulness.

use serde::Serialize;

use crate::prefetch::walker::TerminationReason;

/// Counters kept by one predictor instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchStats {
    /// Accesses observed.
    pub accesses: u64,
    /// Transitions written into the successor table.
    pub transitions_recorded: u64,
    /// Transitions skipped because both addresses shared a block.
    pub transitions_filtered: u64,
    /// Successor entries evicted to make room for new ones.
    pub successors_evicted: u64,
    /// Chains started.
    pub chains_seeded: u64,
    /// Queued chains restarted by a repeat of their trigger.
    pub chains_superseded: u64,
    /// Triggers ignored because the single cursor was busy.
    pub seeds_ignored: u64,
    /// Chains flushed from a full queue.
    pub queue_overflows: u64,
    /// Chain steps that produced a candidate address.
    pub candidates: u64,
    /// Prefetch requests handed to the host.
    pub prefetches_issued: u64,
    /// Requests the host accepted.
    pub prefetches_accepted: u64,
    /// Requests the host rejected.
    pub prefetches_rejected: u64,
    /// Requests issued without the fill-priority hint.
    pub low_priority_requests: u64,
    /// Chains ended on an address with no successors.
    pub terminated_dead_end: u64,
    /// Chains ended by running out of degree.
    pub terminated_degree: u64,
    /// Chains ended by carried confidence falling under the threshold.
    pub terminated_low_confidence: u64,
    /// Saturation-control resets fired.
    pub saturation_resets: u64,
}

impl PrefetchStats {
    /// Counts a chain termination under its reason.
    pub fn record_termination(&mut self, reason: TerminationReason) {
        match reason {
            TerminationReason::DeadEnd => self.terminated_dead_end += 1,
            TerminationReason::DegreeExhausted => self.terminated_degree += 1,
            TerminationReason::LowConfidence => self.terminated_low_confidence += 1,
        }
    }

    /// Total chains that ended naturally (not flushed).
    pub const fn chains_terminated(&self) -> u64 {
        self.terminated_dead_end + self.terminated_degree + self.terminated_low_confidence
    }

    /// Fraction of issued requests the host accepted, in percent.
    pub fn acceptance_rate(&self) -> f64 {
        if self.prefetches_issued == 0 {
            0.0
        } else {
            100.0 * self.prefetches_accepted as f64 / self.prefetches_issued as f64
        }
    }
}

/// Counters kept by the host cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Demand accesses that hit.
    pub hits: u64,
    /// Demand accesses that missed.
    pub misses: u64,
    /// Prefetch requests received from the engine.
    pub prefetch_requests: u64,
    /// Prefetches that installed a line.
    pub prefetch_fills: u64,
    /// Prefetches for lines already present.
    pub prefetch_redundant: u64,
    /// Prefetches refused because every MSHR was busy.
    pub prefetch_dropped: u64,
    /// Prefetched lines installed at low priority.
    pub low_priority_fills: u64,
    /// Prefetched lines later hit by a demand access.
    pub useful_prefetches: u64,
    /// Prefetched lines evicted without ever being used.
    pub unused_prefetch_evictions: u64,
    /// Demand hits on prefetched lines whose fill was still in flight.
    pub late_prefetches: u64,
    /// Sum of demand access latencies, in ticks.
    pub total_latency: u64,
}

impl CacheStats {
    /// Demand accesses.
    pub const fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Demand miss rate in percent.
    pub fn miss_rate(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            0.0
        } else {
            100.0 * self.misses as f64 / total as f64
        }
    }

    /// Mean demand access latency in ticks.
    pub fn avg_latency(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            0.0
        } else {
            self.total_latency as f64 / total as f64
        }
    }

    /// Useful prefetches as a percentage of prefetch fills.
    pub fn prefetch_accuracy(&self) -> f64 {
        if self.prefetch_fills == 0 {
            0.0
        } else {
            100.0 * self.useful_prefetches as f64 / self.prefetch_fills as f64
        }
    }
}

/// Combined results of one trace replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimStats {
    /// Host ticks delivered.
    pub ticks: u64,
    /// Wall-clock time spent replaying, in seconds.
    pub host_seconds: f64,
    /// Trace records marked as loads (or unmarked).
    pub reads: u64,
    /// Trace records marked as stores.
    pub writes: u64,
    /// Predictor counters.
    pub prefetch: PrefetchStats,
    /// Host cache counters.
    pub cache: CacheStats,
}

/// Section names for selective stats output.
///
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "prefetch", "cache"];

impl SimStats {
    /// Prints only the requested statistics sections to stdout.
    ///
    /// # Arguments
    ///
    /// * `sections` - Slice of section names to print, or empty for all.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let p = &self.prefetch;
        let c = &self.cache;

        if want("summary") {
            let rate = if self.host_seconds > 0.0 {
                p.accesses as f64 / self.host_seconds / 1_000_000.0
            } else {
                0.0
            };
            println!("\n==========================================================");
            println!("CHAIN PREFETCH SIMULATION STATISTICS");
            println!("==========================================================");
            println!("host_seconds             {:.4} s", self.host_seconds);
            println!("sim_ticks                {}", self.ticks);
            println!("sim_accesses             {}", p.accesses);
            println!("sim_reads                {}", self.reads);
            println!("sim_writes               {}", self.writes);
            println!("sim_maps                 {rate:.2} M accesses/s");
            println!("----------------------------------------------------------");
        }
        if want("prefetch") {
            println!("PREDICTOR");
            println!("  learn.recorded         {}", p.transitions_recorded);
            println!("  learn.filtered         {}", p.transitions_filtered);
            println!("  learn.evicted          {}", p.successors_evicted);
            println!("  chain.seeded           {}", p.chains_seeded);
            println!("  chain.superseded       {}", p.chains_superseded);
            println!("  chain.ignored          {}", p.seeds_ignored);
            println!("  chain.overflow         {}", p.queue_overflows);
            println!("  chain.dead_end         {}", p.terminated_dead_end);
            println!("  chain.degree           {}", p.terminated_degree);
            println!("  chain.low_confidence   {}", p.terminated_low_confidence);
            println!("  chain.candidates       {}", p.candidates);
            println!("  pf.issued              {}", p.prefetches_issued);
            println!(
                "  pf.accepted            {} ({:.2}%)",
                p.prefetches_accepted,
                p.acceptance_rate()
            );
            println!("  pf.rejected            {}", p.prefetches_rejected);
            println!("  pf.low_priority        {}", p.low_priority_requests);
            println!("  saturation.resets      {}", p.saturation_resets);
            println!("----------------------------------------------------------");
        }
        if want("cache") {
            println!("HOST CACHE");
            println!(
                "  demand accesses: {:<10} | hits: {:<10} | miss_rate: {:.2}%",
                c.accesses(),
                c.hits,
                c.miss_rate()
            );
            println!("  avg_latency            {:.2} ticks", c.avg_latency());
            println!("  pf.requests            {}", c.prefetch_requests);
            println!("  pf.fills               {}", c.prefetch_fills);
            println!("  pf.redundant           {}", c.prefetch_redundant);
            println!("  pf.dropped             {}", c.prefetch_dropped);
            println!("  pf.low_priority_fills  {}", c.low_priority_fills);
            println!(
                "  pf.useful              {} ({:.2}%)",
                c.useful_prefetches,
                c.prefetch_accuracy()
            );
            println!("  pf.late                {}", c.late_prefetches);
            println!("  pf.unused_evicted      {}", c.unused_prefetch_evictions);
        }
        println!("==========================================================");
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
