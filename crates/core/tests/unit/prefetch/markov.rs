//! Markov Prefetcher Tests.
//!
//! Exercises the assembled predictor through its two call-ins, against the
//! recording host fake and a `mockall` host:
//! - Learning from the access stream (sentinel, same-block filter, block keys).
//! - Issuing through the host (alignment, fill-priority hint, depth metadata).
//! - Saturation control and statistics.

use chainpf_core::MarkovPrefetcher;
use chainpf_core::config::{PrefetcherConfig, SaturationClock};
use chainpf_core::prefetch::Prefetcher;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;

use crate::common::harness::{Issued, RecordingHost, init_tracing, raw_config};
use crate::common::mocks::MockHost;

/// Feeds `addrs` through `on_access` without ticking.
fn feed(pf: &mut MarkovPrefetcher, host: &mut RecordingHost, addrs: &[u64]) {
    for &addr in addrs {
        pf.on_access(addr, host);
    }
}

// ══════════════════════════════════════════════════════════
// 1. Learning
// ══════════════════════════════════════════════════════════

/// The first access has no predecessor and records nothing.
#[test]
fn first_access_records_nothing() {
    let mut pf = MarkovPrefetcher::new(&PrefetcherConfig::default());
    let mut host = RecordingHost::new();

    pf.on_access(0x4000, &mut host);

    assert!(pf.table().is_empty());
    assert_eq!(pf.last_access(), Some(0x4000));
    assert_eq!(pf.stats().accesses, 1);
    assert_eq!(pf.stats().chains_seeded, 0);
}

/// Consecutive accesses become transitions.
#[test]
fn consecutive_accesses_are_recorded() {
    let mut pf = MarkovPrefetcher::new(&PrefetcherConfig::default());
    let mut host = RecordingHost::new();

    feed(&mut pf, &mut host, &[0x1000, 0x2000, 0x1000, 0x2000]);

    assert_eq!(pf.table().confidence(0x1000, 0x2000), Some(2));
    assert_eq!(pf.table().confidence(0x2000, 0x1000), Some(1));
    assert_eq!(pf.stats().transitions_recorded, 3);
}

/// Same-block transitions are skipped when filtering is on.
#[test]
fn same_block_transition_is_filtered() {
    let mut pf = MarkovPrefetcher::new(&PrefetcherConfig::default());
    let mut host = RecordingHost::new();

    feed(&mut pf, &mut host, &[0x1000, 0x1008, 0x1030]);

    assert!(pf.table().is_empty());
    assert_eq!(pf.stats().transitions_filtered, 2);
    assert_eq!(pf.last_access(), Some(0x1030));
}

/// With filtering off, same-block transitions are learned.
#[test]
fn same_block_transition_kept_without_filter() {
    let mut pf = MarkovPrefetcher::new(&raw_config());
    let mut host = RecordingHost::new();

    feed(&mut pf, &mut host, &[0x1000, 0x1008]);

    assert_eq!(pf.table().confidence(0x1000, 0x1008), Some(1));
}

/// Block-granular training keys the table by block base.
#[test]
fn train_on_blocks_uses_block_keys() {
    let mut config = PrefetcherConfig::default();
    config.train_on_blocks = true;
    let mut pf = MarkovPrefetcher::new(&config);
    let mut host = RecordingHost::new();

    feed(&mut pf, &mut host, &[0x1004, 0x2038, 0x1010, 0x2000]);

    assert_eq!(pf.table().confidence(0x1000, 0x2000), Some(2));
    assert_eq!(pf.table().confidence(0x2000, 0x1000), Some(1));
}

// ══════════════════════════════════════════════════════════
// 2. Issuing
// ══════════════════════════════════════════════════════════

/// Single-cursor mode issues every step with its depth, ignoring triggers while busy.
#[test]
fn single_chain_walks_learned_sequence() {
    init_tracing();
    let mut config = PrefetcherConfig::single_chain();
    config.saturation.enabled = false;
    let mut pf = MarkovPrefetcher::new(&config);
    let mut host = RecordingHost::new();

    feed(&mut pf, &mut host, &[0x100, 0x200, 0x300, 0x400]);
    for _ in 0..5 {
        pf.on_tick(&mut host);
    }

    assert_eq!(
        host.issued,
        vec![
            Issued {
                addr: 0x300,
                fill_hint: true,
                depth: 1
            },
            Issued {
                addr: 0x400,
                fill_hint: true,
                depth: 2
            },
        ]
    );
    let stats = pf.stats();
    assert_eq!(stats.chains_seeded, 1);
    assert_eq!(stats.seeds_ignored, 2);
    assert_eq!(stats.terminated_dead_end, 1);
    assert_eq!(stats.prefetches_accepted, 2);
}

/// A single chain stops issuing once its degree is spent.
#[test]
fn single_chain_issues_exactly_degree_requests() {
    let mut config = PrefetcherConfig::single_chain();
    config.degree = 2;
    config.saturation.enabled = false;
    let mut pf = MarkovPrefetcher::new(&config);
    let mut host = RecordingHost::new();

    feed(
        &mut pf,
        &mut host,
        &[0x100, 0x200, 0x300, 0x400, 0x500, 0x600, 0x700, 0x800],
    );
    for _ in 0..20 {
        pf.on_tick(&mut host);
    }

    assert_eq!(host.addrs(), vec![0x300, 0x400]);
    assert_eq!(pf.stats().prefetches_issued, 2);
    assert_eq!(pf.stats().terminated_degree, 1);
    assert!(pf.lookahead().is_empty());
}

/// Queued mode issues the last node in reach, block aligned, at its depth.
#[test]
fn queued_mode_issues_aligned_terminal() {
    init_tracing();
    let mut config = PrefetcherConfig::default();
    config.degree = 1;
    config.confidence_threshold = 0;
    let mut pf = MarkovPrefetcher::new(&config);
    let mut host = RecordingHost::new();

    feed(&mut pf, &mut host, &[0x1010, 0x2020]);
    pf.on_tick(&mut host);
    // The chain rooted at 0x2020 had nowhere to go.
    assert!(host.issued.is_empty());

    pf.on_access(0x1010, &mut host);
    for _ in 0..3 {
        pf.on_tick(&mut host);
    }

    assert_eq!(
        host.issued,
        vec![Issued {
            addr: 0x2000,
            fill_hint: true,
            depth: 1
        }]
    );
    assert_eq!(pf.stats().terminated_dead_end, 1);
    assert_eq!(pf.stats().terminated_degree, 1);
}

/// Freshly learned transitions sit under the default threshold and issue nothing.
#[test]
fn fresh_transitions_stay_below_threshold() {
    let mut pf = MarkovPrefetcher::new(&PrefetcherConfig::default());
    let mut host = RecordingHost::new();
    feed(&mut pf, &mut host, &[0x1000, 0x2000, 0x1000]);

    pf.on_tick(&mut host);

    assert!(host.issued.is_empty());
    assert_eq!(pf.stats().candidates, 2);
    assert_eq!(pf.stats().terminated_low_confidence, 2);
    assert_eq!(pf.stats().prefetches_issued, 0);
}

/// Pressure at or above the threshold drops the fill-priority hint.
#[test]
fn high_pressure_clears_fill_hint() {
    let mut config = PrefetcherConfig::default();
    config.confidence_threshold = 0;
    let mut pf = MarkovPrefetcher::new(&config);
    let mut host = RecordingHost::new();
    feed(&mut pf, &mut host, &[0x1000, 0x2000, 0x1000]);

    host.pressure = 0.95;
    for _ in 0..5 {
        pf.on_tick(&mut host);
    }

    assert!(!host.issued.is_empty());
    assert!(host.issued.iter().all(|i| !i.fill_hint));
    assert_eq!(pf.stats().low_priority_requests, host.issued.len() as u64);
}

/// Rejected requests are counted, and the single chain stays put to retry.
#[test]
fn rejected_requests_are_counted() {
    let mut pf = MarkovPrefetcher::new(&PrefetcherConfig::single_chain());
    let mut host = RecordingHost::new();
    host.accept = false;
    feed(&mut pf, &mut host, &[0x1000, 0x2000, 0x1000]);

    pf.on_tick(&mut host);

    let stats = pf.stats();
    assert_eq!(stats.prefetches_issued, 1);
    assert_eq!(stats.prefetches_rejected, 1);
    assert_eq!(stats.prefetches_accepted, 0);
    assert_eq!(pf.lookahead().cursors()[0].address, 0x2000);
}

/// Requests reach the host through the interface with alignment, hint and depth.
#[test]
fn host_receives_expected_requests() {
    let mut host = MockHost::new();
    let _ = host.expect_block_align().returning(|addr| addr & !0x3f);
    let _ = host.expect_resource_pressure().return_const(0.25);
    let _ = host
        .expect_issue_prefetch()
        .with(eq(0x1000), eq(true), eq(1))
        .times(1)
        .return_const(true);
    let _ = host
        .expect_issue_prefetch()
        .with(eq(0x2000), eq(true), eq(1))
        .times(1)
        .return_const(true);

    let mut config = PrefetcherConfig::default();
    config.degree = 1;
    config.confidence_threshold = 0;
    let mut pf = MarkovPrefetcher::new(&config);
    for addr in [0x1000, 0x2000, 0x1000] {
        pf.on_access(addr, &mut host);
    }

    // Chains rooted at 0x2000 and 0x1000 each take one step, then issue it.
    assert_eq!(pf.lookahead().len(), 2);
    pf.on_tick(&mut host);
    assert_eq!(pf.lookahead().len(), 2);
    pf.on_tick(&mut host);
    assert!(pf.lookahead().is_empty());
}

/// The prefetcher never touches the host during `on_access` unless a chain overflows.
#[test]
fn access_alone_issues_nothing() {
    let mut host = MockHost::new();
    let _ = host.expect_issue_prefetch().never();

    let mut pf = MarkovPrefetcher::new(&PrefetcherConfig::default());
    for addr in [0x1000, 0x2000, 0x3000, 0x1000] {
        pf.on_access(addr, &mut host);
    }
    assert_eq!(pf.stats().chains_seeded, 3);
}

// ══════════════════════════════════════════════════════════
// 3. Saturation control
// ══════════════════════════════════════════════════════════

/// After exactly `confidence_max` ticks all confidences are zero.
#[test]
fn saturation_resets_after_confidence_max_ticks() {
    init_tracing();
    let config = PrefetcherConfig::default();
    let mut pf = MarkovPrefetcher::new(&config);
    let mut host = RecordingHost::new();
    feed(&mut pf, &mut host, &[0x1000, 0x2000, 0x1000, 0x2000]);

    for _ in 0..config.confidence_max - 1 {
        pf.on_tick(&mut host);
    }
    assert_eq!(pf.table().confidence(0x1000, 0x2000), Some(2));
    assert_eq!(pf.stats().saturation_resets, 0);

    pf.on_tick(&mut host);

    assert!(
        pf.table()
            .iter()
            .all(|(_, list)| list.iter().all(|e| e.confidence == 0))
    );
    assert_eq!(pf.table().transition_count(), 2);
    assert_eq!(pf.stats().saturation_resets, 1);
    assert_eq!(pf.saturation().counter(), 0);
}

/// A reset restores carried confidence of chains still in flight.
#[test]
fn saturation_reset_neutralises_in_flight_chains() {
    let mut config = raw_config();
    config.saturation.enabled = true;
    config.saturation.period = Some(2);
    config.confidence_threshold = 0;
    config.degree = 20;
    let mut pf = MarkovPrefetcher::new(&config);
    let mut host = RecordingHost::unaligned();

    // Ring 1 -> 2 -> 3 -> 1 with confidence 500 on every edge.
    for _ in 0..500 {
        feed(&mut pf, &mut host, &[1, 2, 3]);
    }
    pf.on_tick(&mut host);
    assert!(
        pf.lookahead()
            .cursors()
            .iter()
            .any(|c| c.carried_confidence < config.confidence_max)
    );

    pf.on_tick(&mut host);

    assert_eq!(pf.stats().saturation_resets, 1);
    assert!(
        pf.lookahead()
            .cursors()
            .iter()
            .all(|c| c.carried_confidence == config.confidence_max)
    );
}

/// With the issue clock, resets count issue attempts instead of ticks.
#[test]
fn issue_clock_counts_requests() {
    let mut config = PrefetcherConfig::default();
    config.degree = 1;
    config.confidence_threshold = 0;
    config.saturation.clock = SaturationClock::Issue;
    config.saturation.period = Some(2);
    let mut pf = MarkovPrefetcher::new(&config);
    let mut host = RecordingHost::new();
    feed(&mut pf, &mut host, &[0x1000, 0x2000, 0x3000, 0x4000]);

    for _ in 0..10 {
        pf.on_tick(&mut host);
    }

    assert_eq!(pf.stats().prefetches_issued, 2);
    assert_eq!(pf.stats().saturation_resets, 1);
}
