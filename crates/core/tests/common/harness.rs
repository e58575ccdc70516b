//! Recording fakes and setup helpers.
//!
//! `RecordingHost` stands in for a cache: it aligns to a fixed block size,
//! reports a settable pressure, accepts or rejects every request, and keeps
//! everything it was asked to prefetch. `RecordingSink` does the same for
//! the lookahead scheduler on its own.

use chainpf_core::config::PrefetcherConfig;
use chainpf_core::prefetch::lookahead::ChainSink;
use chainpf_core::prefetch::{IssueRequest, LookaheadCursor, PrefetchHost, TerminationReason};

/// Installs a test-writer tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// One request seen by [`RecordingHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Issued {
    pub addr: u64,
    pub fill_hint: bool,
    pub depth: u32,
}

/// Host fake that records every prefetch.
#[derive(Debug, Clone)]
pub struct RecordingHost {
    pub block_bytes: u64,
    pub pressure: f64,
    pub accept: bool,
    pub issued: Vec<Issued>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHost {
    /// 64-byte blocks, zero pressure, accepts everything.
    pub fn new() -> Self {
        Self {
            block_bytes: 64,
            pressure: 0.0,
            accept: true,
            issued: Vec::new(),
        }
    }

    /// Identity alignment, for tests that use small unaligned addresses.
    pub fn unaligned() -> Self {
        Self {
            block_bytes: 1,
            ..Self::new()
        }
    }

    /// Addresses issued so far, in order.
    pub fn addrs(&self) -> Vec<u64> {
        self.issued.iter().map(|i| i.addr).collect()
    }
}

impl PrefetchHost for RecordingHost {
    fn block_align(&self, addr: u64) -> u64 {
        addr & !(self.block_bytes - 1)
    }

    fn resource_pressure(&self) -> f64 {
        self.pressure
    }

    fn issue_prefetch(&mut self, addr: u64, fill_priority_hint: bool, metadata: u32) -> bool {
        self.issued.push(Issued {
            addr,
            fill_hint: fill_priority_hint,
            depth: metadata,
        });
        self.accept
    }
}

/// Scheduler sink that records requests, candidates and terminations.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub accept: bool,
    pub requests: Vec<IssueRequest>,
    pub candidates: Vec<u64>,
    pub terminations: Vec<(u64, TerminationReason)>,
}

impl RecordingSink {
    /// A sink that accepts every request.
    pub fn accepting() -> Self {
        Self {
            accept: true,
            ..Self::default()
        }
    }

    /// Addresses requested so far, in order.
    pub fn addrs(&self) -> Vec<u64> {
        self.requests.iter().map(|r| r.address).collect()
    }
}

impl ChainSink for RecordingSink {
    fn issue(&mut self, request: IssueRequest) -> bool {
        self.requests.push(request);
        self.accept
    }

    fn candidate(&mut self, address: u64) {
        self.candidates.push(address);
    }

    fn chain_terminated(&mut self, cursor: &LookaheadCursor, reason: TerminationReason) {
        self.terminations.push((cursor.root, reason));
    }
}

/// Predictor config with raw addresses: no same-block filter, no saturation.
///
/// Lets tests use small literal addresses like `1`, `2`, `3`.
pub fn raw_config() -> PrefetcherConfig {
    let mut config = PrefetcherConfig::default();
    config.filter_same_block = false;
    config.saturation.enabled = false;
    config
}
