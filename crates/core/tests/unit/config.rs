//! # Configuration Tests
//!
//! Verifies defaults, presets, validation and JSON loading.

use std::io::Write;

use chainpf_core::common::ConfigError;
use chainpf_core::config::{
    CacheConfig, Config, DecayPolicy, EvictionTieBreak, LookaheadMode, PrefetcherConfig,
    SaturationClock,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::NamedTempFile;

// ══════════════════════════════════════════════════════════
// 1. Defaults and presets
// ══════════════════════════════════════════════════════════

/// Default predictor values.
#[test]
fn prefetcher_defaults() {
    let c = PrefetcherConfig::default();
    assert_eq!(c.mode, LookaheadMode::Queued);
    assert_eq!(c.successors_per_source, 4);
    assert_eq!(c.confidence_max, 1000);
    assert_eq!(c.initial_confidence, 1);
    assert_eq!(c.degree, 3);
    assert_eq!(c.confidence_threshold, 100);
    assert_eq!(c.queue_size, 16);
    assert!(!c.prefetch_intermediate);
    assert!(c.filter_same_block);
    assert_eq!(c.block_bytes, 64);
    assert!(!c.train_on_blocks);
    assert_eq!(c.eviction_tie_break, EvictionTieBreak::Newest);
    assert_eq!(c.decay, DecayPolicy::Multiplicative);
    assert!((c.fill_pressure_threshold - 0.9).abs() < f64::EPSILON);
    assert_eq!(c.saturation.clock, SaturationClock::Tick);
    assert_eq!(c.saturation_period(), Some(1000));
}

/// The single-chain preset.
#[test]
fn single_chain_preset() {
    let c = PrefetcherConfig::single_chain();
    assert_eq!(c.mode, LookaheadMode::Single);
    assert_eq!(c.degree, 10);
    assert_eq!(c.confidence_threshold, 0);
    assert_eq!(c.decay, DecayPolicy::None);
    assert!(c.validate().is_ok());
}

/// The queued preset is the default.
#[test]
fn queued_preset_is_default() {
    assert_eq!(PrefetcherConfig::queued_chains(), PrefetcherConfig::default());
}

/// Default cache geometry.
#[test]
fn cache_defaults() {
    let c = CacheConfig::default();
    assert_eq!(c.size_bytes, 32 * 1024);
    assert_eq!(c.num_sets(), 64);
    assert!(c.prefetch_enabled);
    assert!(Config::default().validate().is_ok());
}

// ══════════════════════════════════════════════════════════
// 2. Validation
// ══════════════════════════════════════════════════════════

/// Each bad predictor field is reported by name.
#[rstest]
#[case::zero_k(|c: &mut PrefetcherConfig| c.successors_per_source = 0, "prefetcher.successors_per_source")]
#[case::zero_max(|c: &mut PrefetcherConfig| c.confidence_max = 0, "prefetcher.confidence_max")]
#[case::initial_over_max(|c: &mut PrefetcherConfig| c.initial_confidence = 1001, "prefetcher.initial_confidence")]
#[case::threshold_over_max(|c: &mut PrefetcherConfig| c.confidence_threshold = 2000, "prefetcher.confidence_threshold")]
#[case::empty_queue(|c: &mut PrefetcherConfig| c.queue_size = 0, "prefetcher.queue_size")]
#[case::odd_block(|c: &mut PrefetcherConfig| c.block_bytes = 48, "prefetcher.block_bytes")]
#[case::pressure_range(|c: &mut PrefetcherConfig| c.fill_pressure_threshold = 1.5, "prefetcher.fill_pressure_threshold")]
#[case::zero_period(|c: &mut PrefetcherConfig| c.saturation.period = Some(0), "prefetcher.saturation.period")]
fn invalid_prefetcher_field(
    #[case] mutate: fn(&mut PrefetcherConfig),
    #[case] expected: &str,
) {
    let mut c = PrefetcherConfig::default();
    mutate(&mut c);
    match c.validate() {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
        other => panic!("expected invalid {expected}, got {other:?}"),
    }
}

/// An empty queue is fine in single-cursor mode.
#[test]
fn single_mode_ignores_queue_size() {
    let mut c = PrefetcherConfig::single_chain();
    c.queue_size = 0;
    assert!(c.validate().is_ok());
}

/// Each bad cache field is reported by name.
#[rstest]
#[case::line(|c: &mut CacheConfig| c.line_bytes = 100, "cache.line_bytes")]
#[case::ways(|c: &mut CacheConfig| c.ways = 0, "cache.ways")]
#[case::mshr(|c: &mut CacheConfig| c.mshr_entries = 0, "cache.mshr_entries")]
#[case::size(|c: &mut CacheConfig| c.size_bytes = 1000, "cache.size_bytes")]
fn invalid_cache_field(#[case] mutate: fn(&mut CacheConfig), #[case] expected: &str) {
    let mut c = CacheConfig::default();
    mutate(&mut c);
    match c.validate() {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
        other => panic!("expected invalid {expected}, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════
// 3. JSON
// ══════════════════════════════════════════════════════════

/// Missing fields fall back to their defaults.
#[test]
fn partial_json_uses_defaults() {
    let json = r#"{
        "prefetcher": {
            "mode": "Single",
            "eviction_tie_break": "Oldest",
            "saturation": { "clock": "Issue", "period": 250 }
        },
        "sim": { "drain_ticks": 64 }
    }"#;

    let c = Config::from_json_str(json).unwrap();

    assert_eq!(c.prefetcher.mode, LookaheadMode::Single);
    assert_eq!(c.prefetcher.eviction_tie_break, EvictionTieBreak::Oldest);
    assert_eq!(c.prefetcher.saturation_period(), Some(250));
    assert_eq!(c.prefetcher.saturation.clock, SaturationClock::Issue);
    assert!(c.prefetcher.saturation.enabled);
    assert_eq!(c.prefetcher.queue_size, 16);
    assert_eq!(c.cache, CacheConfig::default());
    assert_eq!(c.sim.drain_ticks, 64);
    assert_eq!(c.sim.ticks_per_access, 1);
}

/// An empty object is the default configuration.
#[test]
fn empty_json_is_default() {
    assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
}

/// The default configuration survives a trip through JSON.
#[test]
fn default_config_serializes() {
    let json = serde_json::to_string(&Config::default()).unwrap();
    assert_eq!(Config::from_json_str(&json).unwrap(), Config::default());
}

/// Malformed JSON and out-of-range values are distinguished.
#[test]
fn json_errors_are_classified() {
    assert!(matches!(
        Config::from_json_str("{ not json"),
        Err(ConfigError::Json(_))
    ));
    assert!(matches!(
        Config::from_json_str(r#"{ "prefetcher": { "mode": "Sideways" } }"#),
        Err(ConfigError::Json(_))
    ));
    assert!(matches!(
        Config::from_json_str(r#"{ "cache": { "ways": 0 } }"#),
        Err(ConfigError::Invalid {
            field: "cache.ways",
            ..
        })
    ));
}

/// Config files load from disk.
#[test]
fn loads_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(br#"{ "prefetcher": { "degree": 7 } }"#)
        .unwrap();
    file.flush().unwrap();

    let c = Config::from_json_file(file.path()).unwrap();
    assert_eq!(c.prefetcher.degree, 7);
}

/// A missing file reports its path.
#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    match Config::from_json_file(&path) {
        Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
}
