use crate::advisor::CacheSizeAdvisor;
use crate::cache::{AccessOutcome, GenericSimulator};
use crate::config::{CacheGeometry, PolicyConfig, SimConfig};
use crate::error::{ConfigError, TraceError};
use crate::eviction::TreePseudoLru;
use crate::generators;
use crate::reuse::{self, ReuseDistance};
use crate::trace::{self, AccessKind, TraceEntry, BINARY_RECORD_BYTES};
use crate::validate::{self, Mismatch};
use crate::working_set;

fn geometry(num_sets: u64, associativity: usize, block_size: u64) -> CacheGeometry {
    CacheGeometry::new(num_sets, associativity, block_size).unwrap()
}

fn simulator(policy: PolicyConfig, geometry: CacheGeometry) -> GenericSimulator {
    GenericSimulator::build(geometry, policy, Some(7)).unwrap()
}

fn hit_sequence(policy: PolicyConfig, geometry: CacheGeometry, addresses: &[u64]) -> Vec<bool> {
    let mut sim = simulator(policy, geometry);
    addresses.iter().map(|&a| sim.access(a).is_hit()).collect()
}

fn zipf_addresses() -> Vec<u64> {
    let entries = generators::zipf(512, 1.2, 64, 2000, 1.0, 11).unwrap();
    trace::addresses(&entries)
}

#[test]
fn every_access_is_counted_for_every_policy() {
    let addresses = zipf_addresses();
    for policy in [
        PolicyConfig::LeastRecentlyUsed,
        PolicyConfig::FirstInFirstOut,
        PolicyConfig::Random,
        PolicyConfig::PseudoLru,
    ] {
        let mut sim = simulator(policy, geometry(16, 4, 64));
        for &address in &addresses {
            sim.access(address);
        }
        assert_eq!(sim.hits() + sim.misses(), addresses.len() as u64);
        let rate = sim.hit_rate();
        assert!((0.0..=1.0).contains(&rate), "hit rate {rate} out of range");
    }
}

#[test]
fn pristine_lru_set_evicts_way_zero_first() {
    let mut sim = simulator(PolicyConfig::LeastRecentlyUsed, geometry(1, 4, 64));
    match sim.access(0x1000) {
        AccessOutcome::Miss { way, evicted, .. } => {
            assert_eq!(way, 0);
            assert_eq!(evicted, None);
        }
        outcome => panic!("expected a cold miss, got {outcome:?}"),
    }
}

#[test]
fn hand_traced_four_way_lru_sequence() {
    // 1 set of 4 ways over 64-byte blocks: the fifth access hits way 0, the
    // sixth displaces the least recently used block (block 1, way 1), so the
    // seventh access to block 1 misses again.
    let addresses = [0x0000, 0x0040, 0x0080, 0x00C0, 0x0000, 0x0100, 0x0040];
    let mut sim = simulator(PolicyConfig::LeastRecentlyUsed, geometry(1, 4, 64));
    let outcomes: Vec<AccessOutcome> = addresses.iter().map(|&a| sim.access(a)).collect();

    let hits: Vec<bool> = outcomes.iter().map(AccessOutcome::is_hit).collect();
    assert_eq!(hits, [false, false, false, false, true, false, false]);
    assert_eq!(outcomes[4].way(), 0);
    assert_eq!(outcomes[5].way(), 1);
    assert_eq!(outcomes[5].evicted(), Some(1));
    assert_eq!(outcomes[6].way(), 2);
    assert_eq!(sim.hits(), 1);
    assert_eq!(sim.misses(), 6);
}

#[test]
fn lru_matches_fifo_when_no_block_repeats() {
    // Pure compulsory misses: recency order and insertion order coincide.
    let entries = generators::sequential(0, 64, 40, 1.0, 0).unwrap();
    let addresses = trace::addresses(&entries);
    for geom in [geometry(4, 2, 64), geometry(1, 8, 64), geometry(8, 1, 64)] {
        let lru = hit_sequence(PolicyConfig::LeastRecentlyUsed, geom, &addresses);
        let fifo = hit_sequence(PolicyConfig::FirstInFirstOut, geom, &addresses);
        assert_eq!(lru, fifo);
    }
}

#[test]
fn fifo_rotation_ignores_hits() {
    // 2-way set: the hit on block 0 must not move the victim pointer, so the
    // next miss still takes way 0 and the one after it way 1.
    let addresses = [0x00, 0x40, 0x00, 0x80, 0x00];
    let mut sim = simulator(PolicyConfig::FirstInFirstOut, geometry(1, 2, 64));
    let outcomes: Vec<AccessOutcome> = addresses.iter().map(|&a| sim.access(a)).collect();

    let hits: Vec<bool> = outcomes.iter().map(AccessOutcome::is_hit).collect();
    assert_eq!(hits, [false, false, true, false, false]);
    assert_eq!(outcomes[3].way(), 0);
    assert_eq!(outcomes[3].evicted(), Some(0));
    assert_eq!(outcomes[4].way(), 1);
    assert_eq!(outcomes[4].evicted(), Some(1));
}

#[test]
fn pseudo_lru_requires_power_of_two_ways() {
    for ways in [3, 5, 6] {
        assert!(TreePseudoLru::new(ways).is_err());
        assert!(matches!(
            GenericSimulator::build(geometry(4, ways, 64), PolicyConfig::PseudoLru, None),
            Err(ConfigError::PseudoLruAssociativity(_))
        ));
    }
    for ways in [1, 2, 4, 8, 16] {
        assert!(TreePseudoLru::new(ways).is_ok());
    }
}

#[test]
fn pseudo_lru_victim_follows_the_cold_subtree() {
    // With all tree bits cleared the fill order of a 4-way set is 0, 2, 1, 3.
    // Re-touching way 0 then flips the root toward the right half, so the
    // next victim is way 2.
    let mut sim = simulator(PolicyConfig::PseudoLru, geometry(1, 4, 64));
    let fills: Vec<usize> = [0x00, 0x40, 0x80, 0xC0]
        .iter()
        .map(|&a| sim.access(a).way())
        .collect();
    assert_eq!(fills, [0, 2, 1, 3]);

    assert_eq!(sim.access(0x00), AccessOutcome::Hit { set: 0, way: 0, tag: 0 });
    match sim.access(0x100) {
        AccessOutcome::Miss { way, evicted, .. } => {
            assert_eq!(way, 2);
            assert_eq!(evicted, Some(1));
        }
        outcome => panic!("expected a miss, got {outcome:?}"),
    }
}

#[test]
fn random_policy_replays_for_a_seed() {
    let entries = generators::uniform(1 << 16, 1000, 1.0, 3).unwrap();
    let addresses = trace::addresses(&entries);
    let geom = geometry(8, 4, 64);
    let first = hit_sequence(PolicyConfig::Random, geom, &addresses);
    let second = hit_sequence(PolicyConfig::Random, geom, &addresses);
    assert_eq!(first, second);
}

#[test]
fn reuse_distances_count_distinct_blocks_between_repeats() {
    let addresses = [0, 64, 0, 0, 128, 64];
    let expected = [
        ReuseDistance::Infinite,
        ReuseDistance::Infinite,
        ReuseDistance::Finite(1),
        ReuseDistance::Finite(0),
        ReuseDistance::Infinite,
        ReuseDistance::Finite(2),
    ];
    assert_eq!(reuse::compute(&addresses, 64).unwrap(), expected);
    assert_eq!(reuse::compute_naive(&addresses, 64).unwrap(), expected);
}

#[test]
fn fenwick_and_naive_reuse_agree() {
    for seed in 0..4 {
        let entries = generators::locality(1 << 10, 1 << 16, 0.8, 1500, 1.0, seed).unwrap();
        let addresses = trace::addresses(&entries);
        assert_eq!(
            reuse::compute(&addresses, 64).unwrap(),
            reuse::compute_naive(&addresses, 64).unwrap()
        );
    }
}

#[test]
fn reuse_prediction_matches_fully_associative_lru() {
    let addresses = zipf_addresses();
    let distances = reuse::compute(&addresses, 64).unwrap();
    for capacity in [1u64, 2, 3, 4, 8, 16, 64] {
        let mut sim = simulator(
            PolicyConfig::LeastRecentlyUsed,
            geometry(1, capacity as usize, 64),
        );
        for &address in &addresses {
            sim.access(address);
        }
        let predicted_hits = distances
            .iter()
            .filter(|d| d.predicts_hit(capacity))
            .count() as u64;
        assert_eq!(predicted_hits, sim.hits(), "capacity {capacity}");
        assert_eq!(
            reuse::predict_hit_rate(&distances, capacity),
            sim.hit_rate(),
            "capacity {capacity}"
        );
    }
}

#[test]
fn miss_rate_curve_never_increases() {
    let addresses = zipf_addresses();
    let distances = reuse::compute(&addresses, 64).unwrap();
    let curve = reuse::predict_miss_rate_curve(&distances, 128);
    assert_eq!(curve.len(), 128);
    for window in curve.windows(2) {
        assert!(
            window[1].1 <= window[0].1,
            "miss rate rose from {:?} to {:?}",
            window[0],
            window[1]
        );
    }
}

#[test]
fn distance_histogram_accounts_for_every_access() {
    let addresses = zipf_addresses();
    let distances = reuse::compute(&addresses, 64).unwrap();
    let histogram = reuse::histogram(&distances, 32);
    let total =
        histogram.counts.iter().sum::<u64>() + histogram.overflow + histogram.first_references;
    assert_eq!(total, addresses.len() as u64);
}

#[test]
fn empty_trace_defaults_to_zero_hit_rate() {
    let sim = simulator(PolicyConfig::LeastRecentlyUsed, geometry(4, 2, 64));
    assert_eq!(sim.hit_rate(), 0.0);
    assert_eq!(reuse::predict_hit_rate(&[], 8), 0.0);
    for (_, miss_rate) in reuse::predict_miss_rate_curve(&[], 8) {
        assert_eq!(miss_rate, 1.0);
    }
}

#[test]
fn working_set_window_spanning_trace_counts_distinct_blocks() {
    let addresses = zipf_addresses();
    let counts = working_set::sliding_distinct_counts(&addresses, addresses.len(), 64).unwrap();
    assert_eq!(counts, [working_set::distinct_blocks(&addresses, 64).unwrap()]);
}

#[test]
fn working_set_emits_one_count_per_slide() {
    let addresses = [0, 64, 0, 128, 192];
    let counts = working_set::sliding_distinct_counts(&addresses, 3, 64).unwrap();
    assert_eq!(counts, [2, 3, 3]);
}

#[test]
fn working_set_short_trace_collapses_to_whole_trace_count() {
    let counts = working_set::sliding_distinct_counts(&[0, 64, 0], 10, 64).unwrap();
    assert_eq!(counts, [2]);
}

#[test]
fn working_set_rejects_empty_window() {
    assert!(matches!(
        working_set::sliding_distinct_counts(&[0, 64], 0, 64),
        Err(ConfigError::ZeroWindow)
    ));
}

#[test]
fn advisor_zero_target_returns_the_minimum_size() {
    let advisor = CacheSizeAdvisor::from_trace(&zipf_addresses(), 64).unwrap();
    assert_eq!(advisor.minimal_size_for_hit_rate(0.0, 1024), 1);
}

#[test]
fn advisor_saturates_on_an_unattainable_target() {
    // Every trace has at least one first reference, so a full hit rate is
    // out of reach at any size.
    let advisor = CacheSizeAdvisor::from_trace(&zipf_addresses(), 64).unwrap();
    assert_eq!(advisor.minimal_size_for_hit_rate(1.0, 1024), 1024);
}

#[test]
fn advisor_agrees_with_direct_simulation() {
    let addresses = zipf_addresses();
    let advisor = CacheSizeAdvisor::from_trace(&addresses, 64).unwrap();
    let target = 0.6;
    let max_size = 64u64;

    let mut simulated = max_size;
    for capacity in 1..=max_size {
        let mut sim = simulator(
            PolicyConfig::LeastRecentlyUsed,
            geometry(1, capacity as usize, 64),
        );
        for &address in &addresses {
            sim.access(address);
        }
        if sim.hit_rate() >= target {
            simulated = capacity;
            break;
        }
    }
    assert_eq!(advisor.minimal_size_for_hit_rate(target, max_size), simulated);
}

#[test]
fn identical_runs_validate_cleanly() {
    let addresses = zipf_addresses();
    let geom = geometry(4, 4, 64);
    let expected = validate::capture(
        &mut simulator(PolicyConfig::LeastRecentlyUsed, geom),
        &addresses,
    );
    let actual = validate::capture(
        &mut simulator(PolicyConfig::LeastRecentlyUsed, geom),
        &addresses,
    );
    let report = validate::compare(&expected, &actual);
    assert!(report.passed);
    assert!(report.mismatches.is_empty());
    assert_eq!(report.expected, report.actual);
}

#[test]
fn comparison_flags_outcome_and_length_mismatches() {
    let addresses = [0x0000, 0x0040, 0x0080, 0x00C0, 0x0000, 0x0100, 0x0040];
    let expected = validate::capture(
        &mut simulator(PolicyConfig::LeastRecentlyUsed, geometry(1, 4, 64)),
        &addresses,
    );
    let mut actual = expected.clone();
    actual[4].hit = false;
    actual.pop();

    let report = validate::compare(&expected, &actual);
    assert!(!report.passed);
    assert_eq!(report.mismatches.len(), 2);
    assert_eq!(
        report.mismatches[0],
        Mismatch::Outcome {
            index: 4,
            address: 0x0000,
            expected_hit: true,
            actual_hit: false,
        }
    );
    assert_eq!(
        report.mismatches[1],
        Mismatch::Length {
            expected: 7,
            actual: 6,
        }
    );

    let rendered = validate::render_report(&expected, &actual, &report);
    assert!(rendered.contains("VALIDATION FAILED"));
    assert!(rendered.contains("MISMATCH"));
    assert!(rendered.contains("N/A"));
}

#[test]
fn results_log_round_trips_through_the_parser() {
    let addresses = [0x0000, 0x0040, 0x0080, 0x00C0, 0x0000, 0x0100, 0x0040];
    let expected = validate::capture(
        &mut simulator(PolicyConfig::LeastRecentlyUsed, geometry(1, 4, 64)),
        &addresses,
    );
    let log = validate::render_results_log(&expected);
    let parsed = validate::parse_results_log(&log);

    assert_eq!(parsed.records, expected);
    assert!(validate::compare(&expected, &parsed.records).passed);

    let summary = validate::summarize(&expected);
    assert_eq!(parsed.summary.hits, summary.hits);
    assert_eq!(parsed.summary.misses, summary.misses);
    assert!((parsed.summary.hit_rate - summary.hit_rate).abs() < 1e-3);
}

#[test]
fn text_trace_accepts_hex_decimal_comments_and_kinds() {
    let input = "# warm-up\n\n0x40\n128\n0x80 WRITE\n256 READ 9\n";
    let entries = trace::parse_text(input, true).unwrap();
    assert_eq!(
        entries,
        [
            TraceEntry { address: 0x40, kind: AccessKind::Read, timestamp: 0 },
            TraceEntry { address: 128, kind: AccessKind::Read, timestamp: 1 },
            TraceEntry { address: 0x80, kind: AccessKind::Write, timestamp: 2 },
            TraceEntry { address: 256, kind: AccessKind::Read, timestamp: 9 },
        ]
    );
}

#[test]
fn lenient_parse_skips_what_strict_rejects() {
    let input = "0x40\nbogus entry\n0x80\n";
    let entries = trace::parse_text(input, false).unwrap();
    assert_eq!(trace::addresses(&entries), [0x40, 0x80]);

    match trace::parse_text(input, true) {
        Err(TraceError::MalformedEntry { line, content }) => {
            assert_eq!(line, 2);
            assert_eq!(content, "bogus entry");
        }
        other => panic!("expected a malformed-entry error, got {other:?}"),
    }
}

#[test]
fn binary_codec_rejects_truncation_and_unknown_kinds() {
    let entries = vec![
        TraceEntry { address: 0x40, kind: AccessKind::Read, timestamp: 0 },
        TraceEntry { address: u64::MAX, kind: AccessKind::Write, timestamp: 1 },
    ];
    let bytes = trace::to_binary(&entries);
    assert_eq!(bytes.len(), 2 * BINARY_RECORD_BYTES);
    assert_eq!(trace::from_binary(&bytes).unwrap(), entries);

    assert!(matches!(
        trace::from_binary(&bytes[..BINARY_RECORD_BYTES + 3]),
        Err(TraceError::TruncatedRecord(_))
    ));

    let mut corrupted = bytes;
    corrupted[8] = 7;
    assert!(matches!(
        trace::from_binary(&corrupted),
        Err(TraceError::UnknownKind { record: 0, value: 7 })
    ));
}

#[test]
fn csv_codec_matches_the_generator_interchange_format() {
    let entries = generators::sequential(0, 64, 3, 1.0, 0).unwrap();
    let bytes = trace::write_csv(&entries).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.starts_with("address,access_type,timestamp\n"));
    assert_eq!(trace::read_csv(&bytes).unwrap(), entries);
}

#[test]
fn config_document_derives_the_geometry_triple() {
    let document = r#"{
        "l1_cache": { "size_kb": 256, "block_size": 64, "associativity": 4 },
        "dram": { "banks": 8, "tRCD": 14, "tCAS": 14, "tRP": 14, "tRAS": 32 },
        "policy": "plru"
    }"#;
    let config: SimConfig = serde_json::from_str(document).unwrap();
    assert_eq!(config.policy, PolicyConfig::PseudoLru);
    let geom = config.geometry().unwrap();
    assert_eq!(geom.num_sets(), 1024);
    assert_eq!(geom.associativity(), 4);
    assert_eq!(geom.block_size(), 64);
    assert_eq!(geom.total_blocks(), 4096);
}

#[test]
fn config_policy_defaults_to_lru() {
    let document = r#"{
        "l1_cache": { "size_kb": 1, "block_size": 64, "associativity": 4 },
        "dram": { "banks": 1, "tRCD": 14, "tCAS": 14, "tRP": 14, "tRAS": 32 }
    }"#;
    let config: SimConfig = serde_json::from_str(document).unwrap();
    assert_eq!(config.policy, PolicyConfig::LeastRecentlyUsed);
    assert_eq!(config.geometry().unwrap().num_sets(), 4);
}

#[test]
fn invalid_cache_parameters_fail_before_simulation() {
    assert!(matches!(
        CacheGeometry::new(4, 2, 48),
        Err(ConfigError::BlockSize(48))
    ));
    assert!(matches!(
        CacheGeometry::new(4, 0, 64),
        Err(ConfigError::ZeroAssociativity)
    ));
    assert!(matches!(
        CacheGeometry::new(0, 2, 64),
        Err(ConfigError::ZeroSets)
    ));

    // 1 KiB of 64-byte blocks is 16 lines, which three ways do not divide.
    let document = r#"{
        "l1_cache": { "size_kb": 1, "block_size": 64, "associativity": 3 },
        "dram": { "banks": 8, "tRCD": 14, "tCAS": 14, "tRP": 14, "tRAS": 32 }
    }"#;
    let config: SimConfig = serde_json::from_str(document).unwrap();
    assert!(matches!(config.geometry(), Err(ConfigError::Geometry { .. })));
}

#[test]
fn generators_replay_for_a_seed() {
    let first = generators::zipf(256, 1.1, 64, 500, 0.7, 42).unwrap();
    let second = generators::zipf(256, 1.1, 64, 500, 0.7, 42).unwrap();
    assert_eq!(first, second);
}

#[test]
fn sequential_generator_emits_a_strided_ramp() {
    let entries = generators::sequential(0, 64, 4, 1.0, 0).unwrap();
    assert_eq!(trace::addresses(&entries), [0, 64, 128, 192]);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.timestamp, i as u64);
        assert_eq!(entry.kind, AccessKind::Read);
    }
}

#[test]
fn generator_parameters_are_validated() {
    assert!(generators::sequential(0, 0, 4, 1.0, 0).is_err());
    assert!(generators::uniform(0, 4, 1.0, 0).is_err());
    assert!(generators::locality(16, 8, 0.8, 4, 1.0, 0).is_err());
    assert!(generators::zipf(256, 1.1, 64, 4, 1.5, 0).is_err());
}
