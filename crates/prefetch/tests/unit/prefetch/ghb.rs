//! GHB Prefetcher Tests.
//!
//! Drives the assembled engine with synthetic access streams and checks the
//! emitted prefetch targets, tag handling, feedback integration, capacity
//! bounds and reset.

use ghbsim_core::Prefetcher;
use ghbsim_core::common::{Addr, ConfigError, InFlightTag};
use ghbsim_core::config::{FeedbackConfig, Granularity, PrefetchConfig};
use ghbsim_core::prefetch::{AccessInfo, FillInfo, GhbPrefetcher, OperatingPoint};
use ghbsim_core::stats::EngineStats;
use mockall::predicate::{always, eq};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{access, engine, feed, feedback_config, raw_config, targets};
use crate::common::mocks::MockHost;

const PC: u64 = 0x40_1000;

// ══════════════════════════════════════════════════════════
// 1. Stride detection through the engine
// ══════════════════════════════════════════════════════════

/// The third access of a constant-stride stream is the first trigger.
#[rstest]
#[case(4, 4)]
#[case(0, 1)]
#[case(2, 3)]
fn positive_stride_emits_from_third_access(#[case] lookahead: u64, #[case] degree: usize) {
    let mut pf = engine(&raw_config(lookahead, degree));
    let issued = feed(&mut pf, PC, &[100, 104, 108, 112]);

    let expect = |trigger: u64| -> Vec<u64> {
        (1..=degree as u64)
            .map(|i| trigger + (lookahead + i) * 4)
            .collect()
    };
    assert!(issued[0].is_empty());
    assert!(issued[1].is_empty());
    assert_eq!(issued[2], expect(108));
    assert_eq!(issued[3], expect(112));
}

#[test]
fn inconsistent_deltas_emit_nothing() {
    let mut pf = engine(&raw_config(4, 4));
    let issued = feed(&mut pf, PC, &[100, 105, 108]);
    assert!(issued.iter().all(Vec::is_empty));
    assert_eq!(pf.stats().predictions, 0);
}

#[test]
fn descending_stream_prefetches_downward() {
    let mut pf = engine(&raw_config(0, 2));
    let issued = feed(&mut pf, PC, &[0x2000, 0x1ff0, 0x1fe0]);
    assert_eq!(issued[2], vec![0x1fd0, 0x1fc0]);
}

/// Targets below address zero are dropped, not wrapped to the top of memory.
#[test]
fn descending_stream_stops_at_zero_raw() {
    let mut pf = engine(&feedback_config(3, 1000));
    let issued = feed(&mut pf, PC, &[8, 6, 4]);
    assert_eq!(issued[2], vec![2, 0]);
    assert_eq!(pf.stats().out_of_range, 2);
    assert_eq!(pf.controller().unwrap().counters().total_interval, 2);
}

#[test]
fn descending_stream_stops_at_zero_block() {
    let mut pf = engine(&PrefetchConfig {
        lookahead: 0,
        degree: 4,
        ..PrefetchConfig::default()
    });
    let issued = feed(&mut pf, PC, &[0xc0, 0x80, 0x40]);
    assert_eq!(issued[2], vec![0x0]);
    assert_eq!(pf.stats().out_of_range, 3);
    assert_eq!(pf.stats().issued, 1);
}

/// A block past the last addressable line is dropped even though its unit fits.
#[test]
fn ascending_stream_stops_at_top_of_memory() {
    let mut pf = engine(&PrefetchConfig {
        lookahead: 0,
        degree: 2,
        ..PrefetchConfig::default()
    });
    let top = u64::MAX & !63;
    let issued = feed(&mut pf, PC, &[top - 128, top - 64, top]);
    assert!(issued[2].is_empty());
    assert_eq!(pf.stats().out_of_range, 2);

    let mut raw = engine(&raw_config(0, 2));
    let issued = feed(&mut raw, PC, &[u64::MAX - 10, u64::MAX - 6, u64::MAX - 2]);
    assert!(issued[2].is_empty());
    assert_eq!(raw.stats().out_of_range, 2);
}

/// In block mode, accesses inside one line share a unit and targets are line starts.
#[test]
fn block_granularity_prefetches_line_starts() {
    let mut pf = engine(&PrefetchConfig {
        lookahead: 4,
        degree: 2,
        ..PrefetchConfig::default()
    });
    let issued = feed(&mut pf, PC, &[0x1008, 0x1048, 0x1088]);
    assert_eq!(issued[2], vec![0x1080 + 5 * 64, 0x1080 + 6 * 64]);
}

/// The raw-address example also holds with 4-byte blocks.
#[test]
fn block_granularity_with_small_blocks() {
    let mut pf = engine(&PrefetchConfig {
        block_bytes: 4,
        granularity: Granularity::Block,
        lookahead: 4,
        degree: 1,
        ..PrefetchConfig::default()
    });
    let issued = feed(&mut pf, PC, &[100, 104, 108]);
    assert_eq!(issued[2], vec![128]);
}

#[test]
fn zero_stride_suppressed_by_default() {
    let mut pf = engine(&raw_config(0, 2));
    let issued = feed(&mut pf, PC, &[0x500, 0x500, 0x500, 0x500]);
    assert!(issued.iter().all(Vec::is_empty));
    assert_eq!(pf.stats().zero_stride_suppressed, 2);
}

#[test]
fn zero_stride_emitted_when_enabled() {
    let mut pf = engine(&PrefetchConfig {
        emit_zero_stride: true,
        ..raw_config(0, 2)
    });
    let issued = feed(&mut pf, PC, &[0x500, 0x500, 0x500]);
    assert_eq!(issued[2], vec![0x500, 0x500]);
}

/// Two interleaved instructions each keep their own chain and stride.
#[test]
fn interleaved_pcs_are_isolated() {
    let mut pf = engine(&raw_config(0, 1));
    let (a, b) = (0x400, 0x800);
    let mut from_a = Vec::new();
    let mut from_b = Vec::new();
    for i in 0..4u64 {
        from_a.push(targets(&pf.observe(access(a, 0x1000 + 8 * i))));
        from_b.push(targets(&pf.observe(access(b, 0x9000 - 16 * i))));
    }
    assert_eq!(from_a[2], vec![0x1018]);
    assert_eq!(from_a[3], vec![0x1020]);
    assert_eq!(from_b[2], vec![0x9000 - 48]);
    assert_eq!(from_b[3], vec![0x9000 - 64]);
}

// ══════════════════════════════════════════════════════════
// 2. Host interface
// ══════════════════════════════════════════════════════════

/// The plain variant forwards the incoming tag and the fill-level flag.
#[test]
fn plain_variant_forwards_tag() {
    let mut pf = engine(&raw_config(0, 2));
    let _ = feed(&mut pf, PC, &[0x100, 0x140]);

    let mut host = MockHost::new();
    host.expect_issue_prefetch()
        .with(always(), eq(true), eq(InFlightTag::Outstanding))
        .times(2)
        .return_const(());
    let tag = pf.on_access(
        access(PC, 0x180).with_tag(InFlightTag::Outstanding),
        &mut host,
    );
    assert_eq!(tag, InFlightTag::Outstanding);
}

#[test]
fn fill_level_flag_is_configurable() {
    let mut pf = engine(&PrefetchConfig {
        fill_this_level: false,
        ..raw_config(0, 1)
    });
    let _ = feed(&mut pf, PC, &[0x100, 0x140]);

    let mut host = MockHost::new();
    host.expect_issue_prefetch()
        .with(eq(Addr(0x1c0)), eq(false), eq(InFlightTag::Idle))
        .times(1)
        .return_const(());
    let _ = pf.on_access(access(PC, 0x180), &mut host);
}

/// Feedback-directed prefetches are always marked outstanding.
#[test]
fn feedback_variant_marks_outstanding() {
    let mut pf = engine(&feedback_config(3, 1000));
    let _ = feed(&mut pf, PC, &[0x100, 0x101]);

    let mut host = MockHost::new();
    host.expect_issue_prefetch()
        .with(always(), eq(true), eq(InFlightTag::Outstanding))
        .times(4)
        .return_const(());
    let tag = pf.on_access(access(PC, 0x102), &mut host);
    assert_eq!(tag, InFlightTag::Idle);
}

#[test]
fn nothing_issued_without_history() {
    let mut pf = engine(&raw_config(4, 4));
    let mut host = MockHost::new();
    host.expect_issue_prefetch().never();
    let _ = pf.on_access(access(PC, 0x100), &mut host);
    let _ = pf.on_access(access(PC, 0x140), &mut host);
}

// ══════════════════════════════════════════════════════════
// 3. Feedback integration
// ══════════════════════════════════════════════════════════

/// Candidates farther than the level's distance are dropped.
#[test]
fn distance_bound_drops_far_candidates() {
    // Level 1: distance 4, degree 3. Stride 2 gives offsets 2, 4, 6.
    let mut pf = engine(&feedback_config(1, 1000));
    let issued = feed(&mut pf, PC, &[10, 12, 14]);
    assert_eq!(issued[2], vec![16, 18]);
    assert_eq!(pf.stats().distance_rejected, 1);
    assert_eq!(pf.controller().unwrap().counters().total_interval, 2);
}

#[test]
fn useful_and_late_signals_are_counted() {
    let mut pf = engine(&feedback_config(3, 1000));
    let _ = pf.observe(access(PC, 0x100).with_hit(true).with_useful(true));
    let _ = pf.observe(access(PC, 0x200).with_tag(InFlightTag::Outstanding));
    // A hit on an outstanding line is not late.
    let _ = pf.observe(
        access(PC, 0x300)
            .with_hit(true)
            .with_tag(InFlightTag::Outstanding),
    );

    let counters = pf.controller().unwrap().counters();
    assert_eq!(counters.useful_interval, 1);
    assert_eq!(counters.late_interval, 1);
}

#[test]
fn prefetch_fill_clears_tag() {
    let mut pf = engine(&feedback_config(3, 1000));
    let fill = FillInfo {
        addr: Addr(0x1000),
        was_prefetch: true,
        evicted: None,
        tag: InFlightTag::Outstanding,
    };
    assert_eq!(pf.on_fill(fill), InFlightTag::Idle);

    let demand = FillInfo {
        was_prefetch: false,
        ..fill
    };
    assert_eq!(pf.on_fill(demand), InFlightTag::Outstanding);
}

#[test]
fn plain_variant_ignores_fills() {
    let mut pf = engine(&raw_config(4, 4));
    let fill = FillInfo {
        addr: Addr(0x1000),
        was_prefetch: true,
        evicted: Some(Addr(0x8000)),
        tag: InFlightTag::Outstanding,
    };
    assert_eq!(pf.on_fill(fill), InFlightTag::Outstanding);
    assert_eq!(pf.stats().intervals, 0);
}

/// Only fills that evict something advance the interval.
#[test]
fn evicting_fills_drive_intervals() {
    let mut pf = engine(&feedback_config(3, 2));
    let quiet = FillInfo {
        addr: Addr(0x40),
        was_prefetch: false,
        evicted: None,
        tag: InFlightTag::Idle,
    };
    let evicting = FillInfo {
        evicted: Some(Addr(0x80)),
        ..quiet
    };

    let _ = pf.on_fill(quiet);
    let _ = pf.on_fill(evicting);
    assert_eq!(pf.controller().unwrap().counters().eviction_count, 1);
    let _ = pf.on_fill(quiet);
    let _ = pf.on_fill(evicting);
    assert_eq!(pf.stats().intervals, 1);
    assert_eq!(pf.controller().unwrap().counters().eviction_count, 0);
}

/// Late, accurate prefetching raises the level, and the engine picks up the new degree.
#[test]
fn level_change_updates_degree() {
    let mut pf = engine(&feedback_config(3, 1));
    assert_eq!(pf.degree(), 4);

    // Stride 1 at level 3 (distance 16): four triggers, four prefetches each,
    // plus one more trigger on the first access to 6. Repeats of 6 are zero strides.
    let _ = feed(&mut pf, PC, &[0, 1, 2, 3, 4, 5]);
    for _ in 0..20 {
        let _ = pf.observe(access(PC, 6).with_hit(true).with_useful(true));
    }
    assert_eq!(pf.controller().unwrap().counters().total_interval, 20);
    for _ in 0..4 {
        let _ = pf.observe(access(PC, 7).with_tag(InFlightTag::Outstanding));
    }
    let _ = pf.on_fill(FillInfo {
        addr: Addr(0),
        was_prefetch: true,
        evicted: Some(Addr(0x100)),
        tag: InFlightTag::Outstanding,
    });

    assert_eq!(
        pf.operating_point(),
        Some(OperatingPoint {
            level: 4,
            distance: 32,
            degree: 5
        })
    );
    assert_eq!(pf.degree(), 5);
}

// ══════════════════════════════════════════════════════════
// 4. Capacity bounds and stale links
// ══════════════════════════════════════════════════════════

/// With room for one PC, alternating instructions evict each other and never predict.
#[test]
fn index_eviction_breaks_chains() {
    let mut pf = engine(&PrefetchConfig {
        index_capacity: 1,
        ..raw_config(0, 1)
    });
    for i in 0..10u64 {
        assert!(pf.observe(access(0x400, 0x1000 + 8 * i)).is_empty());
        assert!(pf.observe(access(0x800, 0x9000 + 8 * i)).is_empty());
    }
    assert_eq!(pf.index().len(), 1);
    assert_eq!(pf.stats().index_evictions, 19);
}

/// A history buffer exactly one chain long still predicts for a single instruction.
#[test]
fn minimal_history_still_predicts() {
    let mut pf = engine(&PrefetchConfig {
        ghb_capacity: 3,
        ..raw_config(0, 1)
    });
    let issued = feed(&mut pf, PC, &[0, 8, 16, 24, 32, 40]);
    assert_eq!(issued[5], vec![48]);
}

/// Links into overwritten slots are walked without panicking and history stays fixed-size.
#[test]
fn stale_links_are_tolerated() {
    let mut pf = engine(&PrefetchConfig {
        ghb_capacity: 3,
        index_capacity: 4,
        ..raw_config(0, 2)
    });
    for i in 0..50u64 {
        let _ = pf.observe(access(0x400 + (i % 3) * 4, i * 64));
        assert_eq!(pf.history().entries().len(), 3);
        assert!(pf.index().len() <= 4);
    }
}

// ══════════════════════════════════════════════════════════
// 5. Reset
// ══════════════════════════════════════════════════════════

#[test]
fn initialise_matches_fresh_engine() {
    let config = PrefetchConfig {
        ghb_capacity: 16,
        index_capacity: 4,
        ..feedback_config(3, 1)
    };
    let fresh = engine(&config);
    let mut pf = engine(&config);

    for i in 0..40u64 {
        let _ = pf.observe(access(0x400 + (i % 6) * 4, i * 8).with_useful(i % 2 == 0));
        let _ = pf.on_fill(FillInfo {
            addr: Addr(i),
            was_prefetch: true,
            evicted: Some(Addr(i + 1)),
            tag: InFlightTag::Outstanding,
        });
    }

    pf.initialise();
    assert_engine_eq(&pf, &fresh);
    pf.initialise();
    assert_engine_eq(&pf, &fresh);

    // Behaves like a fresh engine afterwards.
    let issued = feed(&mut pf, PC, &[0, 4, 8]);
    assert!(issued[0].is_empty() && issued[1].is_empty());
    assert!(!issued[2].is_empty());
}

#[test]
fn initialise_on_fresh_engine_is_noop() {
    let config = raw_config(4, 4);
    let fresh = engine(&config);
    let mut pf = engine(&config);
    pf.initialise();
    assert_engine_eq(&pf, &fresh);
    assert_eq!(*pf.stats(), EngineStats::default());
}

fn assert_engine_eq(a: &GhbPrefetcher, b: &GhbPrefetcher) {
    assert_eq!(a.history().entries(), b.history().entries());
    assert_eq!(a.history().head(), b.history().head());
    assert_eq!(a.index().len(), 0);
    assert_eq!(b.index().len(), 0);
    assert_eq!(a.operating_point(), b.operating_point());
    assert_eq!(
        a.controller().map(|c| c.counters()),
        b.controller().map(|c| c.counters())
    );
    assert_eq!(a.stats(), b.stats());
}

// ══════════════════════════════════════════════════════════
// 6. Construction
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::sequence_of_one(
    PrefetchConfig { sequence_length: 1, ..PrefetchConfig::default() },
    ConfigError::SequenceTooShort(1)
)]
#[case::empty_index(
    PrefetchConfig { index_capacity: 0, ..PrefetchConfig::default() },
    ConfigError::Zero { field: "index_capacity" }
)]
#[case::history_shorter_than_chain(
    PrefetchConfig { ghb_capacity: 2, sequence_length: 3, ..PrefetchConfig::default() },
    ConfigError::HistoryTooSmall { capacity: 2, sequence_length: 3 }
)]
#[case::bad_interval(
    PrefetchConfig {
        feedback: Some(FeedbackConfig { interval: 0, ..FeedbackConfig::default() }),
        ..PrefetchConfig::default()
    },
    ConfigError::Zero { field: "interval" }
)]
fn invalid_config_is_rejected(#[case] config: PrefetchConfig, #[case] error: ConfigError) {
    assert_eq!(GhbPrefetcher::new(&config).unwrap_err(), error);
}

#[test]
fn engine_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<GhbPrefetcher>();
    let _: Box<dyn Prefetcher> = Box::new(engine(&PrefetchConfig::default()));
}

#[test]
fn access_builder_defaults() {
    let a = AccessInfo::new(Addr(1), ghbsim_core::common::Pc(2));
    assert!(!a.hit && !a.useful_prefetch);
    assert_eq!(a.tag, InFlightTag::Idle);
}
