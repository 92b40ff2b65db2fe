//! Test harness for driving a `GhbPrefetcher` with synthetic access streams.

use ghbsim_core::common::{Addr, Pc};
use ghbsim_core::config::{FeedbackConfig, Granularity, PrefetchConfig};
use ghbsim_core::prefetch::{AccessInfo, GhbPrefetcher, PrefetchRequest};

/// Installs a test-friendly tracing subscriber once per process (`RUST_LOG` filters it).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Plain variant measuring strides on raw byte addresses.
pub fn raw_config(lookahead: u64, degree: usize) -> PrefetchConfig {
    PrefetchConfig {
        granularity: Granularity::Raw,
        lookahead,
        degree,
        ..PrefetchConfig::default()
    }
}

/// Feedback variant on raw addresses with a short interval and the given start level.
pub fn feedback_config(initial_level: u8, interval: u64) -> PrefetchConfig {
    PrefetchConfig {
        granularity: Granularity::Raw,
        lookahead: 0,
        feedback: Some(FeedbackConfig {
            initial_level,
            interval,
            ..FeedbackConfig::default()
        }),
        ..PrefetchConfig::default()
    }
}

/// Builds an engine, panicking on an invalid configuration.
pub fn engine(config: &PrefetchConfig) -> GhbPrefetcher {
    init_tracing();
    GhbPrefetcher::new(config).unwrap()
}

/// A missing demand access by `pc` to `addr`.
pub fn access(pc: u64, addr: u64) -> AccessInfo {
    AccessInfo::new(Addr(addr), Pc(pc))
}

/// Raw target addresses of a batch of requests.
pub fn targets(requests: &[PrefetchRequest]) -> Vec<u64> {
    requests.iter().map(|r| r.addr.val()).collect()
}

/// Feeds `addrs` for one `pc` and returns the targets issued after each access.
pub fn feed(engine: &mut GhbPrefetcher, pc: u64, addrs: &[u64]) -> Vec<Vec<u64>> {
    addrs
        .iter()
        .map(|&addr| targets(&engine.observe(access(pc, addr))))
        .collect()
}
