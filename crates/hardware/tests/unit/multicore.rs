//! Multi-Core Tests.
//!
//! Every core runs the same program; `tp` holds the core index.

use pipesim_core::config::{Config, Variant};
use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;
use crate::common::programs::{COUNTERS, PER_CORE_COUNTERS};

fn cores(n: usize) -> Config {
    let mut config = Config::for_variant(Variant::MultiCore);
    config.system.cores = n;
    config
}

#[test]
fn tp_holds_core_index() {
    let mut ctx = TestContext::with_config(cores(3));
    let _ = ctx.run("mv a0, tp\n");
    for core in 0..3 {
        assert_eq!(ctx.sim.registers(core).map(|r| r[10]), Some(core as i32));
    }
}

#[test]
fn per_core_counters_survive_contention() {
    let mut ctx = TestContext::with_config(cores(2));
    let report = ctx.run(PER_CORE_COUNTERS);
    assert_eq!(ctx.word(COUNTERS), 20);
    assert_eq!(ctx.word(COUNTERS + 4), 20);
    assert!(report.stats.coherence_requests > 0);
    assert!(report.stats.snoops_served > 0);
}

#[test]
fn four_cores_keep_their_own_slots() {
    let mut ctx = TestContext::with_config(cores(4));
    let report = ctx.run(PER_CORE_COUNTERS);
    for core in 0..4 {
        assert_eq!(ctx.word(COUNTERS + 4 * core), 20, "core {core}");
    }
    assert_eq!(report.per_core.len(), 4);
    let retired: Vec<u64> = report.per_core.iter().map(|s| s.instructions_retired).collect();
    assert_eq!(retired, vec![retired[0]; 4]);
}

#[test]
fn rerun_starts_from_cold_caches() {
    let mut ctx = TestContext::with_config(cores(2));
    let first = ctx.run(PER_CORE_COUNTERS);
    let second = ctx.run(PER_CORE_COUNTERS);
    assert_eq!(ctx.word(COUNTERS), 40);
    assert_eq!(ctx.word(COUNTERS + 4), 40);
    assert_eq!(second, first);

    let mut fresh = TestContext::with_config(cores(2)).with_memory(COUNTERS, &[20, 0, 0, 0, 20, 0, 0, 0]);
    assert_eq!(fresh.run(PER_CORE_COUNTERS), second);
    assert_eq!(fresh.state(), ctx.state());
}

#[test]
fn merged_stats_sum_cores() {
    let mut ctx = TestContext::with_config(cores(2));
    let report = ctx.run(PER_CORE_COUNTERS);
    let total: u64 = report.per_core.iter().map(|s| s.instructions_retired).sum();
    assert_eq!(report.stats.instructions_retired, total);
    assert_eq!(report.stats.cycles, report.cycles);
    assert!(report.per_core.iter().all(|s| s.cycles <= report.cycles));
}

#[test]
fn single_core_sees_no_coherence_traffic() {
    let mut ctx = TestContext::new(Variant::Superscalar);
    let report = ctx.run(PER_CORE_COUNTERS);
    assert_eq!(ctx.word(COUNTERS), 20);
    assert_eq!(report.stats.coherence_requests, 0);
    assert_eq!(report.stats.snoops_served, 0);
}
