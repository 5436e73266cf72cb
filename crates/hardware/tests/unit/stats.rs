//! Statistics Tests.

use pipesim_core::config::Variant;
use pipesim_core::stats::SimStats;
use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;
use crate::common::programs::SUM_OF_SQUARES;

#[test]
fn instruction_mix_is_counted() {
    let mut ctx = TestContext::new(Variant::Pipelined);
    let report = ctx.run(SUM_OF_SQUARES);
    let s = &report.stats;
    assert_eq!(s.inst_store, 9);
    assert_eq!(s.inst_load, 8);
    assert_eq!(s.branches, 16);
    assert_eq!(s.branches_taken, 14);
    assert_eq!(s.inst_jump, 0);
}

#[test]
fn cache_counters_only_with_caches() {
    let (mut plain, mut cached) = (
        TestContext::new(Variant::Pipelined),
        TestContext::new(Variant::Cached),
    );
    let off = plain.run(SUM_OF_SQUARES);
    let on = cached.run(SUM_OF_SQUARES);
    assert_eq!(off.stats.icache_hits + off.stats.dcache_hits, 0);
    assert!(on.stats.icache_hits > 0);
    assert!(on.stats.dcache_hits > 0);
    assert!(on.stats.dcache_misses > 0);
}

#[test]
fn report_matches_simulator_totals() {
    let mut ctx = TestContext::new(Variant::Superscalar);
    let report = ctx.run(SUM_OF_SQUARES);
    assert_eq!(report.stats, ctx.sim.stats());
    assert_eq!(report.cycles, ctx.sim.cycles());
    assert_eq!(report.per_core, vec![report.stats.clone()]);
}

#[test]
fn sections_render_selectively() {
    let stats = SimStats {
        cycles: 10,
        instructions_retired: 5,
        btb_predictions: 4,
        btb_mispredictions: 1,
        ..SimStats::default()
    };
    let branch = stats.render_sections(&["branch".to_string()]);
    assert!(branch.contains("BRANCH PREDICTION"));
    assert!(branch.contains("75.00%"));
    assert!(!branch.contains("MEMORY HIERARCHY"));

    let all = stats.render_sections(&[]);
    for heading in ["sim_ipc", "PIPELINE", "INSTRUCTION MIX", "BRANCH PREDICTION", "MEMORY HIERARCHY"] {
        assert!(all.contains(heading), "missing {heading}");
    }
}

#[test]
fn serializes_every_counter() {
    let json = serde_json::to_value(SimStats::default()).unwrap();
    let fields = json.as_object().unwrap();
    for key in ["cycles", "instructions_retired", "forwards", "renames", "flushes", "snoops_served"] {
        assert!(fields.contains_key(key), "missing {key}");
    }
}
