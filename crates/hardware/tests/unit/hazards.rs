//! Hazard Handling Tests.
//!
//! Whole-program runs that check forwarding, renaming and the stall paths
//! produce the same registers as a strictly in-order machine, and that the
//! matching counters move.

use pipesim_core::config::{Config, Variant};
use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;

/// Each instruction reads the previous one's result.
const CHAIN: &str = "
        li   a0, 1
        addi a1, a0, 1
        addi a2, a1, 1
        addi a3, a2, 1
        addi a4, a3, 1
        addi a5, a4, 1
";

/// Repeated writes to one register, each followed by a reader.
const REUSE: &str = "
        li   t0, 3
        add  a0, t0, t0
        li   t0, 5
        add  a1, t0, t0
        li   t0, 7
        add  a2, t0, t0
";

fn superscalar(forwarding: bool, renaming: bool) -> Config {
    let mut config = Config::for_variant(Variant::Superscalar);
    config.pipeline.forwarding = forwarding;
    config.pipeline.renaming = renaming;
    config
}

// ══════════════════════════════════════════════════════════
// 1. Read After Write
// ══════════════════════════════════════════════════════════

#[test]
fn dependent_chain_stalls_without_forwarding() {
    let mut ctx = TestContext::new(Variant::Pipelined);
    let report = ctx.run(CHAIN);
    assert_eq!(ctx.reg(15), 6);
    assert!(report.stats.stalls > 0);
    assert_eq!(report.stats.forwards, 0);
    assert_eq!(report.stats.renames, 0);
}

#[test]
fn forwarding_feeds_dependent_chain() {
    let mut ctx = TestContext::with_config(superscalar(true, false));
    let report = ctx.run(CHAIN);
    assert_eq!(ctx.reg(15), 6);
    assert!(report.stats.forwards > 0);
}

#[test]
fn forwarding_shortens_dependent_chain() {
    let mut with = TestContext::with_config(superscalar(true, false));
    let mut without = TestContext::with_config(superscalar(false, false));
    let fast = with.run(CHAIN);
    let slow = without.run(CHAIN);
    assert_eq!(with.state(), without.state());
    assert_eq!(slow.stats.forwards, 0);
    assert!(fast.cycles <= slow.cycles);
}

// ══════════════════════════════════════════════════════════
// 2. Write After Write
// ══════════════════════════════════════════════════════════

#[test]
fn renaming_resolves_register_reuse() {
    let mut ctx = TestContext::with_config(superscalar(true, true));
    let report = ctx.run(REUSE);
    assert_eq!((ctx.reg(10), ctx.reg(11), ctx.reg(12)), (6, 10, 14));
    assert_eq!(ctx.reg(5), 7);
    assert!(report.stats.renames > 0);
}

#[test]
fn reuse_without_renaming_matches() {
    let mut renamed = TestContext::with_config(superscalar(true, true));
    let mut plain = TestContext::with_config(superscalar(true, false));
    let _ = renamed.run(REUSE);
    let report = plain.run(REUSE);
    assert_eq!(renamed.state(), plain.state());
    assert_eq!(report.stats.renames, 0);
    assert!(report.stats.stalls > 0);
}

#[test]
fn single_rename_slot_still_completes() {
    let mut config = superscalar(true, true);
    config.pipeline.physical_registers = 1;
    let mut ctx = TestContext::with_config(config);
    let _ = ctx.run(REUSE);
    assert_eq!((ctx.reg(10), ctx.reg(11), ctx.reg(12)), (6, 10, 14));
}

// ══════════════════════════════════════════════════════════
// 3. Memory
// ══════════════════════════════════════════════════════════

#[test]
fn load_sees_older_store() {
    for variant in Variant::ALL {
        let mut ctx = TestContext::new(variant);
        let _ = ctx.run("li a0, 42\nsw a0, 0x700(zero)\nlw a1, 0x700(zero)\n");
        assert_eq!(ctx.reg(11), 42, "{variant:?}");
    }
}

#[test]
fn load_waits_for_store_with_late_address() {
    let src = "
        li   t0, 0x6F0
        addi t0, t0, 0x10
        li   a0, -3
        sw   a0, 0(t0)
        lw   a1, 0x700(zero)
        lb   a2, 0x701(zero)
    ";
    let mut ctx = TestContext::new(Variant::Superscalar);
    let _ = ctx.run(src);
    assert_eq!(ctx.reg(11), -3);
    assert_eq!(ctx.reg(12), -1);
}

#[test]
fn independent_load_bypasses_unrelated_store() {
    let mut ctx = TestContext::new(Variant::Superscalar).with_memory(0x720, &[9, 0, 0, 0]);
    let _ = ctx.run("li a0, 1\nsw a0, 0x700(zero)\nlw a1, 0x720(zero)\n");
    assert_eq!(ctx.reg(11), 9);
    assert_eq!(ctx.word(0x700), 1);
}
