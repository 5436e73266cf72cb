//! Misprediction Recovery Tests.
//!
//! Wrong-path work may be fetched, decoded and even executed, but it must
//! never reach registers or memory.

use pipesim_core::config::Variant;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::TestContext;
use crate::common::programs::{EARLY_EXIT, FIB_CALL, FIB_RESULT};

const TAKEN_OVER_STORE: &str = "
        li   a0, 1
        bnez a0, skip
        sw   a0, 0x600(zero)
        li   a1, 9
skip:   li   a2, 4
";

/// Five trips around a loop closed by an unconditional jump.
const JUMP_LOOP: &str = "
        li   t0, 0
        li   t1, 5
loop:   addi t0, t0, 1
        bge  t0, t1, done
        j    loop
done:   mv   a0, t0
";

// ══════════════════════════════════════════════════════════
// 1. Wrong-Path Effects
// ══════════════════════════════════════════════════════════

#[rstest]
fn wrong_path_store_never_lands(
    #[values(
        Variant::Scalar,
        Variant::Pipelined,
        Variant::Cached,
        Variant::Predicted,
        Variant::Superscalar,
        Variant::MultiCore
    )]
    variant: Variant,
) {
    let mut ctx = TestContext::new(variant);
    let _ = ctx.run(TAKEN_OVER_STORE);
    assert_eq!(ctx.byte(0x600), 0);
    assert_eq!(ctx.reg(11), 0);
    assert_eq!(ctx.reg(12), 4);
}

#[test]
fn taken_branch_under_prediction_flushes_once() {
    let mut ctx = TestContext::new(Variant::Predicted);
    let report = ctx.run(TAKEN_OVER_STORE);
    assert_eq!(report.stats.flushes, 1);
    assert_eq!(report.stats.btb_mispredictions, 1);
    assert_eq!((report.stats.branches, report.stats.branches_taken), (1, 1));
}

#[test]
fn not_taken_branch_under_prediction_keeps_going() {
    let mut ctx = TestContext::new(Variant::Predicted);
    let report = ctx.run("li a0, 0\nbnez a0, skip\nli a1, 9\nskip: li a2, 4\n");
    assert_eq!(report.stats.flushes, 0);
    assert_eq!(report.stats.squashed, 0);
    assert_eq!(ctx.reg(11), 9);
}

#[rstest]
#[case::not_taken("li a0, 0\nbnez a0, skip\nli a1, 9\nskip: li a2, 4\n", 0)]
#[case::taken("li a0, 1\nbnez a0, skip\nli a1, 9\nskip: li a2, 4\n", 1)]
fn stalled_branch_counts_only_redirects(#[case] src: &str, #[case] expected: u64) {
    for variant in [Variant::Pipelined, Variant::Cached, Variant::Predicted] {
        let mut ctx = TestContext::new(variant);
        let report = ctx.run(src);
        assert_eq!(report.stats.flushes, expected, "{variant:?}");
        assert_eq!(ctx.reg(12), 4, "{variant:?}");
    }
}

// ══════════════════════════════════════════════════════════
// 2. Branch Target Buffer
// ══════════════════════════════════════════════════════════

#[test]
fn trained_jump_is_predicted() {
    let mut predicted = TestContext::new(Variant::Predicted);
    let mut plain = TestContext::new(Variant::Cached);
    let hot = predicted.run(JUMP_LOOP);
    let cold = plain.run(JUMP_LOOP);

    assert_eq!(predicted.reg(10), 5);
    assert_eq!(predicted.state(), plain.state());
    assert!(hot.stats.btb_predictions >= 3);
    assert_eq!(cold.stats.btb_predictions, 0);
    assert!(hot.stats.flushes < cold.stats.flushes);
}

#[test]
fn call_and_return_through_ra() {
    for variant in [Variant::Pipelined, Variant::Predicted, Variant::Superscalar] {
        let mut ctx = TestContext::new(variant);
        let _ = ctx.run(FIB_CALL);
        assert_eq!(ctx.word(FIB_RESULT), 55, "{variant:?}");
        assert_eq!(ctx.reg(1), 0, "{variant:?}");
    }
}

// ══════════════════════════════════════════════════════════
// 3. Termination
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::scalar(Variant::Scalar)]
#[case::superscalar(Variant::Superscalar)]
fn ret_with_zero_ra_stops_the_core(#[case] variant: Variant) {
    let mut ctx = TestContext::new(variant);
    let _ = ctx.run(EARLY_EXIT);
    assert_eq!(ctx.reg(10), 7);
    assert_eq!(ctx.word(0x500), 7);
    assert!(ctx.sim.cores()[0].terminated);
}

#[test]
fn running_off_the_end_is_not_termination() {
    let mut ctx = TestContext::new(Variant::Pipelined);
    let _ = ctx.run("li a0, 1\n");
    assert!(!ctx.sim.cores()[0].terminated);
    assert!(ctx.sim.cores()[0].done);
}
