//! Architectural Equivalence Tests.
//!
//! Every preset must leave the same registers and memory as the scalar
//! machine; only timing may differ.

use pipesim_core::config::Variant;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{TestContext, run_on};
use crate::common::programs::{
    EARLY_EXIT, FIB_CALL, FIB_RESULT, PRIME_1109, PRIME_RESULT, SUM_OF_SQUARES, SUM_RESULT, prime,
};

#[rstest]
fn matches_scalar(
    #[values(
        Variant::Pipelined,
        Variant::Cached,
        Variant::Predicted,
        Variant::Superscalar,
        Variant::MultiCore
    )]
    variant: Variant,
    #[values(PRIME_1109, SUM_OF_SQUARES, FIB_CALL, EARLY_EXIT)] source: &str,
) {
    let (_, reference) = run_on(Variant::Scalar, source);
    let (_, state) = run_on(variant, source);
    assert_eq!(state.registers[0], reference.registers[0]);
    assert_eq!(state.memory, reference.memory);
}

#[rstest]
fn rerun_matches_fresh_machine(
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
    let mut reused = TestContext::new(variant);
    let _ = reused.run(SUM_OF_SQUARES);
    let again = reused.run(SUM_OF_SQUARES);
    let (fresh, state) = run_on(variant, SUM_OF_SQUARES);
    assert_eq!(again, fresh);
    assert_eq!(reused.state(), state);
}

#[rstest]
#[case::prime(1109, 1)]
#[case::composite(1111, 0)]
#[case::square(961, 0)]
#[case::small_prime(2, 1)]
fn primality_verdict(#[case] candidate: i32, #[case] verdict: u8) {
    for variant in [Variant::Scalar, Variant::Superscalar] {
        let mut ctx = TestContext::new(variant);
        let _ = ctx.run(&prime(candidate));
        assert_eq!(ctx.byte(PRIME_RESULT), verdict, "{candidate} on {variant:?}");
    }
}

#[test]
fn reference_results() {
    let mut ctx = TestContext::new(Variant::Superscalar);
    let _ = ctx.run(SUM_OF_SQUARES);
    assert_eq!(ctx.word(SUM_RESULT), 380);
    assert_eq!(ctx.reg(10), 380);

    let mut ctx = TestContext::new(Variant::Cached);
    let _ = ctx.run(FIB_CALL);
    assert_eq!(ctx.word(FIB_RESULT), 55);
}

#[test]
fn every_preset_retires_the_same_instructions() {
    let (reference, _) = run_on(Variant::Scalar, PRIME_1109);
    for variant in Variant::ALL {
        let (report, _) = run_on(variant, PRIME_1109);
        assert_eq!(
            report.per_core[0].instructions_retired,
            reference.stats.instructions_retired,
            "{variant:?}"
        );
    }
}

#[test]
fn each_generation_is_faster_on_prime() {
    let (scalar, _) = run_on(Variant::Scalar, PRIME_1109);
    let (pipelined, _) = run_on(Variant::Pipelined, PRIME_1109);
    let (cached, _) = run_on(Variant::Cached, PRIME_1109);
    assert!(pipelined.cycles < scalar.cycles, "{} vs {}", pipelined.cycles, scalar.cycles);
    assert!(cached.cycles < pipelined.cycles, "{} vs {}", cached.cycles, pipelined.cycles);
}

#[test]
fn initial_registers_are_honoured() {
    for variant in Variant::ALL {
        let mut ctx = TestContext::new(variant).set_reg(10, 20).set_reg(11, 22);
        let _ = ctx.run("add a2, a0, a1\n");
        assert_eq!(ctx.reg(12), 42, "{variant:?}");
    }
}
