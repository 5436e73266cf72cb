//! Assembler and Program Fault Tests.
//!
//! Assembly errors carry the 1-based source line. Program faults surface only
//! when the faulting instruction retires, so a fault on a squashed path is
//! never reported.

use pipesim_core::common::{ProgramError, SimError};
use pipesim_core::config::{Config, Variant};
use pipesim_core::{Simulator, assemble};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{TestContext, init_tracing};

fn run_err(variant: Variant, source: &str) -> SimError {
    init_tracing();
    let program = assemble(source).unwrap();
    let mut sim = Simulator::new(Config::for_variant(variant)).unwrap();
    sim.run(&program).unwrap_err()
}

fn assembly_line(source: &str) -> usize {
    match assemble(source) {
        Err(SimError::Assembly { line, .. }) => line,
        other => panic!("expected an assembly error, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════
// 1. Assembly Errors
// ══════════════════════════════════════════════════════════

#[test]
fn unknown_mnemonic_reports_its_line() {
    assert_eq!(assembly_line("nop\n\n  frobnicate a0, a1\n"), 3);
}

#[test]
fn duplicate_label_reports_second_definition() {
    assert_eq!(assembly_line("top: nop\nnop\ntop: nop\n"), 3);
}

#[test]
fn wrong_operand_shape_is_rejected() {
    assert_eq!(assembly_line("lw a0, a1\n"), 1);
    assert_eq!(assembly_line("add a0, a1\n"), 1);
    assert_eq!(assembly_line("# header\naddi a0, a1, a2\n"), 2);
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let program = assemble("# leading\n\n  li a0, 1 ; trailing\nend:\n  nop\n").unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(program.labels().index("end"), Some(1));
}

#[test]
fn undefined_label_assembles() {
    assert!(assemble("j nowhere\n").is_ok());
}

// ══════════════════════════════════════════════════════════
// 2. Program Faults at Retirement
// ══════════════════════════════════════════════════════════

#[rstest]
fn division_by_zero_faults(
    #[values(Variant::Scalar, Variant::Pipelined, Variant::Predicted, Variant::Superscalar)]
    variant: Variant,
) {
    let err = run_err(variant, "li a0, 1\ndiv a1, a0, zero\n");
    assert_eq!(err, SimError::program(4, ProgramError::DivisionByZero));
}

#[rstest]
fn undefined_label_faults_when_reached(
    #[values(Variant::Scalar, Variant::Cached, Variant::Superscalar)] variant: Variant,
) {
    let err = run_err(variant, "nop\nbeq zero, zero, nowhere\nnop\n");
    assert_eq!(
        err,
        SimError::program(4, ProgramError::UndefinedLabel("nowhere".to_string()))
    );
}

#[rstest]
fn load_past_memory_faults(#[values(Variant::Pipelined, Variant::Cached)] variant: Variant) {
    let err = run_err(variant, "li t0, 0x10000\nlw a0, 0(t0)\n");
    assert_eq!(
        err,
        SimError::program(
            4,
            ProgramError::MemoryOutOfBounds {
                addr: 0x10000,
                size: 64 * 1024
            }
        )
    );
}

#[test]
fn straddling_store_faults_without_partial_write() {
    let mut ctx = TestContext::new(Variant::Cached);
    let program = assemble("li t0, 0xFFFE\nsw t0, 0(t0)\n").unwrap();
    let err = ctx.sim.run(&program).unwrap_err();
    assert!(matches!(
        err,
        SimError::Program {
            pc: 4,
            source: ProgramError::MemoryOutOfBounds { .. }
        }
    ));
    assert_eq!(ctx.byte(0xFFFE), 0);
    assert_eq!(ctx.byte(0xFFFF), 0);
}

#[test]
fn misaligned_jump_target_faults() {
    let err = run_err(Variant::Pipelined, "li t0, 6\njr t0\n");
    assert_eq!(err, SimError::program(4, ProgramError::InvalidJumpTarget(6)));
}

#[rstest]
fn fault_on_squashed_path_is_ignored(
    #[values(Variant::Predicted, Variant::Superscalar, Variant::MultiCore)] variant: Variant,
) {
    let mut ctx = TestContext::new(variant);
    let _ = ctx.run("li a0, 1\nbnez a0, ok\ndiv a1, a0, zero\nok: li a2, 3\n");
    assert_eq!(ctx.reg(11), 0);
    assert_eq!(ctx.reg(12), 3);
}

#[test]
fn registers_before_fault_are_committed() {
    let mut ctx = TestContext::new(Variant::Superscalar);
    let program = assemble("li a0, 5\nli a1, 6\ndiv a2, a0, zero\nli a3, 7\n").unwrap();
    assert!(ctx.sim.run(&program).is_err());
    assert_eq!(ctx.reg(10), 5);
    assert_eq!(ctx.reg(11), 6);
    assert_eq!(ctx.reg(13), 0);
}
