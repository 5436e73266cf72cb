//! Instruction Decode Stage.
//!
//! Resolves fetched addresses to instruction descriptors, stamps each with its
//! sequence ID and hands the resulting `Runner` to the issue unit. Control
//! instructions steer the front end:
//! - a jump or return with a BTB hit redirects fetch at once;
//! - a jump or return without a hit blocks decode until it resolves;
//! - a conditional branch continues on the fall-through path when prediction
//!   is enabled and blocks decode otherwise.
//!
//! Decode stops for the cycle after any control instruction.

use crate::common::error::{InvariantViolation, SimResult};
use crate::core::Cpu;
use crate::core::pipeline::signals::{Runner, SeqId};
use crate::core::pipeline::traits::PipelineObserver;
use crate::isa::instruction::InstructionType;
use crate::isa::program::Program;

/// Decode unit state.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeUnit {
    /// Stamp for the next decoded instruction.
    pub next_seq: SeqId,
    /// Control instruction decode is waiting on.
    pub blocked_on: Option<SeqId>,
}

impl DecodeUnit {
    /// Creates a decode unit whose first stamp is `#1`.
    pub const fn new() -> Self {
        Self {
            next_seq: SeqId(1),
            blocked_on: None,
        }
    }

    /// Unblocks decode if it was waiting on `seq`.
    pub fn resolved(&mut self, seq: SeqId) {
        if self.blocked_on == Some(seq) {
            self.blocked_on = None;
        }
    }
}

/// Executes the decode stage.
///
/// # Errors
///
/// `InvariantViolation::Unreachable` when fetch produced an address with no
/// instruction behind it.
pub fn decode_stage(
    cpu: &mut Cpu,
    program: &Program,
    observer: &mut dyn PipelineObserver,
) -> SimResult<()> {
    if cpu.decode.blocked_on.is_some() {
        return Ok(());
    }
    for _ in 0..cpu.pipeline.width {
        if !cpu.decode_bus.can_add() {
            break;
        }
        let Some(pc) = cpu.fetch_bus.get() else {
            break;
        };
        let instruction = program
            .fetch(pc)
            .cloned()
            .ok_or(InvariantViolation::Unreachable("fetched address has no instruction"))?;
        let seq = cpu.decode.next_seq;
        cpu.decode.next_seq = seq.next();

        let kind = instruction.instruction_type();
        let mut prediction = None;
        match kind {
            InstructionType::Jump | InstructionType::Return => {
                match cpu.bru.predict(pc, &mut cpu.stats) {
                    Some(target) => {
                        prediction = Some(target);
                        cpu.fetch.reset(target, program);
                        cpu.fetch_bus.flush();
                    }
                    None => cpu.decode.blocked_on = Some(seq),
                }
            }
            InstructionType::ConditionalBranch if !cpu.bru.predicts() => {
                cpu.decode.blocked_on = Some(seq);
            }
            _ => {}
        }

        observer.on_decode(cpu.id, cpu.cycle, seq, pc, instruction.as_ref());
        if cpu
            .decode_bus
            .add(Runner::new(seq, pc, instruction, prediction))
            .is_err()
        {
            return Err(InvariantViolation::Unreachable("decode bus rejected a checked add").into());
        }
        if kind.is_control() {
            break;
        }
    }
    Ok(())
}
