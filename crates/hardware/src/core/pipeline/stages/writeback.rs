//! Write-Back and Commit Stage.
//!
//! 1. **Completion:** Every completion on the write-back bus is recorded in the
//!    ROB; produced values are mirrored into the rename slot so younger readers
//!    can bypass.
//! 2. **Retirement:** Up to `pipeline.writeback_units` completed entries leave the
//!    ROB head per cycle, strictly in program order.
//! 3. **Stores:** A store commits through the data cache before retiring. While
//!    its access is in progress nothing younger retires.
//! 4. **Faults:** A deferred program error is raised when its instruction reaches the head.

use crate::common::error::{InvariantViolation, SimError, SimResult};
use crate::core::Cpu;
use crate::core::pipeline::engine::squash_after;
use crate::core::pipeline::rob::RobState;
use crate::core::pipeline::signals::SeqId;
use crate::core::pipeline::traits::PipelineObserver;
use crate::core::units::cache::MemoryAccess;
use crate::isa::instruction::InstructionType;
use crate::soc::System;

/// Write-back unit state.
#[derive(Debug, Default)]
pub struct WritebackUnit {
    committing: Option<(SeqId, MemoryAccess)>,
}

impl WritebackUnit {
    /// Creates an idle write-back unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a store commit is in progress.
    pub const fn is_committing(&self) -> bool {
        self.committing.is_some()
    }
}

/// Pops the ROB head and applies its register effect.
fn retire_head(cpu: &mut Cpu, sys: &mut System, observer: &mut dyn PipelineObserver) -> SimResult<()> {
    let entry = cpu
        .rob
        .pop_head()
        .ok_or(InvariantViolation::Unreachable("retiring from an empty ROB"))?;
    let res = match entry.outcome {
        Some(Ok(res)) => res,
        Some(Err(e)) => return Err(SimError::program(entry.pc, e)),
        None => return Err(InvariantViolation::Unreachable("retiring an incomplete entry").into()),
    };

    if let Some((reg, value)) = res.register_change {
        cpu.regs.write(reg, value);
    }
    if cpu.pipeline.renaming {
        let _ = cpu.rename.release(entry.seq);
    }
    cpu.pending_writes.remove(entry.writes);

    cpu.stats.instructions_retired += 1;
    match entry.kind {
        InstructionType::Load => cpu.stats.inst_load += 1,
        InstructionType::Store => cpu.stats.inst_store += 1,
        InstructionType::Jump | InstructionType::Return => cpu.stats.inst_jump += 1,
        InstructionType::Arithmetic | InstructionType::ConditionalBranch => {}
    }
    observer.on_retire(cpu.id, cpu.cycle, entry.seq, entry.pc);

    if res.terminate {
        cpu.terminated = true;
        let _ = squash_after(cpu, sys, entry.seq)?;
    }
    Ok(())
}

/// Executes the write-back stage.
///
/// # Errors
///
/// A `SimError::Program` when the retiring instruction faulted, or an
/// invariant violation from the ROB or the cache controller.
pub fn writeback_stage(
    cpu: &mut Cpu,
    sys: &mut System,
    observer: &mut dyn PipelineObserver,
) -> SimResult<()> {
    while let Some(completion) = cpu.execute_bus.get() {
        if let Ok(res) = &completion.outcome {
            if let Some((_, value)) = res.register_change {
                cpu.rename.fill(completion.seq, value);
            }
        }
        cpu.rob.complete(completion.seq, completion.outcome)?;
    }

    let mut retired = 0;
    if let Some((seq, mut access)) = cpu.writeback.committing.take() {
        if !cpu.dcache.step(&mut access, sys, &mut cpu.stats)? {
            cpu.writeback.committing = Some((seq, access));
            return Ok(());
        }
        retire_head(cpu, sys, observer)?;
        retired += 1;
    }

    while retired < cpu.pipeline.writeback_units && !cpu.terminated {
        let Some(head) = cpu.rob.head() else {
            break;
        };
        if head.state != RobState::Completed {
            break;
        }
        let seq = head.seq;
        match &head.outcome {
            Some(Err(e)) => return Err(SimError::program(head.pc, e.clone())),
            Some(Ok(res)) if !res.memory_change.is_empty() => {
                let mut access = cpu.dcache.write(&res.memory_change);
                if !cpu.dcache.step(&mut access, sys, &mut cpu.stats)? {
                    cpu.writeback.committing = Some((seq, access));
                    break;
                }
            }
            _ => {}
        }
        retire_head(cpu, sys, observer)?;
        retired += 1;
    }
    Ok(())
}
