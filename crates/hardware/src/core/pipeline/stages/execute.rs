//! Execute Stage.
//!
//! `pipeline.execute_units` parallel units, each a small state machine:
//!
//! `Idle -> AwaitingForward -> Reading(MemoryAccess) -> Finished(Completion) -> Idle`
//!
//! 1. **Intake:** Idle units take runners from the execute bus in FIFO order.
//! 2. **Forwarding:** A runner owed a forwarded operand waits until the producer writes it.
//! 3. **Loads:** Addresses are bounds-checked, then read through the data cache.
//! 4. **Resolution:** Control instructions are checked against what the front end
//!    assumed, producing a `BranchEvent`.
//! 5. **Hand-off:** The completion waits in the unit until the write-back bus has room.
//!
//! Program errors never abort here; they ride in the completion and surface at
//! retirement.

use crate::common::constants::INSTRUCTION_WIDTH;
use crate::common::error::{InvariantViolation, SimResult};
use crate::core::Cpu;
use crate::core::pipeline::signals::{BranchEvent, Completion, FlushSignal, Runner, SeqId};
use crate::core::pipeline::traits::PipelineObserver;
use crate::core::units::cache::{CacheController, MemoryAccess};
use crate::isa::instruction::InstructionType;
use crate::isa::program::Program;
use crate::soc::System;

/// Execute unit progress.
#[derive(Debug, Default)]
pub enum UnitState {
    /// No instruction.
    #[default]
    Idle,
    /// Waiting for a forwarded operand.
    AwaitingForward(Box<Runner>),
    /// Loading operands from memory.
    Reading {
        /// The load.
        runner: Box<Runner>,
        /// Cache access in progress.
        access: MemoryAccess,
    },
    /// Executed; waiting for room on the write-back bus.
    Finished(Completion),
}

/// One execute unit.
#[derive(Debug, Default)]
pub struct ExecuteUnit {
    /// Current state.
    pub state: UnitState,
}

impl ExecuteUnit {
    /// Whether the unit holds no instruction.
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, UnitState::Idle)
    }

    /// Sequence ID of the instruction held, if any.
    pub fn seq(&self) -> Option<SeqId> {
        match &self.state {
            UnitState::Idle => None,
            UnitState::AwaitingForward(r) | UnitState::Reading { runner: r, .. } => Some(r.seq),
            UnitState::Finished(c) => Some(c.seq),
        }
    }

    /// Drops the held instruction if it is younger than `boundary`, releasing cache locks.
    ///
    /// # Errors
    ///
    /// Propagates lock bookkeeping violations from the cache controller.
    pub fn abort_newer(
        &mut self,
        boundary: SeqId,
        dcache: &mut CacheController,
        sys: &mut System,
    ) -> Result<(), InvariantViolation> {
        if self.seq().is_none_or(|s| s <= boundary) {
            return Ok(());
        }
        if let UnitState::Reading { access, .. } = &self.state {
            dcache.abort(access, sys)?;
        }
        self.state = UnitState::Idle;
        Ok(())
    }
}

/// Runs the instruction semantics and resolves control flow.
fn run(
    cpu: &mut Cpu,
    runner: &Runner,
    data: &[u8],
    sys: &System,
    program: &Program,
) -> (Completion, Option<BranchEvent>) {
    let kind = runner.kind();
    let mut outcome = runner
        .instruction
        .execute(&runner.ctx, program.labels(), runner.pc, data);

    if let Ok(res) = &outcome {
        if let Some((_, value)) = res.register_change {
            if runner.outbox.is_attached() {
                runner.outbox.write_once(value);
            }
        }
        if let Err(e) = sys.memory.check(res.memory_change.iter().map(|(a, _)| *a)) {
            outcome = Err(e);
        }
    }

    let event = match &outcome {
        _ if !kind.is_control() => None,
        Ok(res) if !res.terminate => {
            let next = res.next_pc(runner.pc);
            match kind {
                InstructionType::ConditionalBranch => {
                    cpu.bru.notify_conditional(res.pc_change.is_some(), &mut cpu.stats);
                }
                _ => {
                    if let Some(target) = res.pc_change {
                        cpu.bru.notify_jump_resolved(runner.pc, target);
                    }
                }
            }
            let redirect =
                cpu.bru.speculated(runner.seq) || next != runner.pc.wrapping_add(INSTRUCTION_WIDTH);
            if cpu.bru.should_flush_pipeline(runner.seq, next, &mut cpu.stats) {
                Some(BranchEvent::Flush(FlushSignal {
                    seq: runner.seq,
                    target: next,
                    redirect,
                }))
            } else {
                Some(BranchEvent::Resolved(runner.seq))
            }
        }
        _ => {
            cpu.bru.forget(runner.seq);
            Some(BranchEvent::Resolved(runner.seq))
        }
    };

    let completion = Completion {
        seq: runner.seq,
        pc: runner.pc,
        outcome,
    };
    (completion, event)
}

/// Advances one unit by a cycle, collecting any branch event it raises.
fn step_unit(
    cpu: &mut Cpu,
    u: usize,
    sys: &mut System,
    program: &Program,
    events: &mut Vec<BranchEvent>,
    observer: &mut dyn PipelineObserver,
) -> SimResult<()> {
    loop {
        let Some(unit) = cpu.execute.get_mut(u) else {
            return Ok(());
        };
        match std::mem::take(&mut unit.state) {
            UnitState::Idle => return Ok(()),
            UnitState::AwaitingForward(mut runner) => {
                if let Some((reg, mailbox)) = runner.forward_in.take() {
                    match mailbox.take_if_present() {
                        Some(value) => runner.ctx.forward(reg, value),
                        None => {
                            runner.forward_in = Some((reg, mailbox));
                            unit.state = UnitState::AwaitingForward(runner);
                            return Ok(());
                        }
                    }
                }
                let addrs = runner.instruction.memory_read_addresses(&runner.ctx);
                if addrs.is_empty() {
                    let (completion, event) = run(cpu, &runner, &[], sys, program);
                    events.extend(event);
                    observer.on_execute(cpu.id, cpu.cycle, runner.seq, runner.pc);
                    cpu.execute[u].state = UnitState::Finished(completion);
                } else if let Err(e) = sys.memory.check(addrs.iter().copied()) {
                    observer.on_execute(cpu.id, cpu.cycle, runner.seq, runner.pc);
                    unit.state = UnitState::Finished(Completion {
                        seq: runner.seq,
                        pc: runner.pc,
                        outcome: Err(e),
                    });
                } else {
                    let access = cpu.dcache.read(&addrs);
                    cpu.execute[u].state = UnitState::Reading { runner, access };
                }
            }
            UnitState::Reading { runner, mut access } => {
                if !cpu.dcache.step(&mut access, sys, &mut cpu.stats)? {
                    cpu.execute[u].state = UnitState::Reading { runner, access };
                    return Ok(());
                }
                let (completion, event) = run(cpu, &runner, access.data(), sys, program);
                events.extend(event);
                observer.on_execute(cpu.id, cpu.cycle, runner.seq, runner.pc);
                cpu.execute[u].state = UnitState::Finished(completion);
            }
            UnitState::Finished(completion) => {
                if let Err(completion) = cpu.execute_bus.add(completion) {
                    cpu.execute[u].state = UnitState::Finished(completion);
                }
                return Ok(());
            }
        }
    }
}

/// Executes the execute stage for every unit.
///
/// # Returns
///
/// Branch events raised this cycle, in unit order.
///
/// # Errors
///
/// Propagates cache controller invariant violations.
pub fn execute_stage(
    cpu: &mut Cpu,
    sys: &mut System,
    program: &Program,
    observer: &mut dyn PipelineObserver,
) -> SimResult<Vec<BranchEvent>> {
    let mut events = Vec::new();
    for u in 0..cpu.execute.len() {
        if cpu.execute[u].is_idle() {
            if let Some(runner) = cpu.issue_bus.get() {
                if runner.kind().is_control() {
                    cpu.bru.assert(&runner);
                }
                cpu.execute[u].state = UnitState::AwaitingForward(Box::new(runner));
            }
        }
        step_unit(cpu, u, sys, program, &mut events, observer)?;
    }
    Ok(events)
}
