//! Control / Issue Stage.
//!
//! Moves instructions from decode to the execute units, at most
//! `pipeline.width` per cycle. Candidates are, in order:
//! 1. **Pending Entries:** Instructions held on earlier cycles, scanned oldest first.
//!    A held entry is skipped and scanning continues.
//! 2. **Fresh Runners:** Taken off the decode bus and registered in the ROB. A fresh
//!    runner that holds moves to the pending queue and ends bus scanning.
//!
//! Issue stops for the cycle once a control instruction has issued or the
//! execute bus is full.

use crate::common::error::{InvariantViolation, SimResult};
use crate::core::Cpu;
use crate::core::pipeline::hazards::{self, HazardView, IssueDecision, IssuePlan};
use crate::core::pipeline::queue::PendingQueue;
use crate::core::pipeline::rob::RobEntry;
use crate::core::pipeline::signals::Runner;
use crate::core::pipeline::traits::PipelineObserver;

/// Issue unit state.
#[derive(Debug)]
pub struct IssueUnit {
    /// Instructions taken off the decode bus but not yet issued.
    pub pending: PendingQueue<Runner>,
}

impl IssueUnit {
    /// Creates an issue unit with a pending queue of `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: PendingQueue::new(capacity),
        }
    }
}

fn decide(cpu: &Cpu, runner: &Runner) -> IssueDecision {
    let view = HazardView {
        rob: &cpu.rob,
        pending: &cpu.pending_writes,
        rename: &cpu.rename,
        regs: &cpu.regs,
        cycle: cpu.cycle,
        forwarding: cpu.pipeline.forwarding,
        renaming: cpu.pipeline.renaming,
    };
    hazards::classify(runner, &view)
}

/// Sends `runner` to the execute bus according to `plan`.
fn dispatch(
    cpu: &mut Cpu,
    mut runner: Runner,
    plan: IssuePlan,
    observer: &mut dyn PipelineObserver,
) -> SimResult<()> {
    let seq = runner.seq;
    cpu.rob.mark_issued(seq, cpu.cycle, plan.store_addrs)?;
    let writes = runner.instruction.write_registers();
    cpu.pending_writes.add(writes);
    if cpu.pipeline.renaming {
        for reg in writes.iter() {
            if cpu.rename.allocate(seq, reg).is_none() {
                return Err(InvariantViolation::Unreachable("rename slot vanished after check").into());
            }
        }
        if plan.renamed {
            cpu.stats.renames += 1;
        }
    }
    cpu.stats.rename_bypasses += plan.bypasses;

    if let Some((reg, producer)) = plan.forward {
        let outbox = cpu
            .rob
            .get(producer)
            .map(|e| e.outbox.clone())
            .ok_or(InvariantViolation::UnknownSequence(producer.0))?;
        if !outbox.attach() {
            return Err(InvariantViolation::Unreachable("forwarding mailbox already attached").into());
        }
        runner.forward_in = Some((reg, outbox));
        cpu.stats.forwards += 1;
    }
    runner.ctx = plan.ctx;

    observer.on_issue(cpu.id, cpu.cycle, seq, runner.pc);
    if cpu.issue_bus.add(runner).is_err() {
        return Err(InvariantViolation::Unreachable("execute bus rejected a checked add").into());
    }
    Ok(())
}

/// Executes the issue stage.
///
/// # Errors
///
/// Propagates ROB and rename bookkeeping violations.
pub fn issue_stage(cpu: &mut Cpu, observer: &mut dyn PipelineObserver) -> SimResult<()> {
    let width = cpu.pipeline.width;
    let mut issued = 0;
    let mut control_issued = false;

    let mut i = 0;
    while i < cpu.issue.pending.len() && issued < width && !control_issued && cpu.issue_bus.can_add() {
        let decision = match cpu.issue.pending.get(i) {
            Some(runner) => decide(cpu, runner),
            None => break,
        };
        match decision {
            IssueDecision::Issue(plan) => {
                let runner = cpu
                    .issue
                    .pending
                    .remove(i)
                    .ok_or(InvariantViolation::Unreachable("pending entry vanished"))?;
                control_issued = runner.kind().is_control();
                dispatch(cpu, runner, plan, observer)?;
                issued += 1;
            }
            IssueDecision::Hold(reason) => {
                if let Some(runner) = cpu.issue.pending.get(i) {
                    observer.on_stall(cpu.id, cpu.cycle, runner.seq, reason);
                }
                cpu.stats.stalls += 1;
                i += 1;
            }
        }
    }

    while issued < width && !control_issued && cpu.issue_bus.can_add() && !cpu.issue.pending.is_full() {
        let Some(runner) = cpu.decode_bus.get() else {
            break;
        };
        cpu.rob.insert(RobEntry::waiting(&runner));
        match decide(cpu, &runner) {
            IssueDecision::Issue(plan) => {
                control_issued = runner.kind().is_control();
                dispatch(cpu, runner, plan, observer)?;
                issued += 1;
            }
            IssueDecision::Hold(reason) => {
                observer.on_stall(cpu.id, cpu.cycle, runner.seq, reason);
                cpu.stats.stalls += 1;
                if cpu.issue.pending.push(runner).is_err() {
                    return Err(InvariantViolation::Unreachable("pending queue rejected a checked push").into());
                }
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Variant};
    use crate::core::pipeline::traits::NullObserver;
    use crate::isa::asm::assemble;
    use crate::isa::program::Program;

    fn decoded(cpu: &mut Cpu, program: &Program) {
        for (pc, inst) in program.iter() {
            let seq = cpu.decode.next_seq;
            cpu.decode.next_seq = seq.next();
            cpu.decode_bus
                .add(Runner::new(seq, pc, inst.clone(), None))
                .unwrap();
        }
        cpu.decode_bus.connect();
    }

    #[test]
    fn independent_bundle_issues_together() {
        let program = assemble("addi a0, zero, 1\naddi a1, zero, 2\naddi a2, zero, 3\n").unwrap();
        let mut cpu = Cpu::new(0, &Config::for_variant(Variant::Superscalar));
        cpu.cycle = 1;
        decoded(&mut cpu, &program);
        issue_stage(&mut cpu, &mut NullObserver).unwrap();
        assert_eq!(cpu.issue_bus.len(), 3);
        assert_eq!(cpu.rob.len(), 3);
        assert!(cpu.issue.pending.is_empty());
    }

    #[test]
    fn dependent_fresh_runner_parks_in_pending() {
        let program = assemble("addi a0, zero, 1\nadd a1, a0, a0\naddi a2, zero, 3\n").unwrap();
        let mut config = Config::for_variant(Variant::Superscalar);
        config.pipeline.forwarding = false;
        config.pipeline.renaming = false;
        let mut cpu = Cpu::new(0, &config);
        cpu.cycle = 1;
        decoded(&mut cpu, &program);
        issue_stage(&mut cpu, &mut NullObserver).unwrap();
        assert_eq!(cpu.issue_bus.len(), 1);
        assert_eq!(cpu.issue.pending.len(), 1);
        assert_eq!(cpu.rob.len(), 2);
        assert_eq!(cpu.stats.stalls, 1);
    }

    #[test]
    fn forwarding_attaches_next_cycle() {
        let program = assemble("addi a0, zero, 1\nadd a1, a0, a0\n").unwrap();
        let mut config = Config::for_variant(Variant::Superscalar);
        config.pipeline.renaming = false;
        let mut cpu = Cpu::new(0, &config);
        cpu.cycle = 1;
        decoded(&mut cpu, &program);
        issue_stage(&mut cpu, &mut NullObserver).unwrap();
        assert_eq!(cpu.issue.pending.len(), 1);
        cpu.cycle = 2;
        issue_stage(&mut cpu, &mut NullObserver).unwrap();
        assert!(cpu.issue.pending.is_empty());
        assert_eq!(cpu.stats.forwards, 1);
    }
}
