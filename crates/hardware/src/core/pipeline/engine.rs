//! Per-core cycle driver.
//!
//! `tick` advances one core by one cycle:
//! 1. **Latches:** Every bus is connected so last cycle's output becomes visible.
//! 2. **Front End:** Fetch, then decode.
//! 3. **Back End:** Issue, coherence snooping, execute.
//! 4. **Redirect:** The oldest flush raised by execute discards younger work
//!    and restarts fetch at the corrected address.
//! 5. **Commit:** Write-back retires from the ROB head.
//!
//! A core that has finished keeps answering coherence requests from its peers.

use crate::common::error::SimResult;
use crate::core::Cpu;
use crate::core::pipeline::signals::{BranchEvent, FlushSignal, SeqId};
use crate::core::pipeline::stages::{
    decode_stage, execute_stage, fetch_stage, issue_stage, writeback_stage,
};
use crate::core::pipeline::traits::PipelineObserver;
use crate::isa::program::Program;
use crate::soc::System;

/// Advances `cpu` by one cycle.
///
/// # Errors
///
/// A program error raised at retirement, or an invariant violation from any unit.
pub fn tick(
    cpu: &mut Cpu,
    sys: &mut System,
    program: &Program,
    observer: &mut dyn PipelineObserver,
) -> SimResult<()> {
    if cpu.done {
        cpu.dcache.snoop(sys, &mut cpu.stats)?;
        return Ok(());
    }
    cpu.cycle += 1;
    cpu.stats.cycles = cpu.cycle;

    cpu.fetch_bus.connect();
    cpu.decode_bus.connect();
    cpu.issue_bus.connect();
    cpu.execute_bus.connect();

    fetch_stage(cpu, program, observer);
    decode_stage(cpu, program, observer)?;
    issue_stage(cpu, observer)?;
    cpu.dcache.snoop(sys, &mut cpu.stats)?;
    let events = execute_stage(cpu, sys, program, observer)?;

    let mut oldest: Option<FlushSignal> = None;
    for event in events {
        match event {
            BranchEvent::Resolved(seq) => cpu.decode.resolved(seq),
            BranchEvent::Flush(signal) => {
                if oldest.is_none_or(|o| signal.seq < o.seq) {
                    oldest = Some(signal);
                }
            }
        }
    }
    if let Some(signal) = oldest {
        flush_pipeline(cpu, sys, signal, observer)?;
    }

    writeback_stage(cpu, sys, observer)?;
    cpu.done = cpu.terminated || is_drained(cpu);
    Ok(())
}

/// Redirects fetch to `signal.target` and discards everything younger than `signal.seq`.
///
/// # Errors
///
/// Propagates cache lock bookkeeping violations from aborted loads.
pub fn flush_pipeline(
    cpu: &mut Cpu,
    sys: &mut System,
    signal: FlushSignal,
    observer: &mut dyn PipelineObserver,
) -> SimResult<()> {
    cpu.fetch.flush(signal.target);
    let squashed = squash_after(cpu, sys, signal.seq)?;
    cpu.decode.blocked_on = None;
    if signal.redirect {
        cpu.stats.flushes += 1;
    }
    cpu.stats.squashed += squashed as u64;
    observer.on_flush(cpu.id, cpu.cycle, signal, squashed);
    Ok(())
}

/// Discards every in-flight instruction younger than `boundary`.
///
/// Fetched addresses are dropped too. Returns how many decoded instructions
/// were discarded.
///
/// # Errors
///
/// Propagates cache lock bookkeeping violations from aborted loads.
pub fn squash_after(cpu: &mut Cpu, sys: &mut System, boundary: SeqId) -> SimResult<usize> {
    let mut squashed = cpu.decode_bus.len();
    cpu.fetch_bus.flush();
    cpu.decode_bus.flush();
    cpu.issue.pending.retain(|r| r.seq <= boundary);
    cpu.issue_bus.retain(|r| r.seq <= boundary);
    cpu.execute_bus.retain(|c| c.seq <= boundary);
    for unit in &mut cpu.execute {
        unit.abort_newer(boundary, &mut cpu.dcache, sys)?;
    }
    squashed += cpu.rob.flush_after(boundary);
    cpu.rename.discard_newer(boundary);
    cpu.pending_writes = cpu.rob.pending_writes();
    cpu.bru.discard_newer(boundary);
    Ok(squashed)
}

/// Whether the program has run off its end and nothing is left in flight.
fn is_drained(cpu: &Cpu) -> bool {
    cpu.fetch.complete
        && cpu.fetch_bus.is_empty()
        && cpu.decode_bus.is_empty()
        && cpu.issue_bus.is_empty()
        && cpu.execute_bus.is_empty()
        && cpu.issue.pending.is_empty()
        && cpu.rob.is_empty()
        && cpu.execute.iter().all(|u| u.is_idle())
        && !cpu.writeback.is_committing()
}
