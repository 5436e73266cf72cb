//! Issue-time Hazard Detection, Forwarding and Renaming.
//!
//! Decides whether a candidate instruction may leave the issue unit this cycle.
//! It checks, in order:
//! 1. **Ordering:** Conflicts with older instructions skipped this cycle (still waiting in the ROB).
//! 2. **Control:** Control instructions issue only behind nothing skipped; `ret` only at the ROB head.
//! 3. **Data Hazards:** RAW against in-flight writers, resolved by rename bypass or forwarding.
//! 4. **WAW:** Resolved by renaming, otherwise a stall. Older skipped writers
//!    keep one physical slot each in reserve.
//! 5. **Memory Hazards:** Loads wait for older stores that may alias.
//!
//! The outcome is an `IssuePlan` carrying the operand snapshot the instruction
//! will execute with, or the `StallReason` it is held for.

use std::fmt;

use crate::common::reg::{PendingWrites, RegisterFile, RegisterId};
use crate::core::pipeline::rename::RenameTable;
use crate::core::pipeline::rob::{Rob, RobState};
use crate::core::pipeline::signals::{Runner, SeqId};
use crate::isa::instruction::{ExecutionContext, InstructionType};

/// Why a candidate was held in the issue unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StallReason {
    /// Register conflict with an older instruction skipped this cycle.
    Ordering,
    /// Control instruction behind a skipped instruction, or `ret` not at the ROB head.
    Control,
    /// RAW dependency that neither bypass nor forwarding can satisfy.
    DataHazard,
    /// WAW dependency without renaming.
    WriteAfterWrite,
    /// Renaming is enabled but every physical slot is taken.
    NoFreeSlot,
    /// A load may alias an older store.
    MemoryHazard,
}

impl StallReason {
    /// Short name used in traces.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ordering => "ordering",
            Self::Control => "control",
            Self::DataHazard => "data",
            Self::WriteAfterWrite => "waw",
            Self::NoFreeSlot => "no-free-slot",
            Self::MemoryHazard => "memory",
        }
    }
}

impl fmt::Display for StallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an issuing instruction gets its operands.
#[derive(Clone, Debug, PartialEq)]
pub struct IssuePlan {
    /// Operand snapshot: register file plus bypassed slot values.
    pub ctx: ExecutionContext,
    /// Register still owed by a producer, delivered through its mailbox.
    pub forward: Option<(RegisterId, SeqId)>,
    /// Whether a physical slot resolves a WAW hazard.
    pub renamed: bool,
    /// Operands read from completed physical slots.
    pub bypasses: u64,
    /// Store footprint, when computable at issue.
    pub store_addrs: Option<Vec<u32>>,
}

/// Verdict for one candidate.
#[derive(Clone, Debug, PartialEq)]
pub enum IssueDecision {
    /// Dispatch with this plan.
    Issue(IssuePlan),
    /// Keep waiting.
    Hold(StallReason),
}

/// Read-only view of the core state the issue unit consults.
#[derive(Clone, Copy, Debug)]
pub struct HazardView<'a> {
    /// In-flight instructions.
    pub rob: &'a Rob,
    /// Registers with dispatched, unretired writers.
    pub pending: &'a PendingWrites,
    /// Physical slot pool.
    pub rename: &'a RenameTable,
    /// Architectural register file.
    pub regs: &'a RegisterFile,
    /// Current cycle.
    pub cycle: u64,
    /// Forwarding enabled.
    pub forwarding: bool,
    /// Renaming enabled.
    pub renaming: bool,
}

/// Classifies `runner` against the in-flight state.
///
/// # Arguments
///
/// * `runner` - Candidate, already registered in the ROB.
/// * `view` - Core state snapshot.
///
/// # Returns
///
/// `Issue` with the operand plan, or `Hold` with the first hazard found.
pub fn classify(runner: &Runner, view: &HazardView<'_>) -> IssueDecision {
    let inst = &runner.instruction;
    let seq = runner.seq;
    let kind = runner.kind();
    let reads = inst.read_registers();
    let writes = inst.write_registers();

    let mut reserved = 0;
    for skipped in view.rob.older(seq).filter(|e| !e.is_issued()) {
        if !skipped.writes.is_empty() {
            reserved += 1;
        }
        if kind.is_control() {
            return IssueDecision::Hold(StallReason::Control);
        }
        if skipped.writes.intersects(reads)
            || skipped.reads.intersects(writes)
            || skipped.writes.intersects(writes)
        {
            return IssueDecision::Hold(StallReason::Ordering);
        }
        if kind == InstructionType::Load && skipped.is_store() {
            return IssueDecision::Hold(StallReason::MemoryHazard);
        }
    }
    if kind == InstructionType::Return && view.rob.head().map(|h| h.seq) != Some(seq) {
        return IssueDecision::Hold(StallReason::Control);
    }

    let mut snapshot = *view.regs;
    let mut bypasses = 0;
    let mut forward = None;
    let mut renamed = false;

    if view.pending.any_pending(reads.union(writes)) {
        let mut unresolved = Vec::new();
        for reg in reads.iter().filter(|r| view.pending.is_pending(*r)) {
            let Some(writer) = view.rob.latest_writer(seq, reg) else {
                continue;
            };
            let slot_value = (view.renaming && writer.state == RobState::Completed)
                .then(|| view.rename.value_of(writer.seq))
                .flatten();
            match slot_value {
                Some(value) => {
                    snapshot.write(reg, value);
                    bypasses += 1;
                }
                None => unresolved.push((reg, writer)),
            }
        }

        match unresolved.as_slice() {
            [] => {}
            [(reg, producer)] if view.forwarding => {
                let fresh = matches!(producer.state, RobState::Issued { cycle } if cycle + 1 == view.cycle);
                if !fresh || producer.outbox.is_attached() {
                    return IssueDecision::Hold(StallReason::DataHazard);
                }
                forward = Some((*reg, producer.seq));
            }
            _ => return IssueDecision::Hold(StallReason::DataHazard),
        }

        if view.pending.any_pending(writes) {
            if !view.renaming {
                return IssueDecision::Hold(StallReason::WriteAfterWrite);
            }
            renamed = true;
        }
    }

    // Older skipped writers keep a slot each so out-of-order issue cannot starve them.
    if view.renaming && !writes.is_empty() && view.rename.free_slots() <= reserved {
        return IssueDecision::Hold(StallReason::NoFreeSlot);
    }

    let ctx = ExecutionContext::new(snapshot);
    if kind == InstructionType::Load {
        let blocked = if forward.is_some() {
            view.rob.older(seq).any(|e| e.is_store())
        } else {
            let addrs = inst.memory_read_addresses(&ctx);
            view.rob
                .older(seq)
                .any(|e| e.is_store() && e.store_overlaps(&addrs))
        };
        if blocked {
            return IssueDecision::Hold(StallReason::MemoryHazard);
        }
    }

    let store_addrs = (kind == InstructionType::Store && forward.is_none())
        .then(|| inst.memory_write_addresses(&ctx));

    IssueDecision::Issue(IssuePlan {
        ctx,
        forward,
        renamed,
        bypasses,
        store_addrs,
    })
}
