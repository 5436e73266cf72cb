//! Reorder Buffer (ROB) for in-order retirement.
//!
//! The ROB tracks every instruction the issue unit has taken off the decode bus
//! and not yet retired, keyed by sequence ID. It provides:
//! 1. **Program Order:** Ordered iteration and "latest older writer" queries for hazard detection.
//! 2. **Completion:** Outcomes recorded by write-back, retired strictly from the head.
//! 3. **Memory Footprint:** Store addresses, known at issue or on completion.
//! 4. **Flush:** Sequence-bounded discard after a misprediction.

use std::collections::BTreeMap;

use crate::common::error::{InvariantViolation, ProgramError};
use crate::common::reg::{PendingWrites, RegSet, RegisterId};
use crate::core::pipeline::forward::ForwardMailbox;
use crate::core::pipeline::signals::{Runner, SeqId};
use crate::isa::instruction::{ExecutionResult, InstructionType};

/// Lifecycle state of an ROB entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RobState {
    /// Taken off the decode bus but stalled in the pending queue.
    #[default]
    Waiting,
    /// Dispatched to execute during `cycle`.
    Issued {
        /// Cycle of dispatch.
        cycle: u64,
    },
    /// Executed; outcome recorded, waiting to retire.
    Completed,
}

/// A single entry in the Reorder Buffer.
#[derive(Clone, Debug)]
pub struct RobEntry {
    /// Program-order stamp.
    pub seq: SeqId,
    /// Fetch address.
    pub pc: u32,
    /// Pipeline class.
    pub kind: InstructionType,
    /// Registers read.
    pub reads: RegSet,
    /// Registers written.
    pub writes: RegSet,
    /// Current lifecycle state.
    pub state: RobState,
    /// Store footprint, `None` while unknown.
    pub store_addrs: Option<Vec<u32>>,
    /// The instruction's outbound forwarding mailbox.
    pub outbox: ForwardMailbox,
    /// Executed outcome, present once completed.
    pub outcome: Option<Result<ExecutionResult, ProgramError>>,
}

impl RobEntry {
    /// A waiting entry for a runner just taken off the decode bus.
    pub fn waiting(runner: &Runner) -> Self {
        Self {
            seq: runner.seq,
            pc: runner.pc,
            kind: runner.kind(),
            reads: runner.instruction.read_registers(),
            writes: runner.instruction.write_registers(),
            state: RobState::Waiting,
            store_addrs: None,
            outbox: runner.outbox.clone(),
            outcome: None,
        }
    }

    /// Whether the entry has been dispatched (issued or completed).
    #[inline]
    pub const fn is_issued(&self) -> bool {
        !matches!(self.state, RobState::Waiting)
    }

    /// Whether the entry holds a store.
    #[inline]
    pub fn is_store(&self) -> bool {
        self.kind == InstructionType::Store
    }

    /// Register value produced by a completed entry.
    pub fn produced(&self, reg: RegisterId) -> Option<i32> {
        match &self.outcome {
            Some(Ok(res)) => res
                .register_change
                .filter(|(r, _)| *r == reg)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Whether this store may touch any of `addrs`. Unknown footprints overlap.
    pub fn store_overlaps(&self, addrs: &[u32]) -> bool {
        match &self.store_addrs {
            Some(mine) => mine.iter().any(|a| addrs.contains(a)),
            None => true,
        }
    }
}

/// Reorder Buffer keyed by sequence ID.
#[derive(Debug, Default)]
pub struct Rob {
    entries: BTreeMap<SeqId, RobEntry>,
}

impl Rob {
    /// Creates an empty ROB.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of in-flight entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is in flight.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a freshly decoded instruction.
    pub fn insert(&mut self, entry: RobEntry) {
        let _ = self.entries.insert(entry.seq, entry);
    }

    /// Looks up an entry.
    pub fn get(&self, seq: SeqId) -> Option<&RobEntry> {
        self.entries.get(&seq)
    }

    /// Looks up an entry mutably.
    pub fn get_mut(&mut self, seq: SeqId) -> Option<&mut RobEntry> {
        self.entries.get_mut(&seq)
    }

    /// Oldest in-flight entry.
    pub fn head(&self) -> Option<&RobEntry> {
        self.entries.values().next()
    }

    /// Removes and returns the oldest entry.
    pub fn pop_head(&mut self) -> Option<RobEntry> {
        self.entries.pop_first().map(|(_, e)| e)
    }

    /// Entries older than `seq`, oldest first.
    pub fn older(&self, seq: SeqId) -> impl DoubleEndedIterator<Item = &RobEntry> {
        self.entries.range(..seq).map(|(_, e)| e)
    }

    /// Every entry, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &RobEntry> {
        self.entries.values()
    }

    /// Youngest entry older than `seq` that writes `reg`.
    pub fn latest_writer(&self, seq: SeqId, reg: RegisterId) -> Option<&RobEntry> {
        self.older(seq).rev().find(|e| e.writes.contains(reg))
    }

    /// Marks an entry dispatched in `cycle`.
    ///
    /// # Errors
    ///
    /// `UnknownSequence` when `seq` is not in flight.
    pub fn mark_issued(
        &mut self,
        seq: SeqId,
        cycle: u64,
        store_addrs: Option<Vec<u32>>,
    ) -> Result<(), InvariantViolation> {
        let entry = self
            .entries
            .get_mut(&seq)
            .ok_or(InvariantViolation::UnknownSequence(seq.0))?;
        entry.state = RobState::Issued { cycle };
        entry.store_addrs = store_addrs;
        Ok(())
    }

    /// Records an executed outcome.
    ///
    /// A completed store's footprint becomes known even if it was not at issue.
    ///
    /// # Errors
    ///
    /// `UnknownSequence` when `seq` is not in flight.
    pub fn complete(
        &mut self,
        seq: SeqId,
        outcome: Result<ExecutionResult, ProgramError>,
    ) -> Result<(), InvariantViolation> {
        let entry = self
            .entries
            .get_mut(&seq)
            .ok_or(InvariantViolation::UnknownSequence(seq.0))?;
        if let Ok(res) = &outcome {
            if entry.is_store() {
                entry.store_addrs = Some(res.memory_change.iter().map(|(a, _)| *a).collect());
            }
        }
        entry.state = RobState::Completed;
        entry.outcome = Some(outcome);
        Ok(())
    }

    /// Discards every entry younger than `boundary`. Returns how many were dropped.
    pub fn flush_after(&mut self, boundary: SeqId) -> usize {
        let dropped = self.entries.split_off(&boundary.next());
        dropped.len()
    }

    /// Discards everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Rebuilds the pending-write table from the dispatched entries.
    pub fn pending_writes(&self) -> PendingWrites {
        let mut pw = PendingWrites::new();
        for e in self.entries.values().filter(|e| e.is_issued()) {
            pw.add(e.writes);
        }
        pw
    }
}
