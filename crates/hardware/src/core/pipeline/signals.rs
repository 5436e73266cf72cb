//! Records carried between pipeline units.
//!
//! 1. **Sequence IDs:** Program-order stamps assigned at decode.
//! 2. **Runners:** Instructions in flight from decode to execute.
//! 3. **Completions:** Executed results in flight to write-back.
//! 4. **Branch Events:** Resolution and flush signals raised by execute.

use std::fmt;

use crate::common::error::ProgramError;
use crate::common::reg::RegisterId;
use crate::core::pipeline::forward::ForwardMailbox;
use crate::isa::instruction::{ExecutionContext, ExecutionResult, InstructionType};
use crate::isa::program::InstructionRef;

/// Monotonic program-order stamp assigned at decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SeqId(pub u64);

impl SeqId {
    /// The stamp following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SeqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An instruction in flight between decode and execute.
#[derive(Clone, Debug)]
pub struct Runner {
    /// Program-order stamp.
    pub seq: SeqId,
    /// Fetch address.
    pub pc: u32,
    /// Shared immutable descriptor.
    pub instruction: InstructionRef,
    /// BTB target used at decode, if the fetch stream was redirected.
    pub prediction: Option<u32>,
    /// Operand snapshot captured at issue.
    pub ctx: ExecutionContext,
    /// Register still owed by a forwarding producer.
    pub forward_in: Option<(RegisterId, ForwardMailbox)>,
    /// This instruction's outbound mailbox.
    pub outbox: ForwardMailbox,
}

impl Runner {
    /// Creates a runner for a freshly decoded instruction.
    pub fn new(seq: SeqId, pc: u32, instruction: InstructionRef, prediction: Option<u32>) -> Self {
        Self {
            seq,
            pc,
            instruction,
            prediction,
            ctx: ExecutionContext::default(),
            forward_in: None,
            outbox: ForwardMailbox::new(),
        }
    }

    /// Pipeline class of the wrapped instruction.
    #[inline]
    pub fn kind(&self) -> InstructionType {
        self.instruction.instruction_type()
    }
}

/// An executed instruction in flight to write-back.
///
/// Program errors ride along in `outcome` and are raised only at retirement.
#[derive(Clone, Debug)]
pub struct Completion {
    /// Program-order stamp.
    pub seq: SeqId,
    /// Fetch address.
    pub pc: u32,
    /// Architectural effects, or the deferred fault.
    pub outcome: Result<ExecutionResult, ProgramError>,
}

/// Redirect request raised by a mispredicted control instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushSignal {
    /// The mispredicted instruction; everything younger is discarded.
    pub seq: SeqId,
    /// Correct next fetch address.
    pub target: u32,
    /// Whether fetch actually changes course; `false` when a stalled
    /// front end simply resumes at the fall-through address.
    pub redirect: bool,
}

/// Control-flow outcome reported by an execute unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchEvent {
    /// The prediction held; decode may resume if it was waiting on `seq`.
    Resolved(SeqId),
    /// The prediction failed.
    Flush(FlushSignal),
}
