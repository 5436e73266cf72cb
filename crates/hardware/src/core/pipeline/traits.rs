//! Pipeline Observation Interface.
//!
//! Stages report what they do through an injected `PipelineObserver` instead
//! of printing. Every hook has an empty default, so observers implement only
//! the events they care about. Observers never influence control flow.

use std::fmt;

use crate::core::pipeline::hazards::StallReason;
use crate::core::pipeline::signals::{FlushSignal, SeqId};
use crate::isa::instruction::Instruction;

/// Receives stage events from every core.
///
/// `core` is the core index and `cycle` the global cycle the event happened in.
pub trait PipelineObserver: fmt::Debug {
    /// An address was fetched and placed on the decode bus.
    fn on_fetch(&mut self, _core: usize, _cycle: u64, _pc: u32) {}

    /// An instruction was decoded and stamped.
    fn on_decode(&mut self, _core: usize, _cycle: u64, _seq: SeqId, _pc: u32, _inst: &dyn Instruction) {}

    /// An instruction left the issue unit.
    fn on_issue(&mut self, _core: usize, _cycle: u64, _seq: SeqId, _pc: u32) {}

    /// An instruction finished executing.
    fn on_execute(&mut self, _core: usize, _cycle: u64, _seq: SeqId, _pc: u32) {}

    /// An instruction retired.
    fn on_retire(&mut self, _core: usize, _cycle: u64, _seq: SeqId, _pc: u32) {}

    /// The issue unit held an instruction.
    fn on_stall(&mut self, _core: usize, _cycle: u64, _seq: SeqId, _reason: StallReason) {}

    /// The pipeline was flushed after `signal`, discarding `squashed` instructions.
    fn on_flush(&mut self, _core: usize, _cycle: u64, _signal: FlushSignal, _squashed: usize) {}
}

/// Observer that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}
