//! `tracing` sink for pipeline events.

use tracing::{debug, trace};

use crate::core::pipeline::hazards::StallReason;
use crate::core::pipeline::signals::{FlushSignal, SeqId};
use crate::core::pipeline::traits::PipelineObserver;
use crate::isa::instruction::Instruction;

/// Forwards every pipeline event to `tracing`.
///
/// Per-instruction stage events are emitted at `trace`; stalls and flushes at `debug`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_fetch(&mut self, core: usize, cycle: u64, pc: u32) {
        trace!(core, cycle, pc = format_args!("{pc:#x}"), "fetch");
    }

    fn on_decode(&mut self, core: usize, cycle: u64, seq: SeqId, pc: u32, inst: &dyn Instruction) {
        trace!(core, cycle, %seq, pc = format_args!("{pc:#x}"), inst = %inst, "decode");
    }

    fn on_issue(&mut self, core: usize, cycle: u64, seq: SeqId, pc: u32) {
        trace!(core, cycle, %seq, pc = format_args!("{pc:#x}"), "issue");
    }

    fn on_execute(&mut self, core: usize, cycle: u64, seq: SeqId, pc: u32) {
        trace!(core, cycle, %seq, pc = format_args!("{pc:#x}"), "execute");
    }

    fn on_retire(&mut self, core: usize, cycle: u64, seq: SeqId, pc: u32) {
        trace!(core, cycle, %seq, pc = format_args!("{pc:#x}"), "retire");
    }

    fn on_stall(&mut self, core: usize, cycle: u64, seq: SeqId, reason: StallReason) {
        debug!(core, cycle, %seq, %reason, "stall");
    }

    fn on_flush(&mut self, core: usize, cycle: u64, signal: FlushSignal, squashed: usize) {
        debug!(
            core,
            cycle,
            seq = %signal.seq,
            target = format_args!("{:#x}", signal.target),
            redirect = signal.redirect,
            squashed,
            "flush"
        );
    }
}
