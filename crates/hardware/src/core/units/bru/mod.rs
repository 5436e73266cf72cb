//! Branch Unit.
//!
//! Tracks what the front end assumed about every in-flight control instruction
//! and decides, once it executes, whether the pipeline must be flushed:
//! 1. **Prediction:** `predict` consults the BTB at decode for jumps and returns.
//! 2. **Expectations:** `assert` records, per sequence ID, the next PC the front end committed to.
//! 3. **Verification:** `should_flush_pipeline` compares the expectation with the actual next PC.
//! 4. **Training:** Resolved jump targets are written back into the BTB.

/// Branch Target Buffer.
pub mod btb;

use std::collections::HashMap;

use self::btb::Btb;
use crate::common::constants::INSTRUCTION_WIDTH;
use crate::config::Config;
use crate::core::pipeline::signals::{Runner, SeqId};
use crate::isa::instruction::InstructionType;
use crate::stats::SimStats;

/// Next PC the front end assumed for a control instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expectation {
    /// Fetch continued from this address.
    Known(u32),
    /// Decode stalled; nothing was assumed and resolution always restarts fetch.
    Unknown,
}

/// Per-core branch unit.
#[derive(Debug)]
pub struct BranchUnit {
    /// Present only when prediction is enabled.
    btb: Option<Btb>,
    expectations: HashMap<SeqId, Expectation>,
}

impl BranchUnit {
    /// Creates the branch unit described by `config.pipeline`.
    pub fn new(config: &Config) -> Self {
        let p = &config.pipeline;
        Self {
            btb: p.branch_prediction.then(|| Btb::new(p.btb_size)),
            expectations: HashMap::new(),
        }
    }

    /// Whether branch prediction is enabled.
    pub const fn predicts(&self) -> bool {
        self.btb.is_some()
    }

    /// Predicted target for the jump or return at `pc`.
    pub fn predict(&self, pc: u32, stats: &mut SimStats) -> Option<u32> {
        let target = self.btb.as_ref()?.lookup(pc)?;
        stats.btb_predictions += 1;
        Some(target)
    }

    /// Records what the front end assumed about `runner`.
    ///
    /// Called by an execute unit before running a control instruction.
    pub fn assert(&mut self, runner: &Runner) {
        let expectation = match runner.kind() {
            InstructionType::ConditionalBranch if self.predicts() => {
                Expectation::Known(runner.pc.wrapping_add(INSTRUCTION_WIDTH))
            }
            InstructionType::Jump | InstructionType::Return => match runner.prediction {
                Some(target) => Expectation::Known(target),
                None => Expectation::Unknown,
            },
            _ => Expectation::Unknown,
        };
        let _ = self.expectations.insert(runner.seq, expectation);
    }

    /// Consumes the expectation for `seq` and reports whether `actual` contradicts it.
    ///
    /// Unknown or missing expectations always flush: decode is blocked on them
    /// and the redirect is what restarts fetch.
    pub fn should_flush_pipeline(&mut self, seq: SeqId, actual: u32, stats: &mut SimStats) -> bool {
        match self.expectations.remove(&seq) {
            Some(Expectation::Known(expected)) if expected == actual => false,
            Some(Expectation::Known(_)) => {
                stats.btb_mispredictions += 1;
                true
            }
            _ => true,
        }
    }

    /// Whether the front end kept fetching past `seq` on an assumed next PC.
    pub fn speculated(&self, seq: SeqId) -> bool {
        matches!(self.expectations.get(&seq), Some(Expectation::Known(_)))
    }

    /// Drops the expectation for `seq` without verifying it.
    pub fn forget(&mut self, seq: SeqId) {
        let _ = self.expectations.remove(&seq);
    }

    /// Trains the BTB with a resolved jump or return.
    pub fn notify_jump_resolved(&mut self, from: u32, to: u32) {
        if let Some(btb) = self.btb.as_mut() {
            btb.update(from, to);
        }
    }

    /// Counts a resolved conditional branch.
    pub fn notify_conditional(&mut self, taken: bool, stats: &mut SimStats) {
        stats.branches += 1;
        if taken {
            stats.branches_taken += 1;
        }
    }

    /// Drops every expectation younger than `boundary`.
    pub fn discard_newer(&mut self, boundary: SeqId) {
        self.expectations.retain(|seq, _| *seq <= boundary);
    }

    /// Number of unresolved control instructions being tracked.
    pub fn outstanding(&self) -> usize {
        self.expectations.len()
    }
}
