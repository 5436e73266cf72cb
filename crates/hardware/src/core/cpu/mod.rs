//! CPU Core Definition and Initialization.
//!
//! This module defines the `Cpu` structure, the container for one core's state:
//! 1. **Architectural State:** The register file, written only at retirement.
//! 2. **Pipeline Control:** Inter-stage buses, the reorder buffer, pending writes and rename slots.
//! 3. **Units:** Fetch, decode, issue, execute and write-back, plus the branch unit and the
//!    private data cache controller.
//!
//! Memory and the coherence directory are shared between cores and live in
//! `soc::System`; they are passed to every tick instead of being owned here.

use crate::common::error::SimResult;
use crate::common::reg::{PendingWrites, RegisterFile, RegisterId};
use crate::config::{Config, PipelineConfig};
use crate::core::pipeline::engine;
use crate::core::pipeline::latches::Bus;
use crate::core::pipeline::rename::RenameTable;
use crate::core::pipeline::rob::Rob;
use crate::core::pipeline::signals::{Completion, Runner};
use crate::core::pipeline::stages::decode::DecodeUnit;
use crate::core::pipeline::stages::execute::ExecuteUnit;
use crate::core::pipeline::stages::fetch::FetchUnit;
use crate::core::pipeline::stages::issue::IssueUnit;
use crate::core::pipeline::stages::writeback::WritebackUnit;
use crate::core::pipeline::traits::PipelineObserver;
use crate::core::units::bru::BranchUnit;
use crate::core::units::cache::CacheController;
use crate::isa::program::Program;
use crate::soc::System;
use crate::stats::SimStats;

/// One simulated core.
#[derive(Debug)]
pub struct Cpu {
    /// Core index; also the initial value of `tp`.
    pub id: usize,
    /// Architectural registers.
    pub regs: RegisterFile,
    /// In-flight writers per register.
    pub pending_writes: PendingWrites,
    /// Reorder buffer.
    pub rob: Rob,
    /// Physical rename slots.
    pub rename: RenameTable,
    /// Pipeline shape and features.
    pub pipeline: PipelineConfig,

    /// Fetch unit.
    pub fetch: FetchUnit,
    /// Decode unit.
    pub decode: DecodeUnit,
    /// Issue unit.
    pub issue: IssueUnit,
    /// Execute units.
    pub execute: Vec<ExecuteUnit>,
    /// Write-back unit.
    pub writeback: WritebackUnit,
    /// Branch unit.
    pub bru: BranchUnit,
    /// Private data cache and coherence agent.
    pub dcache: CacheController,

    /// Fetch -> decode.
    pub fetch_bus: Bus<u32>,
    /// Decode -> issue.
    pub decode_bus: Bus<Runner>,
    /// Issue -> execute.
    pub issue_bus: Bus<Runner>,
    /// Execute -> write-back.
    pub execute_bus: Bus<Completion>,

    /// Cycles this core has run.
    pub cycle: u64,
    /// Performance statistics.
    pub stats: SimStats,
    /// A `ret` with `ra == 0` has retired.
    pub terminated: bool,
    /// Nothing is left to do; the core only answers coherence requests.
    pub done: bool,
}

impl Cpu {
    /// Creates core `id` with zeroed registers, except `tp` which holds `id`.
    ///
    /// # Arguments
    ///
    /// * `id` - Core index.
    /// * `config` - The simulator configuration.
    pub fn new(id: usize, config: &Config) -> Self {
        let p = &config.pipeline;
        let mut regs = RegisterFile::new();
        regs.write(RegisterId::TP, i32::try_from(id).unwrap_or(i32::MAX));

        Self {
            id,
            regs,
            pending_writes: PendingWrites::new(),
            rob: Rob::new(),
            rename: RenameTable::new(p.physical_registers),
            pipeline: p.clone(),
            fetch: FetchUnit::new(config),
            decode: DecodeUnit::new(),
            issue: IssueUnit::new(p.pending_queue_size),
            execute: (0..p.execute_units).map(|_| ExecuteUnit::default()).collect(),
            writeback: WritebackUnit::new(),
            bru: BranchUnit::new(config),
            dcache: CacheController::new(id, config),
            fetch_bus: Bus::new(p.width),
            decode_bus: Bus::new(p.width),
            issue_bus: Bus::new(p.width),
            execute_bus: Bus::new(p.execute_units),
            cycle: 0,
            stats: SimStats::default(),
            terminated: false,
            done: false,
        }
    }

    /// Advances the core by one cycle.
    ///
    /// # Errors
    ///
    /// A program error raised at retirement, or a simulator invariant violation.
    pub fn tick(
        &mut self,
        sys: &mut System,
        program: &Program,
        observer: &mut dyn PipelineObserver,
    ) -> SimResult<()> {
        engine::tick(self, sys, program, observer)
    }
}
