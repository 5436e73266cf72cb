//! Simulator: owns every core and the shared system side by side.
//!
//! Cores and the `System` are kept in separate fields so each core can be
//! stepped with mutable access to shared memory and the coherence directory
//! without any core owning them.

use tracing::{debug, info};

use crate::common::error::{SimError, SimResult};
use crate::common::reg::RegisterId;
use crate::config::Config;
use crate::core::Cpu;
use crate::core::pipeline::traits::{NullObserver, PipelineObserver};
use crate::isa::program::Program;
use crate::sim::observer::TracingObserver;
use crate::soc::System;
use crate::stats::SimStats;

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Global cycles until every core finished.
    pub cycles: u64,
    /// Counters summed over all cores.
    pub stats: SimStats,
    /// Counters of each core.
    pub per_core: Vec<SimStats>,
}

/// Architectural state visible to the program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchState {
    /// Register values per core, indexed by register ordinal.
    pub registers: Vec<[i32; 32]>,
    /// Main memory contents.
    pub memory: Vec<u8>,
}

/// Top-level simulator: cores, shared memory system and event sink.
#[derive(Debug)]
pub struct Simulator {
    config: Config,
    cores: Vec<Cpu>,
    system: System,
    observer: Box<dyn PipelineObserver>,
    cycles: u64,
}

impl Simulator {
    /// Creates a simulator from a validated configuration.
    ///
    /// When `general.trace` is set, pipeline events go to `tracing`.
    ///
    /// # Errors
    ///
    /// `SimError::Config` if the configuration is inconsistent.
    pub fn new(config: Config) -> SimResult<Self> {
        config.validate()?;
        let cores = (0..config.system.cores)
            .map(|id| Cpu::new(id, &config))
            .collect();
        let observer: Box<dyn PipelineObserver> = if config.general.trace {
            Box::new(TracingObserver)
        } else {
            Box::new(NullObserver)
        };
        Ok(Self {
            system: System::new(&config),
            cores,
            observer,
            cycles: 0,
            config,
        })
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configuration in use.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Sets `reg` to `value` on every core.
    pub fn set_register(&mut self, reg: RegisterId, value: i32) {
        for core in &mut self.cores {
            core.regs.write(reg, value);
        }
    }

    /// Copies `bytes` into main memory at `addr`.
    ///
    /// # Errors
    ///
    /// `SimError::Config` when the image does not fit in memory.
    pub fn write_memory(&mut self, addr: u32, bytes: &[u8]) -> SimResult<()> {
        self.system
            .memory
            .load(addr, bytes)
            .map_err(|e| SimError::Config(format!("initial memory image: {e}")))
    }

    /// Runs `program` on every core until all of them finish.
    ///
    /// Registers and memory set beforehand are kept; pipeline and cache state
    /// start empty. Dirty
    /// cache lines are written back to memory when the run ends.
    ///
    /// # Errors
    ///
    /// * `SimError::Program` for the first fault to retire.
    /// * `SimError::Invariant` when the simulator's own bookkeeping breaks.
    /// * `SimError::CycleLimit` when `general.max_cycles` elapses first.
    pub fn run(&mut self, program: &Program) -> SimResult<RunReport> {
        self.system.reset_caches(&self.config);
        for core in &mut self.cores {
            let regs = core.regs;
            *core = Cpu::new(core.id, &self.config);
            core.regs = regs;
        }
        self.cycles = 0;
        info!(
            cores = self.cores.len(),
            instructions = program.len(),
            "simulation started"
        );

        let limit = self.config.general.max_cycles;
        while !self.cores.iter().all(|c| c.done) {
            if self.cycles >= limit {
                return Err(SimError::CycleLimit(limit));
            }
            self.cycles += 1;
            for core in &mut self.cores {
                core.tick(&mut self.system, program, self.observer.as_mut())?;
            }
            self.system.directory.check_all()?;
        }

        for core in &mut self.cores {
            core.dcache.drain(&mut self.system);
            debug!(
                core = core.id,
                cycles = core.stats.cycles,
                retired = core.stats.instructions_retired,
                terminated = core.terminated,
                "core finished"
            );
        }
        let report = RunReport {
            cycles: self.cycles,
            stats: self.stats(),
            per_core: self.cores.iter().map(|c| c.stats.clone()).collect(),
        };
        info!(cycles = report.cycles, retired = report.stats.instructions_retired, "simulation finished");
        Ok(report)
    }

    /// Registers of every core plus main memory.
    pub fn arch_state(&self) -> ArchState {
        ArchState {
            registers: self.cores.iter().map(|c| c.regs.values()).collect(),
            memory: self.system.memory.as_slice().to_vec(),
        }
    }

    /// Register file of `core`, if it exists.
    pub fn registers(&self, core: usize) -> Option<[i32; 32]> {
        self.cores.get(core).map(|c| c.regs.values())
    }

    /// Main memory.
    pub fn memory(&self) -> &[u8] {
        self.system.memory.as_slice()
    }

    /// Counters summed over all cores, with `cycles` set to the global clock.
    pub fn stats(&self) -> SimStats {
        let mut total = SimStats::default();
        for core in &self.cores {
            total.merge(&core.stats);
        }
        total.cycles = self.cycles;
        total
    }

    /// Global cycles of the last run.
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The cores, in index order.
    pub fn cores(&self) -> &[Cpu] {
        &self.cores
    }
}
