//! Instruction Fetch Stage.
//!
//! Places instruction addresses on the decode bus. It is responsible for:
//! 1. **Sequencing:** Walking the PC forward one instruction at a time.
//! 2. **Instruction Cache:** Probing the optional L1-I; a hit costs the cycle itself,
//!    a miss (or no cache) occupies the memory latency and then installs the line.
//! 3. **Redirects:** `reset` (BTB redirect at decode) and `flush` (misprediction).
//! 4. **Scalar Gating:** Without pipelining, a new fetch starts only once the
//!    previous instruction has fully retired.

use crate::config::Config;
use crate::core::Cpu;
use crate::core::pipeline::traits::PipelineObserver;
use crate::core::units::cache::LruCache;
use crate::isa::program::Program;

/// Fetch unit progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FetchState {
    /// Ready to start a fetch.
    #[default]
    Idle,
    /// Waiting for memory to return the line holding `pc`.
    AwaitingMemory {
        /// Address being fetched.
        pc: u32,
        /// Cycles left, including the current one.
        remaining: u64,
    },
}

/// Fetch unit state.
#[derive(Debug)]
pub struct FetchUnit {
    /// Next address to fetch.
    pub pc: u32,
    /// Set once `pc` walks past the end of the program.
    pub complete: bool,
    /// Multi-cycle miss tracking.
    pub state: FetchState,
    icache: Option<LruCache<()>>,
    memory_latency: u64,
}

impl FetchUnit {
    /// Creates a fetch unit starting at address 0.
    pub fn new(config: &Config) -> Self {
        let l1i = &config.cache.l1_i;
        Self {
            pc: 0,
            complete: false,
            state: FetchState::Idle,
            icache: l1i.enabled.then(|| LruCache::new(l1i.lines, l1i.line_bytes)),
            memory_latency: config.memory.latency,
        }
    }

    /// Redirects fetch without reporting completion; drops any miss in progress.
    ///
    /// Completion is cleared only when the new address lies inside the program.
    pub fn reset(&mut self, pc: u32, program: &Program) {
        self.pc = pc;
        self.state = FetchState::Idle;
        if !program.is_past_end(pc) {
            self.complete = false;
        }
    }

    /// Redirects fetch after a flush, clearing completion.
    pub fn flush(&mut self, pc: u32) {
        self.pc = pc;
        self.state = FetchState::Idle;
        self.complete = false;
    }

    /// Whether no miss is in progress.
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, FetchState::Idle)
    }

    /// The instruction cache, when enabled.
    pub fn icache(&self) -> Option<&LruCache<()>> {
        self.icache.as_ref()
    }
}

/// Whether a non-pipelined core may start a new fetch: nothing is in flight.
fn scalar_gate_open(cpu: &Cpu) -> bool {
    cpu.fetch_bus.is_empty() && cpu.decode_bus.is_empty() && cpu.rob.is_empty()
}

/// Executes the instruction fetch stage.
///
/// Fetches up to `pipeline.width` addresses, stopping when the program is
/// exhausted, the decode bus is full, a miss is outstanding, or (without
/// pipelining) the previous instruction is still in flight.
///
/// # Arguments
///
/// * `cpu` - The core being stepped.
/// * `program` - The running program.
/// * `observer` - Event sink.
pub fn fetch_stage(cpu: &mut Cpu, program: &Program, observer: &mut dyn PipelineObserver) {
    for _ in 0..cpu.pipeline.width {
        if cpu.fetch.complete || !cpu.fetch_bus.can_add() {
            break;
        }
        if !cpu.pipeline.pipelined && cpu.fetch.is_idle() && !scalar_gate_open(cpu) {
            break;
        }
        let pc = cpu.fetch.pc;
        if program.is_past_end(pc) {
            cpu.fetch.complete = true;
            break;
        }

        let remaining = match cpu.fetch.state {
            FetchState::AwaitingMemory { pc: waiting, remaining } if waiting == pc => remaining,
            _ => match cpu.fetch.icache.as_mut() {
                Some(ic) => {
                    let line = ic.line_of(pc);
                    if ic.touch(line) {
                        cpu.stats.icache_hits += 1;
                        0
                    } else {
                        cpu.stats.icache_misses += 1;
                        cpu.fetch.memory_latency
                    }
                }
                None => cpu.fetch.memory_latency,
            },
        };

        if remaining > 1 {
            cpu.fetch.state = FetchState::AwaitingMemory {
                pc,
                remaining: remaining - 1,
            };
            break;
        }
        if remaining > 0 {
            if let Some(ic) = cpu.fetch.icache.as_mut() {
                let line = ic.line_of(pc);
                let _ = ic.put(line, ());
            }
        }
        cpu.fetch.state = FetchState::Idle;
        if cpu.fetch_bus.add(pc).is_err() {
            break;
        }
        observer.on_fetch(cpu.id, cpu.cycle, pc);
        cpu.fetch.pc = pc.wrapping_add(crate::common::INSTRUCTION_WIDTH);
    }
}
