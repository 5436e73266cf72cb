//! Shared test harness: tracing setup and a simulator wrapper.

use std::sync::Once;

use pipesim_core::common::RegisterId;
use pipesim_core::config::{Config, Variant};
use pipesim_core::sim::{ArchState, RunReport};
use pipesim_core::{Simulator, assemble};

static TRACING: Once = Once::new();

/// Installs a test-friendly `tracing` subscriber once per process.
///
/// Honours `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Assembles and runs programs on a configured machine.
pub struct TestContext {
    pub sim: Simulator,
}

impl TestContext {
    /// A machine built from a preset.
    pub fn new(variant: Variant) -> Self {
        Self::with_config(Config::for_variant(variant))
    }

    /// A machine built from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        init_tracing();
        Self {
            sim: Simulator::new(config).expect("valid test configuration"),
        }
    }

    /// Sets a register on every core before the run.
    pub fn set_reg(mut self, reg: usize, value: i32) -> Self {
        let reg = RegisterId::new(reg).expect("register index in range");
        self.sim.set_register(reg, value);
        self
    }

    /// Preloads main memory.
    pub fn with_memory(mut self, addr: u32, bytes: &[u8]) -> Self {
        self.sim.write_memory(addr, bytes).expect("image fits in memory");
        self
    }

    /// Assembles `source` and runs it to completion.
    pub fn run(&mut self, source: &str) -> RunReport {
        let program = assemble(source).expect("test program assembles");
        self.sim.run(&program).expect("test program runs to completion")
    }

    /// Register value of core 0.
    pub fn reg(&self, reg: usize) -> i32 {
        self.sim.registers(0).expect("core 0 exists")[reg]
    }

    /// Little-endian word at `addr`.
    pub fn word(&self, addr: u32) -> i32 {
        let a = addr as usize;
        let mem = self.sim.memory();
        i32::from_le_bytes([mem[a], mem[a + 1], mem[a + 2], mem[a + 3]])
    }

    /// Byte at `addr`.
    pub fn byte(&self, addr: u32) -> u8 {
        self.sim.memory()[addr as usize]
    }

    /// Final registers of every core plus memory.
    pub fn state(&self) -> ArchState {
        self.sim.arch_state()
    }
}

/// Runs `source` on `variant` and returns the report plus final state.
pub fn run_on(variant: Variant, source: &str) -> (RunReport, ArchState) {
    let mut ctx = TestContext::new(variant);
    let report = ctx.run(source);
    (report, ctx.state())
}
