//! Cycle-accurate pipeline simulator library.
//!
//! This crate models a small RISC core at cycle granularity, from a
//! one-instruction-at-a-time machine up to superscalar multi-core:
//! 1. **Core:** Fetch, decode, issue, execute and write-back units connected by staged buses,
//!    with a reorder buffer, forwarding mailboxes and register renaming.
//! 2. **Memory:** Private L1 caches kept coherent by an MSI directory, an optional shared
//!    level, and flat main memory.
//! 3. **ISA:** An RV32I/M subset and its assembler. The pipeline only sees the `Instruction` trait.
//! 4. **Simulation:** Configuration presets, the multi-core driver and statistics.

/// Common types and constants (addresses, registers, errors).
pub mod common;
/// Simulator configuration (defaults, presets, hierarchical config structures).
pub mod config;
/// CPU core (pipeline, branch unit, cache controller).
pub mod core;
/// Instruction set (instruction trait, RV32 subset, programs, assembler).
pub mod isa;
/// Multi-core driver and pipeline observers.
pub mod sim;
/// Shared system (memory, shared cache level, coherence directory).
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::for_variant` or deserialize from JSON.
pub use crate::config::Config;
/// One simulated core.
pub use crate::core::Cpu;
/// Assembles program text.
pub use crate::isa::assemble;
/// Multi-core simulation driver.
pub use crate::sim::Simulator;
/// Shared memory system; construct with `System::new`.
pub use crate::soc::System;
