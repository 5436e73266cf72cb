//! Core processor implementation.
//!
//! Each core is a `Cpu` driven one cycle at a time by the pipeline engine.
//! Shared memory and the coherence directory live outside the core in `soc`.

/// CPU core state and construction.
pub mod cpu;

/// Instruction pipeline (buses, reorder buffer, hazards, stages, engine).
pub mod pipeline;

/// Branch unit and data cache controller.
pub mod units;

pub use self::cpu::Cpu;
