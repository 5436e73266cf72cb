//! Global Simulator Constants.
//!
//! This module defines system-wide constants used across the simulator. It includes:
//! 1. **Instruction Constants:** Instruction width and program-counter arithmetic.
//! 2. **Register Constants:** Logical register count and well-known register ordinals.
//! 3. **Simulation Constants:** Guards for runaway simulations.

/// Size of one instruction slot in bytes.
///
/// Programs are laid out as an array of decoded instructions; instruction `i`
/// lives at address `i * INSTRUCTION_WIDTH`.
pub const INSTRUCTION_WIDTH: u32 = 4;

/// Number of logical (architectural) registers.
pub const REGISTER_COUNT: usize = 32;

/// Default upper bound on simulated cycles before a run is abandoned.
pub const DEFAULT_MAX_CYCLES: u64 = 50_000_000;

/// Converts an instruction index into its program counter.
#[inline]
pub const fn pc_of(index: usize) -> u32 {
    (index as u32) * INSTRUCTION_WIDTH
}

/// Converts a program counter into the instruction index it addresses.
#[inline]
pub const fn index_of(pc: u32) -> usize {
    (pc / INSTRUCTION_WIDTH) as usize
}
