//! Common utilities and types used throughout the simulator.
//!
//! This module provides fundamental building blocks shared across all components:
//! 1. **Address Types:** Cache-line aligned addresses and line grouping.
//! 2. **Constants:** Instruction width, register count and simulation guards.
//! 3. **Error Handling:** Program errors, invariant violations and the top-level error.
//! 4. **Register Management:** Register ids, bitsets, the register file and pending writes.

/// Cache-line address arithmetic.
pub mod addr;

/// Common constants used throughout the simulator.
pub mod constants;

/// Error types.
pub mod error;

/// Register identifiers and register file.
pub mod reg;

pub use addr::LineAddr;
pub use constants::{INSTRUCTION_WIDTH, REGISTER_COUNT};
pub use error::{InvariantViolation, ProgramError, SimError, SimResult};
pub use reg::{PendingWrites, RegSet, RegisterFile, RegisterId};
