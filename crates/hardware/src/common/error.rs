//! Simulation error definitions.
//!
//! This module defines the failure taxonomy of the simulator. It provides:
//! 1. **Program Errors:** Deterministic defects of the simulated program (undefined label,
//!    division by zero, out-of-range memory). Raised when the faulting instruction retires.
//! 2. **Invariant Violations:** Internal-consistency failures of the simulator itself.
//!    These are never recoverable; the run stops immediately.
//! 3. **Top-level Errors:** `SimError`, which also covers assembly, configuration and
//!    cycle-limit failures and is what every public entry point returns.

use thiserror::Error;

use crate::common::addr::LineAddr;

/// A defect in the simulated program, reported by an instruction's execution.
///
/// Program errors travel with the instruction through the pipeline and only
/// surface when that instruction reaches retirement, so wrong-path faults are
/// discarded together with the rest of the speculative state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProgramError {
    /// A branch or jump referenced a label absent from the label table.
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A load or store touched an address outside of main memory.
    #[error("memory access out of bounds at {addr:#x} (memory is {size} bytes)")]
    MemoryOutOfBounds {
        /// The faulting byte address.
        addr: u32,
        /// Size of main memory in bytes.
        size: usize,
    },

    /// A computed jump target is not a valid instruction address.
    #[error("invalid jump target {0:#x}")]
    InvalidJumpTarget(i64),
}

/// A broken internal invariant of the simulator.
///
/// These indicate a defect in the simulator, not in the simulated program.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A line semaphore was released more times than it was acquired.
    #[error("semaphore for line {line} released without a matching acquire")]
    NegativeSemaphore {
        /// The affected line.
        line: LineAddr,
    },

    /// The directory says a core holds a line its cache does not contain.
    #[error("core {core} is {state} on line {line} but the line is not cached")]
    MissingLine {
        /// Core whose cache lost the line.
        core: usize,
        /// The affected line.
        line: LineAddr,
        /// Directory state that implied presence.
        state: &'static str,
    },

    /// More than one core held a line Modified, or Modified coexisted with Shared.
    #[error("illegal MSI state on line {line}: {detail}")]
    IllegalMsiState {
        /// The affected line.
        line: LineAddr,
        /// Human readable description of the holders.
        detail: String,
    },

    /// A pipeline structure referenced a sequence id that is not in flight.
    #[error("sequence id {0} is not in flight")]
    UnknownSequence(u64),

    /// Any other unreachable pipeline state.
    #[error("unreachable pipeline state: {0}")]
    Unreachable(&'static str),
}

/// Top-level simulator error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimError {
    /// The simulated program faulted.
    #[error("program error at pc {pc:#x}: {source}")]
    Program {
        /// Program counter of the faulting instruction.
        pc: u32,
        /// The underlying fault.
        #[source]
        source: ProgramError,
    },

    /// The simulator broke one of its own invariants.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The program text could not be assembled.
    #[error("assembly error on line {line}: {message}")]
    Assembly {
        /// 1-based source line.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// The configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The run did not finish within the configured cycle budget.
    #[error("simulation exceeded {0} cycles")]
    CycleLimit(u64),
}

impl SimError {
    /// Attaches a program counter to a program error.
    pub fn program(pc: u32, source: ProgramError) -> Self {
        Self::Program { pc, source }
    }
}

/// Result alias used throughout the simulator.
pub type SimResult<T> = Result<T, SimError>;
