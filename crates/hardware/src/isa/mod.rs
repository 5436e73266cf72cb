//! Instruction Set Architecture (ISA) Definitions.
//!
//! The pipeline is ISA-agnostic: it consumes instructions only through the
//! `Instruction` capability. This module provides that capability and a
//! reference implementation.
//!
//! # Contents
//!
//! * `instruction`: The `Instruction` trait, execution context and results, label table.
//! * `rv32i`: Reference RV32I/M integer subset.
//! * `program`: Ordered instruction list plus labels.
//! * `asm`: `nom`-based textual assembler producing a `Program`.
//! * `abi`: Register name mappings.

/// Application Binary Interface (ABI) register name mappings.
pub mod abi;

/// Textual assembler.
pub mod asm;

/// The instruction capability consumed by the pipeline.
pub mod instruction;

/// Assembled programs.
pub mod program;

/// Reference RV32I/M instruction subset.
pub mod rv32i;

pub use asm::assemble;
pub use instruction::{ExecutionContext, ExecutionResult, Instruction, InstructionType, LabelTable};
pub use program::{InstructionRef, Program};
