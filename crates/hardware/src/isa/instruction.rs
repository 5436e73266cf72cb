//! The instruction capability consumed by the pipeline.
//!
//! The pipeline never inspects opcodes. Everything it needs to know about an
//! instruction comes through the `Instruction` trait:
//! 1. **Classification:** `instruction_type()` drives decode blocking, issue ordering and retirement.
//! 2. **Dependencies:** `read_registers()` / `write_registers()` feed hazard detection.
//! 3. **Memory footprint:** `memory_read_addresses()` / `memory_write_addresses()` are known
//!    before execution so the cache controller can fetch operands and the issue unit can
//!    detect memory hazards.
//! 4. **Semantics:** `execute()` turns an operand snapshot plus loaded bytes into an
//!    `ExecutionResult` describing every architectural side effect.

use std::collections::HashMap;
use std::fmt;

use crate::common::constants::pc_of;
use crate::common::error::ProgramError;
use crate::common::reg::{RegSet, RegisterFile, RegisterId};

/// Pipeline-relevant instruction class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstructionType {
    /// Register-to-register or register-immediate computation.
    Arithmetic,
    /// Memory read into a register.
    Load,
    /// Register written to memory.
    Store,
    /// Branch whose direction depends on register values.
    ConditionalBranch,
    /// Unconditional jump, optionally linking.
    Jump,
    /// Return through `ra`; terminates the program when `ra` is zero.
    Return,
}

impl InstructionType {
    /// Whether the instruction may redirect control flow.
    #[inline]
    pub const fn is_control(self) -> bool {
        matches!(self, Self::ConditionalBranch | Self::Jump | Self::Return)
    }

    /// Whether the instruction's target is known only after execution
    /// and the BTB is the only source of a prediction.
    #[inline]
    pub const fn is_unconditional(self) -> bool {
        matches!(self, Self::Jump | Self::Return)
    }

    /// Whether the instruction touches data memory.
    #[inline]
    pub const fn is_memory(self) -> bool {
        matches!(self, Self::Load | Self::Store)
    }
}

/// Label name to instruction address table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: HashMap<String, usize>,
}

impl LabelTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to instruction `index`. Returns the previous binding if any.
    pub fn insert(&mut self, name: impl Into<String>, index: usize) -> Option<usize> {
        self.labels.insert(name.into(), index)
    }

    /// Instruction index bound to `name`.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Resolves `name` to an instruction address.
    ///
    /// # Errors
    ///
    /// `ProgramError::UndefinedLabel` when the label is unknown.
    pub fn resolve(&self, name: &str) -> Result<u32, ProgramError> {
        self.index(name)
            .map(pc_of)
            .ok_or_else(|| ProgramError::UndefinedLabel(name.to_string()))
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Operand view handed to an instruction.
///
/// Holds the register snapshot captured at issue. A value delivered through
/// a forwarding mailbox is overlaid with `forward` before execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    regs: RegisterFile,
}

impl ExecutionContext {
    /// Wraps a register snapshot.
    pub const fn new(regs: RegisterFile) -> Self {
        Self { regs }
    }

    /// Reads an operand.
    #[inline]
    pub const fn read(&self, reg: RegisterId) -> i32 {
        self.regs.read(reg)
    }

    /// Overlays a forwarded value.
    pub fn forward(&mut self, reg: RegisterId, value: i32) {
        self.regs.write(reg, value);
    }
}

/// Architectural side effects of one execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Register written and its new value.
    pub register_change: Option<(RegisterId, i32)>,
    /// Bytes written to memory, `(address, value)` in ascending order.
    pub memory_change: Vec<(u32, u8)>,
    /// New program counter when control flow changed.
    pub pc_change: Option<u32>,
    /// The program ends once this instruction retires.
    pub terminate: bool,
}

impl ExecutionResult {
    /// A result that writes one register. Writes to `zero` are dropped.
    pub fn register(reg: RegisterId, value: i32) -> Self {
        Self {
            register_change: (!reg.is_zero()).then_some((reg, value)),
            ..Self::default()
        }
    }

    /// A result that writes `bytes` starting at `addr`.
    pub fn memory(addr: u32, bytes: &[u8]) -> Self {
        Self {
            memory_change: bytes
                .iter()
                .zip(0u32..)
                .map(|(b, i)| (addr.wrapping_add(i), *b))
                .collect(),
            ..Self::default()
        }
    }

    /// A result that only redirects control flow.
    pub fn jump(target: u32) -> Self {
        Self {
            pc_change: Some(target),
            ..Self::default()
        }
    }

    /// The next program counter given the fetch address of the instruction.
    pub fn next_pc(&self, pc: u32) -> u32 {
        self.pc_change
            .unwrap_or_else(|| pc.wrapping_add(crate::common::INSTRUCTION_WIDTH))
    }
}

/// An instruction the pipeline can schedule and execute.
///
/// Implementations must be immutable: one descriptor is shared by every
/// in-flight instance of the same program slot.
pub trait Instruction: fmt::Debug + fmt::Display + Send + Sync {
    /// Pipeline class of this instruction.
    fn instruction_type(&self) -> InstructionType;

    /// Registers read as operands.
    fn read_registers(&self) -> RegSet;

    /// Registers written by the instruction.
    fn write_registers(&self) -> RegSet;

    /// Byte addresses loaded before execution, in the order `execute` expects them.
    fn memory_read_addresses(&self, _ctx: &ExecutionContext) -> Vec<u32> {
        Vec::new()
    }

    /// Byte addresses the instruction will store to.
    fn memory_write_addresses(&self, _ctx: &ExecutionContext) -> Vec<u32> {
        Vec::new()
    }

    /// Computes the instruction's effect.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Operand snapshot.
    /// * `labels` - Label table of the running program.
    /// * `pc` - Address the instruction was fetched from.
    /// * `memory` - Bytes loaded from `memory_read_addresses`, same order.
    ///
    /// # Errors
    ///
    /// A `ProgramError` for undefined labels, division by zero, or invalid targets.
    fn execute(
        &self,
        ctx: &ExecutionContext,
        labels: &LabelTable,
        pc: u32,
        memory: &[u8],
    ) -> Result<ExecutionResult, ProgramError>;
}
